use thiserror::Error;

/// Errors that can cross the engine boundary.
///
/// Filtering and scoring never fail; malformed inputs degrade per field
/// (wildcards, exclusion, zero-coercion). Only configuration loading and
/// event-token decoding can error.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("unknown event kind: {0}")]
    UnknownEventKind(String),
}
