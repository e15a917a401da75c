//! tzchat-match - match visibility and exposure scoring engine for tzchat
//!
//! Two halves: a chain of mutual-visibility filters that reduces a raw
//! candidate list to what a given viewer may see, and a daily batch that
//! turns raw interaction counts into a half-life-decayed exposure score used
//! to rank the candidate feed. The engine works on plain in-memory records
//! and does no I/O; storage and transport belong to the callers.

pub mod config;
pub mod core;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use crate::core::{
    run_daily_batch, ChainConfig, ChainMode, ChainOptions, FilterChain, RankedCandidateSource,
    Switch,
};
pub use crate::error::MatchError;
pub use crate::models::{
    ActivityEvent, DailyAggregate, DailyScore, EventKind, FilterOutcome, Gender,
    RankedCandidate, RegionPair, ScoreCaps, ScoreWeights, SearchProfile,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let chain = FilterChain::normal(ChainConfig::default());
        assert_eq!(chain.mode(), ChainMode::Normal);
        assert_eq!(ScoreCaps::default().messages_sent, 40);
    }
}
