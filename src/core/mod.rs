// Core engine exports
pub mod aggregate;
pub mod chain;
pub mod filters;
pub mod kst;
pub mod preference;
pub mod ranking;
pub mod scoring;
pub mod wildcard;

pub use aggregate::aggregate_for_day;
pub use chain::{ChainConfig, ChainMode, ChainOptions, FilterChain};
pub use preference::{classify, PreferenceClass};
pub use ranking::RankedCandidateSource;
pub use scoring::{
    activity_score, compose_exposure, compose_score, recency_weight, run_daily_batch,
    HALF_LIFE_HOURS,
};
pub use wildcard::Switch;
