// Model exports
pub mod domain;
pub mod responses;

pub use domain::{
    ActivityEvent, DailyAggregate, DailyScore, Emergency, EventKind, Gender, RegionPair,
    ScoreCaps, ScoreWeights, SearchProfile,
};
pub use responses::{FilterOutcome, RankedCandidate};
