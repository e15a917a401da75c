use serde::{Deserialize, Serialize};

use crate::models::domain::{Gender, SearchProfile};

/// Result of running a filter chain: the surviving candidates plus the flag
/// raised when the receive-limit gate blocked the viewer's own exposure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOutcome {
    pub users: Vec<SearchProfile>,
    #[serde(rename = "exposureBlocked")]
    pub exposure_blocked: bool,
}

impl FilterOutcome {
    pub fn passed(users: Vec<SearchProfile>) -> Self {
        Self {
            users,
            exposure_blocked: false,
        }
    }

    pub fn blocked() -> Self {
        Self {
            users: Vec::new(),
            exposure_blocked: true,
        }
    }
}

/// One row of the ranked feed: the day-score joined with the minimal profile
/// fields the feed endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub nickname: String,
    pub birthyear: Option<i32>,
    pub gender: Gender,
    pub region1: String,
    pub region2: String,
    #[serde(rename = "exposureScore")]
    pub exposure_score: f64,
    /// 1-based position after the final ordering.
    pub rank: usize,
}
