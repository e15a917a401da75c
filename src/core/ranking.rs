use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::core::filters;
use crate::models::{DailyScore, RankedCandidate, SearchProfile};

/// Ordered feed selection over the persisted day scores.
///
/// Sorts the requested day's rows by exposure score (ties broken by most
/// recent update), joins the minimal profile fields the feed returns, and
/// applies the contact protections while joining. Purely in-memory; the
/// caller supplies the score rows and a profile lookup.
#[derive(Debug, Clone)]
pub struct RankedCandidateSource {
    max_limit: usize,
}

impl RankedCandidateSource {
    pub fn new(max_limit: usize) -> Self {
        Self { max_limit }
    }

    pub fn max_limit(&self) -> usize {
        self.max_limit
    }

    /// Top candidates for `viewer` on `ymd`, capped at `limit`.
    ///
    /// A `None` viewer means the caller could not load the viewer record;
    /// that short-circuits to an empty feed; surfacing the error is the
    /// caller's job, the engine never fails past its boundary.
    pub fn top_for_day(
        &self,
        viewer: Option<&SearchProfile>,
        scores: &[DailyScore],
        profiles: &HashMap<String, SearchProfile>,
        ymd: &str,
        exclude_ids: &HashSet<String>,
        limit: usize,
    ) -> Vec<RankedCandidate> {
        let Some(viewer) = viewer else {
            return Vec::new();
        };
        let limit = limit.min(self.max_limit);

        let mut rows: Vec<&DailyScore> = scores
            .iter()
            .filter(|s| s.ymd == ymd)
            .filter(|s| s.user_id != viewer.user_id && !exclude_ids.contains(&s.user_id))
            .collect();

        rows.sort_by(|a, b| {
            b.exposure_score
                .partial_cmp(&a.exposure_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });

        let mut out: Vec<RankedCandidate> = Vec::with_capacity(limit);
        for row in rows {
            if out.len() >= limit {
                break;
            }
            // Incomplete projections degrade: rows without a joinable
            // profile are skipped, never an error.
            let Some(profile) = profiles.get(&row.user_id) else {
                continue;
            };
            // Same-phone-hash protection, then the mutual contact rule.
            if let (Some(mine), Some(theirs)) = (&viewer.phone_hash, &profile.phone_hash) {
                if mine == theirs {
                    continue;
                }
            }
            if !filters::contacts_pass(viewer, profile) {
                continue;
            }

            out.push(RankedCandidate {
                user_id: profile.user_id.clone(),
                nickname: profile.nickname.clone(),
                birthyear: profile.birthyear,
                gender: profile.gender,
                region1: profile.region1.clone(),
                region2: profile.region2.clone(),
                exposure_score: row.exposure_score,
                rank: out.len() + 1,
            });
        }

        debug!(
            "ranked feed for {} on {}: {} of {} score rows returned",
            viewer.user_id,
            ymd,
            out.len(),
            scores.len()
        );
        out
    }
}
