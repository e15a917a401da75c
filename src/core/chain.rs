use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::filters;
use crate::models::{FilterOutcome, SearchProfile};

/// Which composition to run. The two share every per-element filter; Normal
/// ends with the premium-only gate, Premium swaps in the emergency gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    Normal,
    Premium,
}

/// Knobs shared by both compositions, passed in explicitly so the chain
/// stays referentially transparent.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Fallback for profiles without a per-user receive limit.
    pub default_receive_limit: u32,
    /// How long an emergency activation stays live.
    pub emergency_window_secs: u64,
    /// Apply the candidate's preference rule to the viewer as well.
    pub reciprocal_preference: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            default_receive_limit: 19,
            emergency_window_secs: 3600,
            reciprocal_preference: false,
        }
    }
}

/// Per-call options. The overrides exist for test and backfill runs where the
/// caller already knows the pending count.
#[derive(Debug, Clone, Default)]
pub struct ChainOptions {
    /// Ids dropped before any predicate runs: friends, blocked users, open
    /// chat partners, already-seen candidates.
    pub exclude_ids: HashSet<String>,
    pub pending_count_override: Option<u32>,
    pub receive_limit_override: Option<u32>,
}

/// Ordered filter pipeline over a candidate list.
///
/// Per-element filters intersect, so their relative order only changes which
/// stage a candidate is logged against; the gates at the tail can discard the
/// whole list.
#[derive(Debug, Clone)]
pub struct FilterChain {
    mode: ChainMode,
    config: ChainConfig,
}

impl FilterChain {
    pub fn new(mode: ChainMode, config: ChainConfig) -> Self {
        Self { mode, config }
    }

    pub fn normal(config: ChainConfig) -> Self {
        Self::new(ChainMode::Normal, config)
    }

    pub fn premium(config: ChainConfig) -> Self {
        Self::new(ChainMode::Premium, config)
    }

    pub fn mode(&self) -> ChainMode {
        self.mode
    }

    pub fn apply(
        &self,
        viewer: &SearchProfile,
        candidates: Vec<SearchProfile>,
        now: DateTime<Utc>,
    ) -> FilterOutcome {
        self.apply_with(viewer, candidates, now, &ChainOptions::default())
    }

    pub fn apply_with(
        &self,
        viewer: &SearchProfile,
        candidates: Vec<SearchProfile>,
        now: DateTime<Utc>,
        opts: &ChainOptions,
    ) -> FilterOutcome {
        let mut list = candidates;
        let total = list.len();

        // Stage 0: never show the viewer themselves or anyone the caller
        // already excluded.
        retain_stage(&mut list, viewer, "exclude", |c| {
            c.user_id != viewer.user_id && !opts.exclude_ids.contains(&c.user_id)
        });

        retain_stage(&mut list, viewer, "year", |c| filters::year_pass(viewer, c));
        retain_stage(&mut list, viewer, "region", |c| {
            filters::region_pass(viewer, c)
        });
        let reciprocal = self.config.reciprocal_preference;
        retain_stage(&mut list, viewer, "preference", |c| {
            filters::preference_pass(viewer, c)
                && (!reciprocal || filters::preference_pass(c, viewer))
        });
        retain_stage(&mut list, viewer, "marriage", |c| {
            filters::marriage_pass(viewer, c)
        });
        retain_stage(&mut list, viewer, "photo", |c| filters::photo_pass(viewer, c));
        retain_stage(&mut list, viewer, "contacts", |c| {
            filters::contacts_pass(viewer, c)
        });

        list = filters::receive_off_gate(list, viewer);
        debug!(
            "receive-off gate: {} candidates remain for {}",
            list.len(),
            viewer.user_id
        );

        list = match self.mode {
            ChainMode::Normal => filters::premium_only_gate(list, viewer),
            ChainMode::Premium => filters::emergency_gate(
                list,
                viewer,
                now,
                self.config.emergency_window_secs,
            ),
        };
        debug!(
            "{} gate: {} candidates remain for {}",
            match self.mode {
                ChainMode::Normal => "premium-only",
                ChainMode::Premium => "emergency",
            },
            list.len(),
            viewer.user_id
        );

        let pending = opts
            .pending_count_override
            .unwrap_or(viewer.pending_request_count);
        let limit = opts.receive_limit_override.unwrap_or_else(|| {
            viewer.effective_receive_limit(self.config.default_receive_limit)
        });
        let outcome = filters::receive_limit_gate(list, pending, limit);

        if outcome.exposure_blocked {
            debug!(
                "receive limit reached for {} ({}/{}): search and exposure blocked",
                viewer.user_id, pending, limit
            );
        }
        debug!(
            "{:?} chain for {}: {} -> {} candidates",
            self.mode,
            viewer.user_id,
            total,
            outcome.users.len()
        );
        outcome
    }
}

fn retain_stage(
    list: &mut Vec<SearchProfile>,
    viewer: &SearchProfile,
    stage: &str,
    mut pred: impl FnMut(&SearchProfile) -> bool,
) {
    let before = list.len();
    list.retain(|c| pred(c));
    if list.len() != before {
        debug!(
            "{} filter: {} -> {} candidates for {}",
            stage,
            before,
            list.len(),
            viewer.user_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wildcard::Switch;
    use crate::models::Gender;

    fn viewer() -> SearchProfile {
        SearchProfile {
            user_id: "viewer".into(),
            nickname: "나".into(),
            birthyear: Some(1990),
            gender: Gender::Man,
            region1: "서울".into(),
            region2: "강남구".into(),
            preference: "이성친구 - 진지한".into(),
            search_preference: "이성친구 - 전체".into(),
            ..Default::default()
        }
    }

    fn candidate(id: &str) -> SearchProfile {
        SearchProfile {
            user_id: id.into(),
            nickname: format!("후보-{id}"),
            birthyear: Some(1992),
            gender: Gender::Woman,
            region1: "서울".into(),
            region2: "송파구".into(),
            preference: "이성친구 - 가벼운".into(),
            search_preference: "이성친구 - 전체".into(),
            ..Default::default()
        }
    }

    #[test]
    fn normal_chain_passes_compatible_candidates() {
        let chain = FilterChain::normal(ChainConfig::default());
        let out = chain.apply(
            &viewer(),
            vec![candidate("a"), candidate("b")],
            Utc::now(),
        );
        assert_eq!(out.users.len(), 2);
        assert!(!out.exposure_blocked);
    }

    #[test]
    fn viewer_is_never_their_own_candidate() {
        let chain = FilterChain::normal(ChainConfig::default());
        let mut me_as_candidate = viewer();
        me_as_candidate.gender = Gender::Woman; // would otherwise pass
        let out = chain.apply(&viewer(), vec![me_as_candidate], Utc::now());
        assert!(out.users.is_empty());
    }

    #[test]
    fn exclude_ids_are_dropped_first() {
        let chain = FilterChain::normal(ChainConfig::default());
        let opts = ChainOptions {
            exclude_ids: ["a".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let out = chain.apply_with(
            &viewer(),
            vec![candidate("a"), candidate("b")],
            Utc::now(),
            &opts,
        );
        assert_eq!(out.users.len(), 1);
        assert_eq!(out.users[0].user_id, "b");
    }

    #[test]
    fn premium_only_viewer_sees_nothing_on_normal_chain() {
        let chain = FilterChain::normal(ChainConfig::default());
        let mut me = viewer();
        me.match_premium_only = Switch::On;
        let out = chain.apply(&me, vec![candidate("a"), candidate("b")], Utc::now());
        assert!(out.users.is_empty());
        assert!(!out.exposure_blocked);
    }

    #[test]
    fn premium_chain_requires_mutual_emergency() {
        let now = Utc::now();
        let chain = FilterChain::premium(ChainConfig::default());

        let mut me = viewer();
        me.emergency.is_active = true;
        me.emergency.activated_at = Some(now);

        let mut hot = candidate("hot");
        hot.emergency.is_active = true;
        hot.emergency.activated_at = Some(now);
        let cold = candidate("cold");

        let out = chain.apply(&me, vec![hot, cold], now);
        assert_eq!(out.users.len(), 1);
        assert_eq!(out.users[0].user_id, "hot");

        // Without an active window of my own the premium feed is empty.
        let out = chain.apply(&viewer(), vec![candidate("x")], now);
        assert!(out.users.is_empty());
    }

    #[test]
    fn receive_limit_blocks_exposure() {
        let chain = FilterChain::normal(ChainConfig::default());
        let mut me = viewer();
        me.pending_request_count = 19;

        let out = chain.apply(&me, vec![candidate("a")], Utc::now());
        assert!(out.users.is_empty());
        assert!(out.exposure_blocked);

        me.pending_request_count = 18;
        let out = chain.apply(&me, vec![candidate("a")], Utc::now());
        assert_eq!(out.users.len(), 1);
        assert!(!out.exposure_blocked);
    }

    #[test]
    fn overrides_take_precedence_over_profile_counts() {
        let chain = FilterChain::normal(ChainConfig::default());
        let me = viewer(); // pending 0
        let opts = ChainOptions {
            pending_count_override: Some(25),
            receive_limit_override: Some(20),
            ..Default::default()
        };
        let out = chain.apply_with(&me, vec![candidate("a")], Utc::now(), &opts);
        assert!(out.exposure_blocked);
    }

    #[test]
    fn adding_a_filter_never_grows_the_result() {
        // Reordering the per-element filters cannot change the final set;
        // spot-check by comparing a full chain against a manual intersection.
        let now = Utc::now();
        let chain = FilterChain::normal(ChainConfig::default());
        let me = viewer();

        let mut mixed = vec![candidate("a"), candidate("b"), candidate("c")];
        mixed[1].birthyear = None; // fails year
        mixed[2].allow_friend_requests = Switch::On; // dropped by receive-off

        let out = chain.apply(&me, mixed.clone(), now);
        let manual: Vec<_> = mixed
            .into_iter()
            .filter(|c| filters::year_pass(&me, c))
            .filter(|c| filters::region_pass(&me, c))
            .filter(|c| filters::preference_pass(&me, c))
            .filter(|c| filters::marriage_pass(&me, c))
            .filter(|c| filters::photo_pass(&me, c))
            .filter(|c| filters::contacts_pass(&me, c))
            .filter(|c| !c.allow_friend_requests.is_on())
            .filter(|c| !c.match_premium_only.is_on())
            .collect();

        assert_eq!(out.users.len(), manual.len());
        assert!(out.users.len() <= 3);
    }
}
