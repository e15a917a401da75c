use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::core::{aggregate, kst};
use crate::models::{ActivityEvent, DailyAggregate, DailyScore, ScoreCaps, ScoreWeights};

/// Default recency half-life.
pub const HALF_LIFE_HOURS: f64 = 12.0;

/// Clamp into [0,1]; non-finite values coerce to 0.
pub fn clamp01(v: f64) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

/// Half-life recency weight between an anchor instant and `now`.
///
/// 1.0 at zero elapsed time, 0.5 after one half-life, monotonically toward 0
/// and never negative. Anchors in the future clamp to zero elapsed.
pub fn recency_weight(anchor: DateTime<Utc>, now: DateTime<Utc>, half_life_hours: f64) -> f64 {
    if half_life_hours <= 0.0 {
        return 0.0;
    }
    let elapsed_hours =
        now.signed_duration_since(anchor).num_milliseconds().max(0) as f64 / 3_600_000.0;
    clamp01(0.5f64.powf(elapsed_hours / half_life_hours))
}

fn normalize_count(count: u32, cap: u32) -> f64 {
    if cap == 0 {
        return 0.0;
    }
    clamp01(count as f64 / cap as f64)
}

/// Cap-normalized, weighted activity score in [0,1]. Blocks carry a negative
/// weight so heavy blockers score lower.
pub fn activity_score(agg: &DailyAggregate, weights: &ScoreWeights, caps: &ScoreCaps) -> f64 {
    let raw = normalize_count(agg.messages_sent, caps.messages_sent) * weights.messages_sent
        + normalize_count(agg.friend_req_sent, caps.friend_req_sent) * weights.friend_req_sent
        + normalize_count(agg.friend_req_recv, caps.friend_req_recv) * weights.friend_req_recv
        + normalize_count(agg.friend_req_accepted, caps.friend_req_accepted)
            * weights.friend_req_accepted
        + normalize_count(agg.blocks_done, caps.blocks_done) * weights.blocks_done;
    clamp01(raw)
}

/// Final exposure score: activity attenuated by recency.
pub fn compose_exposure(activity: f64, recency: f64) -> f64 {
    clamp01(clamp01(activity) * clamp01(recency))
}

/// Compose one `DailyScore` from one aggregate and the evaluation instant.
///
/// The recency anchor is the end of the aggregated day (23:59:59 Asia/Seoul);
/// batches that run before that instant see a zero elapsed time and a recency
/// of exactly 1.0. Pure function of its arguments: identical inputs produce
/// bit-identical rows.
pub fn compose_score(
    agg: &DailyAggregate,
    now: DateTime<Utc>,
    weights: &ScoreWeights,
    caps: &ScoreCaps,
    half_life_hours: f64,
) -> DailyScore {
    let recency = match kst::end_of_day(&agg.ymd) {
        Some(anchor) => recency_weight(anchor, now, half_life_hours),
        None => {
            warn!("unparseable ymd {:?} for {}; recency forced to 0", agg.ymd, agg.user_id);
            0.0
        }
    };
    let activity = activity_score(agg, weights, caps);

    DailyScore {
        user_id: agg.user_id.clone(),
        ymd: agg.ymd.clone(),
        activity_score: activity,
        recency_score: recency,
        exposure_score: compose_exposure(activity, recency),
        weights: *weights,
        updated_at: now,
    }
}

/// The daily batch: aggregate the event feed, then score every known user.
///
/// Produces one row per user (zero-activity users included) keyed
/// `(user, ymd)`. Reruns for the same day recompute from scratch, so
/// persisting the rows as full-replace upserts is safe under concurrency.
pub fn run_daily_batch(
    user_ids: &[String],
    events: &[ActivityEvent],
    ymd: &str,
    now: DateTime<Utc>,
    weights: &ScoreWeights,
    caps: &ScoreCaps,
    half_life_hours: f64,
) -> Vec<DailyScore> {
    let aggregates = aggregate::aggregate_for_day(user_ids, events, ymd);
    info!(
        "daily score batch for {}: scoring {} users",
        ymd,
        aggregates.len()
    );
    aggregates
        .iter()
        .map(|agg| compose_score(agg, now, weights, caps, half_life_hours))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn agg(user: &str) -> DailyAggregate {
        DailyAggregate::zeroed(user, "2025-03-10")
    }

    #[test]
    fn clamp01_handles_non_finite() {
        assert_eq!(clamp01(f64::NAN), 0.0);
        assert_eq!(clamp01(f64::INFINITY), 0.0);
        assert_eq!(clamp01(f64::NEG_INFINITY), 0.0);
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(1.5), 1.0);
        assert_eq!(clamp01(0.25), 0.25);
    }

    #[test]
    fn recency_half_life_shape() {
        let anchor = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();

        let at_zero = recency_weight(anchor, anchor, HALF_LIFE_HOURS);
        assert!((at_zero - 1.0).abs() < 1e-12);

        let at_half_life = recency_weight(anchor, anchor + Duration::hours(12), HALF_LIFE_HOURS);
        assert!((at_half_life - 0.5).abs() < 1e-9);

        let far = recency_weight(anchor, anchor + Duration::days(30), HALF_LIFE_HOURS);
        assert!(far >= 0.0 && far < 1e-9);

        // Future anchors clamp to zero elapsed time.
        let future = recency_weight(anchor + Duration::hours(5), anchor, HALF_LIFE_HOURS);
        assert!((future - 1.0).abs() < 1e-12);
    }

    #[test]
    fn activity_score_uses_caps_and_weights() {
        let weights = ScoreWeights::default();
        let caps = ScoreCaps::default();

        let mut a = agg("a");
        assert_eq!(activity_score(&a, &weights, &caps), 0.0);

        // Saturate every positive field: 0.25 + 0.20 + 0.20 + 0.30 = 0.95.
        a.messages_sent = 100;
        a.friend_req_sent = 100;
        a.friend_req_recv = 100;
        a.friend_req_accepted = 100;
        let full = activity_score(&a, &weights, &caps);
        assert!((full - 0.95).abs() < 1e-12);

        // Blocks pull the score down.
        a.blocks_done = 10;
        let penalized = activity_score(&a, &weights, &caps);
        assert!((penalized - 0.75).abs() < 1e-12);
    }

    #[test]
    fn activity_score_never_goes_negative() {
        let weights = ScoreWeights::default();
        let caps = ScoreCaps::default();
        let mut a = agg("a");
        a.blocks_done = 50;
        assert_eq!(activity_score(&a, &weights, &caps), 0.0);
    }

    #[test]
    fn zero_cap_contributes_nothing() {
        let weights = ScoreWeights::default();
        let caps = ScoreCaps {
            messages_sent: 0,
            ..Default::default()
        };
        let mut a = agg("a");
        a.messages_sent = 40;
        assert_eq!(activity_score(&a, &weights, &caps), 0.0);
    }

    #[test]
    fn composer_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2025, 3, 11, 2, 0, 0).unwrap();
        let weights = ScoreWeights::default();
        let caps = ScoreCaps::default();
        let mut a = agg("a");
        a.messages_sent = 12;
        a.friend_req_accepted = 3;

        let first = compose_score(&a, now, &weights, &caps, HALF_LIFE_HOURS);
        let second = compose_score(&a, now, &weights, &caps, HALF_LIFE_HOURS);
        assert_eq!(first.activity_score.to_bits(), second.activity_score.to_bits());
        assert_eq!(first.recency_score.to_bits(), second.recency_score.to_bits());
        assert_eq!(first.exposure_score.to_bits(), second.exposure_score.to_bits());
    }

    #[test]
    fn batch_run_before_day_end_has_full_recency() {
        // 11:00 KST on the target day is 02:00 UTC, hours before the
        // 23:59:59 anchor, so recency clamps to 1.0.
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 2, 0, 0).unwrap();
        let score = compose_score(
            &agg("a"),
            now,
            &ScoreWeights::default(),
            &ScoreCaps::default(),
            HALF_LIFE_HOURS,
        );
        assert!((score.recency_score - 1.0).abs() < 1e-12);
        assert_eq!(score.exposure_score, 0.0, "no activity, no exposure");
    }

    #[test]
    fn batch_produces_one_row_per_user() {
        let now = Utc.with_ymd_and_hms(2025, 3, 11, 2, 0, 0).unwrap();
        let ts = Utc.with_ymd_and_hms(2025, 3, 10, 3, 0, 0).unwrap();
        let users: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let events = vec![ActivityEvent {
            actor_user_id: "a".into(),
            kind: crate::models::EventKind::Message,
            timestamp: ts,
        }];

        let rows = run_daily_batch(
            &users,
            &events,
            "2025-03-10",
            now,
            &ScoreWeights::default(),
            &ScoreCaps::default(),
            HALF_LIFE_HOURS,
        );
        assert_eq!(rows.len(), 3);
        let a = rows.iter().find(|r| r.user_id == "a").unwrap();
        let b = rows.iter().find(|r| r.user_id == "b").unwrap();
        assert!(a.exposure_score > 0.0);
        assert_eq!(b.exposure_score, 0.0);
        for row in &rows {
            assert!((0.0..=1.0).contains(&row.exposure_score));
            assert_eq!(row.ymd, "2025-03-10");
            assert_eq!(row.updated_at, now);
        }
    }
}
