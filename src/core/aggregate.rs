use std::collections::HashMap;

use tracing::{debug, warn};

use crate::core::kst;
use crate::models::{ActivityEvent, DailyAggregate, EventKind};

/// Roll a raw event feed up into one aggregate per known user for one
/// Asia/Seoul calendar day.
///
/// The output is a full recomputation from the source events: rerunning for
/// the same day yields identical rows, so persisting them as `(user, ymd)`
/// upserts keeps the batch idempotent. Users with no events for the day get
/// zero-filled rows.
///
/// `friendReqAccepted` events arrive attributed to the recipient of the
/// accepted request; the aggregator groups strictly by `actor_user_id` and
/// leaves that attribution to the event producer.
pub fn aggregate_for_day(
    user_ids: &[String],
    events: &[ActivityEvent],
    ymd: &str,
) -> Vec<DailyAggregate> {
    let mut by_user: HashMap<&str, DailyAggregate> = user_ids
        .iter()
        .map(|id| (id.as_str(), DailyAggregate::zeroed(id.clone(), ymd)))
        .collect();

    let mut counted = 0usize;
    let mut unknown_actor = 0usize;

    for event in events {
        if kst::ymd_of(event.timestamp) != ymd {
            continue;
        }
        let Some(agg) = by_user.get_mut(event.actor_user_id.as_str()) else {
            unknown_actor += 1;
            continue;
        };
        match event.kind {
            EventKind::Message => agg.messages_sent += 1,
            EventKind::FriendReqSent => agg.friend_req_sent += 1,
            EventKind::FriendReqRecv => agg.friend_req_recv += 1,
            EventKind::FriendReqAccepted => agg.friend_req_accepted += 1,
            EventKind::Block => agg.blocks_done += 1,
        }
        counted += 1;
    }

    if unknown_actor > 0 {
        warn!(
            "aggregation for {}: {} events referenced unknown users and were skipped",
            ymd, unknown_actor
        );
    }
    debug!(
        "aggregation for {}: {} events over {} users",
        ymd,
        counted,
        user_ids.len()
    );

    let mut rows: Vec<DailyAggregate> = by_user.into_values().collect();
    rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    rows
}
