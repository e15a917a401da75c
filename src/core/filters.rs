use chrono::{DateTime, Utc};

use crate::core::preference::{self, Head, PreferenceClass};
use crate::core::wildcard;
use crate::models::{FilterOutcome, SearchProfile};

/// Mutual birthyear check.
///
/// The candidate's birthyear must sit inside the viewer's search window and,
/// reciprocally, the viewer's birthyear inside the candidate's. A missing
/// candidate birthyear always fails a year-bounded query; a missing viewer
/// birthyear only passes candidates whose own window is fully open.
pub fn year_pass(viewer: &SearchProfile, candidate: &SearchProfile) -> bool {
    let candidate_birth = match candidate.birthyear {
        Some(y) => y,
        None => return false,
    };
    if !viewer.search_year_range().contains(candidate_birth) {
        return false;
    }

    let their_range = candidate.search_year_range();
    if their_range.is_open() {
        return true;
    }
    match viewer.birthyear {
        Some(mine) => their_range.contains(mine),
        None => false,
    }
}

/// Mutual region check over both users' OR-disjunction rule lists.
pub fn region_pass(viewer: &SearchProfile, candidate: &SearchProfile) -> bool {
    let candidate_home = candidate.home_region();
    if !viewer
        .region_rules()
        .iter()
        .any(|rule| rule.admits(&candidate_home))
    {
        return false;
    }

    let my_home = viewer.home_region();
    candidate
        .region_rules()
        .iter()
        .any(|rule| rule.admits(&my_home))
}

/// The viewer's preference rule applied to a candidate (one direction).
///
/// FO/SO classes look at the candidate's own leaning (falling back to their
/// search label when unset) and at gender parity; `_OWN` variants additionally
/// require the exact own-preference string. Legacy labels keep the old rule:
/// exact `search_preference` equality.
pub fn preference_pass(viewer: &SearchProfile, candidate: &SearchProfile) -> bool {
    let class = preference::classify(&viewer.search_preference);

    if let PreferenceClass::Legacy = class {
        let mine = preference::normalize_label(&viewer.search_preference);
        return !mine.is_empty()
            && mine == preference::normalize_label(&candidate.search_preference);
    }

    // Every non-legacy class needs both genders to be known.
    if !viewer.gender.known() || !candidate.gender.known() {
        return false;
    }
    let gender_differs = viewer.gender != candidate.gender;

    let candidate_own_raw = if candidate.preference.trim().is_empty() {
        &candidate.search_preference
    } else {
        &candidate.preference
    };
    let candidate_own = preference::normalize_label(candidate_own_raw);
    let my_own = preference::normalize_label(&viewer.preference);

    match class {
        PreferenceClass::FoAll => {
            gender_differs && preference::head_type(&candidate_own) == Some(Head::Opposite)
        }
        PreferenceClass::FoOwn => {
            gender_differs && !my_own.is_empty() && candidate_own == my_own
        }
        PreferenceClass::SoAll => {
            !gender_differs && preference::head_type(&candidate_own) == Some(Head::Same)
        }
        PreferenceClass::SoOwn => {
            !gender_differs && !my_own.is_empty() && candidate_own == my_own
        }
        // Handled by the early return above.
        PreferenceClass::Legacy => false,
    }
}

/// Mutual marriage-status check. A wildcard search admits anyone; otherwise
/// the other side's actual status must equal the searched one, in both
/// directions.
pub fn marriage_pass(viewer: &SearchProfile, candidate: &SearchProfile) -> bool {
    marriage_one_way(&viewer.search_marriage, &candidate.marriage)
        && marriage_one_way(&candidate.search_marriage, &viewer.marriage)
}

fn marriage_one_way(searched: &str, actual: &str) -> bool {
    match wildcard::normalize(searched) {
        None => true,
        Some(wanted) => match wildcard::normalize(actual) {
            Some(actual) => actual == wanted,
            None => false,
        },
    }
}

/// One-way photo check: a viewer with the only-with-photo switch ON only
/// sees candidates with a real representative photo.
pub fn photo_pass(viewer: &SearchProfile, candidate: &SearchProfile) -> bool {
    !viewer.only_with_photo.is_on() || candidate.has_representative_photo()
}

/// Mutual contact exclusion.
///
/// A viewer with the disconnect switch ON hides everyone in their uploaded
/// contact-hash set; independently, a candidate with the switch ON who holds
/// the viewer's phone hash is hidden from the viewer, so the pair never sees
/// each other.
pub fn contacts_pass(viewer: &SearchProfile, candidate: &SearchProfile) -> bool {
    if viewer.disconnect_local_contacts.is_on() {
        if let Some(hash) = &candidate.phone_hash {
            if viewer.local_contact_hashes.contains(hash) {
                return false;
            }
        }
    }
    if candidate.disconnect_local_contacts.is_on() {
        if let Some(hash) = &viewer.phone_hash {
            if candidate.local_contact_hashes.contains(hash) {
                return false;
            }
        }
    }
    true
}

/// Emergency gate: a viewer outside an active window sees nobody at all;
/// inside it, only candidates whose own window is active survive.
pub fn emergency_gate(
    candidates: Vec<SearchProfile>,
    viewer: &SearchProfile,
    now: DateTime<Utc>,
    window_secs: u64,
) -> Vec<SearchProfile> {
    if !viewer.emergency.is_on(now, window_secs) {
        return Vec::new();
    }
    candidates
        .into_iter()
        .filter(|c| c.emergency.is_on(now, window_secs))
        .collect()
}

/// Premium-only exposure gate. ON users are self-hidden system-wide: they are
/// dropped from every normal feed, and an ON viewer additionally sees nobody.
pub fn premium_only_gate(
    candidates: Vec<SearchProfile>,
    viewer: &SearchProfile,
) -> Vec<SearchProfile> {
    if viewer.match_premium_only.is_on() {
        return Vec::new();
    }
    candidates
        .into_iter()
        .filter(|c| !c.match_premium_only.is_on())
        .collect()
}

/// Receive-off gate. A viewer whose refuse-requests switch is ON sees nobody
/// (and is shown to nobody); otherwise candidates with the switch ON drop out.
pub fn receive_off_gate(
    candidates: Vec<SearchProfile>,
    viewer: &SearchProfile,
) -> Vec<SearchProfile> {
    if viewer.allow_friend_requests.is_on() {
        return Vec::new();
    }
    candidates
        .into_iter()
        .filter(|c| !c.allow_friend_requests.is_on())
        .collect()
}

/// Receive-limit threshold. At or over the limit the whole list empties and
/// the exposure flag is raised; below it the list passes through unchanged.
pub fn receive_limit_gate(
    candidates: Vec<SearchProfile>,
    pending_count: u32,
    receive_limit: u32,
) -> FilterOutcome {
    if pending_count >= receive_limit {
        FilterOutcome::blocked()
    } else {
        FilterOutcome::passed(candidates)
    }
}
