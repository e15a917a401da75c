use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::wildcard::{self, Switch, YearRange};

/// Gender as stored on the user document. Unrecognized or absent values are
/// `Unknown` and fail every gender-dependent preference rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    Man,
    Woman,
    #[default]
    Unknown,
}

impl Gender {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "man" | "male" => Gender::Man,
            "woman" | "female" => Gender::Woman,
            _ => Gender::Unknown,
        }
    }

    pub fn known(self) -> bool {
        self != Gender::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Man => "man",
            Gender::Woman => "woman",
            Gender::Unknown => "unknown",
        }
    }
}

impl Serialize for Gender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Gender::Unknown, Gender::parse))
    }
}

/// Emergency matching switch state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Emergency {
    #[serde(rename = "isActive", default)]
    pub is_active: bool,
    #[serde(rename = "activatedAt", default)]
    pub activated_at: Option<DateTime<Utc>>,
}

impl Emergency {
    /// ON means active and activated less than `window_secs` ago.
    pub fn is_on(&self, now: DateTime<Utc>, window_secs: u64) -> bool {
        if !self.is_active {
            return false;
        }
        match self.activated_at {
            Some(at) => now.signed_duration_since(at).num_seconds() < window_secs as i64,
            None => false,
        }
    }
}

/// A (region1, region2) pair: a user's home region or one entry of their
/// searched-regions list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPair {
    #[serde(default)]
    pub region1: String,
    #[serde(default)]
    pub region2: String,
}

impl RegionPair {
    pub fn new(region1: impl Into<String>, region2: impl Into<String>) -> Self {
        Self {
            region1: region1.into(),
            region2: region2.into(),
        }
    }

    /// Both halves are wildcard spellings.
    pub fn is_unset(&self) -> bool {
        wildcard::is_all(&self.region1) && wildcard::is_all(&self.region2)
    }

    /// Search-rule semantics: a wildcard region1 admits anyone; a set region1
    /// with a wildcard region2 matches on region1 alone; otherwise both parts
    /// must match exactly.
    pub fn admits(&self, home: &RegionPair) -> bool {
        if wildcard::is_all(&self.region1) {
            return true;
        }
        if wildcard::is_all(&self.region2) {
            return home.region1.trim() == self.region1.trim();
        }
        home.region1.trim() == self.region1.trim() && home.region2.trim() == self.region2.trim()
    }
}

/// A user's profile plus search preferences, as projected from the user
/// document. Read-only input to the engine; the filter chain never mutates
/// profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchProfile {
    #[serde(rename = "_id", alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default, deserialize_with = "wildcard::de_opt_year")]
    pub birthyear: Option<i32>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub region1: String,
    #[serde(default)]
    pub region2: String,
    #[serde(
        rename = "search_birthyear1",
        default,
        deserialize_with = "wildcard::de_opt_year"
    )]
    pub search_birthyear_from: Option<i32>,
    #[serde(
        rename = "search_birthyear2",
        default,
        deserialize_with = "wildcard::de_opt_year"
    )]
    pub search_birthyear_to: Option<i32>,
    #[serde(rename = "search_regions", alias = "searchRegions", default)]
    pub search_regions: Vec<RegionPair>,
    #[serde(default)]
    pub preference: String,
    #[serde(rename = "search_preference", default)]
    pub search_preference: String,
    #[serde(default)]
    pub marriage: String,
    #[serde(rename = "search_marriage", default)]
    pub search_marriage: String,
    #[serde(rename = "search_disconnectLocalContacts", default)]
    pub disconnect_local_contacts: Switch,
    /// ON means the user refuses incoming friend requests and drops out of
    /// everyone's results, including their own.
    #[serde(rename = "search_allowFriendRequests", default)]
    pub allow_friend_requests: Switch,
    #[serde(rename = "search_onlyWithPhoto", default)]
    pub only_with_photo: Switch,
    #[serde(rename = "search_matchPremiumOnly", default)]
    pub match_premium_only: Switch,
    #[serde(default)]
    pub emergency: Emergency,
    #[serde(rename = "phoneHash", default)]
    pub phone_hash: Option<String>,
    #[serde(rename = "localContactHashes", default)]
    pub local_contact_hashes: HashSet<String>,
    #[serde(rename = "pendingCount", alias = "pendingRequestCount", default)]
    pub pending_request_count: u32,
    #[serde(rename = "receiveLimit", default)]
    pub receive_limit: Option<u32>,
    /// Representative photo URL or image id. `None` means the field was
    /// absent from the projection, which the photo filter treats fail-open;
    /// `Some("")` means present but unset.
    #[serde(rename = "profileMain", default)]
    pub profile_main: Option<String>,
    #[serde(rename = "profileImages", default)]
    pub profile_images: Vec<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SearchProfile {
    /// The user's birthyear search window, wildcard bounds already collapsed.
    pub fn search_year_range(&self) -> YearRange {
        YearRange::new(self.search_birthyear_from, self.search_birthyear_to)
    }

    pub fn home_region(&self) -> RegionPair {
        RegionPair::new(self.region1.clone(), self.region2.clone())
    }

    /// The user's region search rules as an OR-disjunction. Unset entries are
    /// dropped; an empty list collapses to a single wildcard rule.
    pub fn region_rules(&self) -> Vec<RegionPair> {
        let rules: Vec<RegionPair> = self
            .search_regions
            .iter()
            .filter(|r| !r.is_unset())
            .cloned()
            .collect();
        if rules.is_empty() {
            vec![RegionPair::default()]
        } else {
            rules
        }
    }

    /// Whether the user has a real representative photo.
    ///
    /// When the main field is present its value decides: empty is no photo,
    /// a default avatar URL is no photo, any other URL or image id counts.
    /// When the projection dropped the field entirely, fall back to the
    /// gallery length so incomplete projections do not filter everyone out.
    pub fn has_representative_photo(&self) -> bool {
        match &self.profile_main {
            Some(main) => {
                let main = main.trim();
                if main.is_empty() {
                    return false;
                }
                if looks_like_url(main) {
                    !is_default_avatar(main)
                } else {
                    true
                }
            }
            None => !self.profile_images.is_empty(),
        }
    }

    pub fn effective_receive_limit(&self, default_limit: u32) -> u32 {
        self.receive_limit.unwrap_or(default_limit)
    }
}

fn looks_like_url(v: &str) -> bool {
    let lower = v.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
        || v.contains('/')
        || [".png", ".jpg", ".jpeg", ".webp", ".gif"]
            .iter()
            .any(|ext| lower.ends_with(ext))
}

fn is_default_avatar(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("man.jpg") || lower.contains("woman.jpg")
}

/// One raw interaction event from the feed the daily batch consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    #[serde(rename = "actorUserId")]
    pub actor_user_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "message")]
    Message,
    #[serde(rename = "friendReqSent")]
    FriendReqSent,
    #[serde(rename = "friendReqRecv")]
    FriendReqRecv,
    #[serde(rename = "friendReqAccepted")]
    FriendReqAccepted,
    #[serde(rename = "block")]
    Block,
}

impl std::str::FromStr for EventKind {
    type Err = crate::error::MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(EventKind::Message),
            "friendReqSent" => Ok(EventKind::FriendReqSent),
            "friendReqRecv" => Ok(EventKind::FriendReqRecv),
            "friendReqAccepted" => Ok(EventKind::FriendReqAccepted),
            "block" => Ok(EventKind::Block),
            other => Err(crate::error::MatchError::UnknownEventKind(other.to_string())),
        }
    }
}

/// Per-user interaction counts for one Asia/Seoul calendar day.
/// Keyed `(user, ymd)`; reruns replace the row wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAggregate {
    #[serde(rename = "user")]
    pub user_id: String,
    pub ymd: String,
    #[serde(rename = "messagesSent")]
    pub messages_sent: u32,
    /// The feed carries no message-receive events; kept zero-filled so the
    /// row shape matches the stored aggregate schema.
    #[serde(rename = "messagesRecv")]
    pub messages_recv: u32,
    #[serde(rename = "friendReqSent")]
    pub friend_req_sent: u32,
    #[serde(rename = "friendReqRecv")]
    pub friend_req_recv: u32,
    #[serde(rename = "friendReqAccepted")]
    pub friend_req_accepted: u32,
    #[serde(rename = "blocksDone")]
    pub blocks_done: u32,
}

impl DailyAggregate {
    pub fn zeroed(user_id: impl Into<String>, ymd: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ymd: ymd.into(),
            messages_sent: 0,
            messages_recv: 0,
            friend_req_sent: 0,
            friend_req_recv: 0,
            friend_req_accepted: 0,
            blocks_done: 0,
        }
    }
}

/// Normalization caps: the daily count at which each field saturates to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreCaps {
    #[serde(default = "default_cap_messages_sent")]
    pub messages_sent: u32,
    #[serde(default = "default_cap_friend_req_sent")]
    pub friend_req_sent: u32,
    #[serde(default = "default_cap_friend_req_recv")]
    pub friend_req_recv: u32,
    #[serde(default = "default_cap_friend_req_accepted")]
    pub friend_req_accepted: u32,
    #[serde(default = "default_cap_blocks_done")]
    pub blocks_done: u32,
}

impl Default for ScoreCaps {
    fn default() -> Self {
        Self {
            messages_sent: default_cap_messages_sent(),
            friend_req_sent: default_cap_friend_req_sent(),
            friend_req_recv: default_cap_friend_req_recv(),
            friend_req_accepted: default_cap_friend_req_accepted(),
            blocks_done: default_cap_blocks_done(),
        }
    }
}

fn default_cap_messages_sent() -> u32 {
    40
}
fn default_cap_friend_req_sent() -> u32 {
    20
}
fn default_cap_friend_req_recv() -> u32 {
    20
}
fn default_cap_friend_req_accepted() -> u32 {
    10
}
fn default_cap_blocks_done() -> u32 {
    10
}

/// Activity-score weights. Blocks carry a negative weight and act as a
/// penalty; the weighted sum is clamped to [0,1] afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_weight_messages_sent")]
    pub messages_sent: f64,
    #[serde(default = "default_weight_friend_req_sent")]
    pub friend_req_sent: f64,
    #[serde(default = "default_weight_friend_req_recv")]
    pub friend_req_recv: f64,
    #[serde(default = "default_weight_friend_req_accepted")]
    pub friend_req_accepted: f64,
    #[serde(default = "default_weight_blocks_done")]
    pub blocks_done: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            messages_sent: default_weight_messages_sent(),
            friend_req_sent: default_weight_friend_req_sent(),
            friend_req_recv: default_weight_friend_req_recv(),
            friend_req_accepted: default_weight_friend_req_accepted(),
            blocks_done: default_weight_blocks_done(),
        }
    }
}

fn default_weight_messages_sent() -> f64 {
    0.25
}
fn default_weight_friend_req_sent() -> f64 {
    0.20
}
fn default_weight_friend_req_recv() -> f64 {
    0.20
}
fn default_weight_friend_req_accepted() -> f64 {
    0.30
}
fn default_weight_blocks_done() -> f64 {
    -0.20
}

/// Fully derived exposure score for one `(user, ymd)`, recomputed
/// idempotently by the daily batch, never user-editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyScore {
    #[serde(rename = "user")]
    pub user_id: String,
    pub ymd: String,
    #[serde(rename = "activityScore")]
    pub activity_score: f64,
    #[serde(rename = "recencyScore")]
    pub recency_score: f64,
    #[serde(rename = "exposureScore")]
    pub exposure_score: f64,
    /// Snapshot of the weights the score was composed with, for audit.
    pub weights: ScoreWeights,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
