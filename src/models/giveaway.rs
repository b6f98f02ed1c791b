use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A giveaway document as stored in the `giveaways` collection.
///
/// `entrants` is a multiset: an identity joined with multiplier N appears N
/// times, and selection indexes into the full multiplied sequence so weight
/// proportionally affects odds. Identity uniqueness is enforced at join time
/// only, never by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Giveaway {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    /// The original announcement message; deleted best-effort at
    /// finalization. Absence is non-fatal.
    pub message_id: Option<String>,
    /// The most recent result message, so reroll cleanup resolves an
    /// explicit identifier instead of parsing embed footers.
    pub result_message_id: Option<String>,
    pub entrants: Vec<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// One-way flag set exactly once by the expiry scan (or force-end
    /// routed through it). Never unset.
    #[serde(default)]
    pub ended: bool,
    /// Short audit hash, present only after a winner selection has run.
    pub final_hash: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Giveaway {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.ended && self.end_time <= now
    }
}

/// Giveaway creation request
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateGiveawayRequest {
    /// Display title
    pub title: String,
    /// Display description
    pub description: String,
    /// Open window length in hours (fractions allowed)
    pub duration_hours: f64,
    /// Destination channel for the announcement and the results
    pub channel_id: String,
}

/// Giveaway state as exposed over the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GiveawayResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub message_id: Option<String>,
    pub end_time: DateTime<Utc>,
    pub ended: bool,
    pub final_hash: Option<String>,
    /// Total entries including weight multiplicity
    pub entry_count: usize,
}

impl From<Giveaway> for GiveawayResponse {
    fn from(g: Giveaway) -> Self {
        GiveawayResponse {
            entry_count: g.entrants.len(),
            id: g.id,
            title: g.title,
            description: g.description,
            channel_id: g.channel_id,
            message_id: g.message_id,
            end_time: g.end_time,
            ended: g.ended,
            final_hash: g.final_hash,
        }
    }
}

/// Join request; the chat gateway resolves the acting user and its roles
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct JoinRequest {
    pub user_id: String,
    /// Role names of the acting user, matched against the configured
    /// entry multiplier map
    #[serde(default)]
    pub role_names: Vec<String>,
}

/// Join result
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JoinResponse {
    /// Number of entries granted (1 without a multiplier role)
    pub multiplier: u32,
}

/// Leave request
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct LeaveRequest {
    pub user_id: String,
}

/// One distinct identity with its occurrence count
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntrantEntry {
    pub user_id: String,
    pub entries: u32,
}

/// Display view of the entry pool (per-identity counts, not the raw multiset)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntrantsSummaryResponse {
    pub entrants: Vec<EntrantEntry>,
    pub total_entries: usize,
}

/// Reroll request; `can_manage` is the capability check supplied by the
/// chat gateway, not derived here
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RerollRequest {
    pub user_id: String,
    #[serde(default)]
    pub can_manage: bool,
}

/// Reroll result
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RerollResponse {
    pub winner_id: String,
    pub final_hash: String,
}

/// Cancel deletes the record outright; end routes the giveaway through the
/// normal expiry scan on its next pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EndMode {
    Cancel,
    End,
}

/// Cancel-or-end request
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct EndGiveawayRequest {
    pub mode: EndMode,
}

/// Audit inspection view
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DebugResponse {
    pub giveaway_id: String,
    pub channel_id: String,
    /// Stored short audit hash, "0" before any selection has run
    pub final_hash: String,
    pub algorithm: String,
    pub salt: String,
    pub entrant_count: usize,
    /// Winning index recomputed from the stored short hash
    pub winner_index: usize,
}

/// Shutdown request, restricted to the configured dev identity
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ShutdownRequest {
    pub user_id: String,
}
