use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Profile fields returned by the external enrichment source.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EnrichmentProfile {
    pub display_name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
}

/// Locally computed aggregates over an attendee's past sessions.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SessionHistory {
    pub total_sessions: i64,
    pub attended: i64,
    pub no_shows: i64,
    pub last_session_at: Option<DateTime<Utc>>,
    pub recent_topics: Vec<String>,
}

/// Immutable snapshot served to the dashboard when an attendee row is
/// expanded. `fetched_at` drives TTL checks in the cache layer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AttendeeContext {
    pub email: String,
    pub profile: Option<EnrichmentProfile>,
    pub history: SessionHistory,
    pub fetched_at: DateTime<Utc>,
}
