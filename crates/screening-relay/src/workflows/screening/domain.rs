use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifier wrapper scoping one pending result to one logical submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Build an identifier unique enough that concurrent submissions across
    /// client sessions do not collide: a UTC timestamp prefix plus a random
    /// suffix.
    pub fn generate() -> Self {
        let prefix = Utc::now().format("%Y%m%d%H%M%S");
        let suffix = Uuid::new_v4().simple();
        Self(format!("{prefix}-{suffix}"))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Addresses one slot in the result store.
///
/// `Singleton` is the identifier-less variant where the whole process shares
/// one slot; `Request` scopes a slot to a single submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKey {
    Singleton,
    Request(RequestId),
}

impl SlotKey {
    pub fn request(id: impl Into<String>) -> Self {
        Self::Request(RequestId(id.into()))
    }
}

/// Entity details collected from the submitting user. Serialized camelCase to
/// match the provider submission contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySubmission {
    pub entity_name: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A buffered provider callback awaiting pickup by a polling client.
///
/// The payload is opaque: an arbitrary JSON document, or an `{"html": ...}`
/// object synthesized from a form-encoded callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingResult {
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

/// Returned by a successful submission so the caller knows where to poll.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub request_id: RequestId,
    pub provider: String,
    pub endpoint: String,
    pub callback_url: String,
}
