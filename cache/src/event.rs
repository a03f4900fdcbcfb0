use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The pruned, storable body of an event. The caches treat it as inert data.
pub type PrunedPayload = Value;

/// The account that triggered an event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Actor {
  #[serde(default)]
  pub id: Option<u64>,
  #[serde(default)]
  pub login: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url: Option<String>,
}

/// The repository an event originated from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Repo {
  #[serde(default)]
  pub id: Option<u64>,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
}

/// A full event record as returned by the upstream events API.
///
/// Unknown fields are ignored so newer API shapes still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubEvent {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub actor: Option<Actor>,
  pub repo: Repo,
  #[serde(default)]
  pub payload: Value,
  #[serde(default)]
  pub public: bool,
  pub created_at: String,
}

/// The record kept in the details cache for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
  pub id: String,
  /// Creation time of the source event (ISO-8601), not the time it was cached.
  pub created_at: String,
  pub repo: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub payload: PrunedPayload,
}

impl EventDetails {
  pub(crate) fn from_event(event: &GitHubEvent, payload: PrunedPayload) -> Self {
    Self {
      id: event.id.clone(),
      created_at: event.created_at.clone(),
      repo: event.repo.name.clone(),
      kind: event.kind.clone(),
      payload,
    }
  }

  /// Parses `created_at`, if it is a valid RFC 3339 timestamp.
  pub fn created_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(&self.created_at)
      .ok()
      .map(|dt| dt.with_timezone(&chrono::Utc))
  }
}
