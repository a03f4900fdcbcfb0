//! Reduces full event payloads to the fields worth keeping in the details
//! cache.

use serde_json::{Map, Value};

use crate::event::{GitHubEvent, PrunedPayload};

/// Turns a full event into the payload stored alongside its details.
///
/// Implementations must be pure: the same event always prunes to the same
/// payload.
pub trait PayloadPruner: Send + Sync {
  fn prune(&self, event: &GitHubEvent) -> PrunedPayload;
}

impl<F> PayloadPruner for F
where
  F: Fn(&GitHubEvent) -> PrunedPayload + Send + Sync,
{
  fn prune(&self, event: &GitHubEvent) -> PrunedPayload {
    self(event)
  }
}

/// The default pruner, aware of the common GitHub event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitHubPayloadPruner {
  /// Commits kept from a push, newest-first as the API lists them.
  pub max_commits: usize,
  /// Long text (bodies, commit messages) is cut to this many chars.
  pub max_body_chars: usize,
}

impl Default for GitHubPayloadPruner {
  fn default() -> Self {
    Self {
      max_commits: 10,
      max_body_chars: 500,
    }
  }
}

impl GitHubPayloadPruner {
  fn text(&self, value: Option<&Value>) -> Value {
    match value {
      Some(Value::String(s)) => Value::String(truncate_chars(s, self.max_body_chars)),
      Some(other) => other.clone(),
      None => Value::Null,
    }
  }

  fn push(&self, payload: &Map<String, Value>) -> Map<String, Value> {
    let mut out = pick(payload, &["ref", "head", "before", "size", "distinct_size"]);
    let commits = payload
      .get("commits")
      .and_then(Value::as_array)
      .map(|commits| {
        commits
          .iter()
          .take(self.max_commits)
          .map(|commit| {
            let mut c = Map::new();
            c.insert("sha".into(), commit.get("sha").cloned().unwrap_or(Value::Null));
            c.insert("message".into(), self.text(commit.get("message")));
            Value::Object(c)
          })
          .collect::<Vec<_>>()
      })
      .unwrap_or_default();
    out.insert("commits".into(), Value::Array(commits));
    out
  }

  // Keeps the listed fields of a nested object, truncating `body`.
  fn nested(&self, payload: &Map<String, Value>, name: &str, fields: &[&str]) -> Option<Value> {
    let obj = payload.get(name)?.as_object()?;
    let mut out = pick(obj, fields);
    if fields.contains(&"body") {
      out.insert("body".into(), self.text(obj.get("body")));
    }
    Some(Value::Object(out))
  }

  fn prune_payload(&self, kind: &str, payload: &Map<String, Value>) -> Map<String, Value> {
    const ISSUE_FIELDS: &[&str] = &["number", "title", "state", "html_url"];
    const PR_FIELDS: &[&str] = &["number", "title", "state", "merged", "html_url", "body"];

    let mut out = Map::new();
    let keep = |out: &mut Map<String, Value>, name: &str, value: Option<Value>| {
      if let Some(value) = value {
        out.insert(name.to_string(), value);
      }
    };

    match kind {
      "PushEvent" => return self.push(payload),
      "PullRequestEvent" => {
        out = pick(payload, &["action", "number"]);
        keep(&mut out, "pull_request", self.nested(payload, "pull_request", PR_FIELDS));
      }
      "PullRequestReviewEvent" => {
        out = pick(payload, &["action"]);
        keep(&mut out, "pull_request", self.nested(payload, "pull_request", ISSUE_FIELDS));
        keep(&mut out, "review", self.nested(payload, "review", &["state", "html_url", "body"]));
      }
      "PullRequestReviewCommentEvent" => {
        out = pick(payload, &["action"]);
        keep(&mut out, "pull_request", self.nested(payload, "pull_request", ISSUE_FIELDS));
        keep(&mut out, "comment", self.nested(payload, "comment", &["html_url", "path", "body"]));
      }
      "IssuesEvent" => {
        out = pick(payload, &["action"]);
        let fields = &["number", "title", "state", "html_url", "body"];
        keep(&mut out, "issue", self.nested(payload, "issue", fields));
      }
      "IssueCommentEvent" => {
        out = pick(payload, &["action"]);
        keep(&mut out, "issue", self.nested(payload, "issue", ISSUE_FIELDS));
        keep(&mut out, "comment", self.nested(payload, "comment", &["html_url", "body"]));
      }
      "ReleaseEvent" => {
        out = pick(payload, &["action"]);
        let fields = &["tag_name", "name", "html_url", "prerelease"];
        keep(&mut out, "release", self.nested(payload, "release", fields));
      }
      "CreateEvent" | "DeleteEvent" => {
        out = pick(payload, &["ref", "ref_type", "description"]);
      }
      "ForkEvent" => {
        keep(&mut out, "forkee", self.nested(payload, "forkee", &["full_name", "html_url"]));
      }
      "WatchEvent" | "MemberEvent" | "PublicEvent" => {
        out = pick(payload, &["action"]);
      }
      _ => {
        for (name, value) in payload {
          if !value.is_object() && !value.is_array() {
            out.insert(name.clone(), self.text(Some(value)));
          }
        }
      }
    }
    out
  }
}

impl PayloadPruner for GitHubPayloadPruner {
  fn prune(&self, event: &GitHubEvent) -> PrunedPayload {
    match event.payload.as_object() {
      Some(payload) => Value::Object(self.prune_payload(&event.kind, payload)),
      None => Value::Object(Map::new()),
    }
  }
}

fn pick(obj: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
  fields
    .iter()
    .filter_map(|&f| obj.get(f).map(|v| (f.to_string(), v.clone())))
    .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    Some((cut, _)) => format!("{}…", &s[..cut]),
    None => s.to_string(),
  }
}
