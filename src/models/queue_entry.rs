//! A QueueEntry is one not-yet-confirmed write headed for the authoritative
//! server. Entries live in their own SQL table (not the document store) so
//! the replayer can scan and mutate them cheaply, and they fully describe
//! the operation: replay may happen in a different process lifetime than the
//! one that queued them.

use ::error::{DError, DResult};
use ::util::json::Value;

/// The operations we replay against the remote.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Method {
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "DELETE")]
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    pub fn from_str(s: &str) -> DResult<Method> {
        match s {
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(DError::BadValue(format!("Method::from_str() -- bad method: {}", s))),
        }
    }

    pub fn to_http(&self) -> ::reqwest::Method {
        match *self {
            Method::Post => ::reqwest::Method::POST,
            Method::Put => ::reqwest::Method::PUT,
            Method::Delete => ::reqwest::Method::DELETE,
        }
    }
}

/// Entry delivery state. There is no "synced" here: a confirmed entry is
/// removed from the queue, not marked.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum QueueStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "failed")]
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match *self {
            QueueStatus::Pending => "pending",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> DResult<QueueStatus> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "failed" => Ok(QueueStatus::Failed),
            _ => Err(DError::BadValue(format!("QueueStatus::from_str() -- bad status: {}", s))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct QueueEntry {
    /// monotonic (sqlite rowid)
    pub id: i64,
    pub method: Method,
    /// logical resource path, `/<table>/<id>`
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub sync_status: QueueStatus,
    /// unix millis at enqueue time; replay order
    pub queued_at: i64,
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueueEntry {
    /// Split our endpoint back into (table, record id). Our enqueue paths
    /// always write `/<table>/<id>`, so anything else is a bug upstream.
    pub fn resource(&self) -> DResult<(String, String)> {
        let mut parts = self.endpoint.trim_matches('/').splitn(2, '/');
        let table = parts.next().unwrap_or("");
        let id = parts.next().unwrap_or("");
        if table == "" || id == "" {
            return Err(DError::BadValue(format!("QueueEntry.resource() -- unparseable endpoint: {}", self.endpoint)));
        }
        Ok((String::from(table), String::from(id)))
    }

    /// Whether this entry has been sitting in the queue longer than the
    /// given threshold. Pure UI policy; the replayer never filters on it.
    pub fn is_stale(&self, now_ms: i64, threshold_ms: i64) -> bool {
        now_ms - self.queued_at > threshold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(endpoint: &str) -> QueueEntry {
        QueueEntry {
            id: 1,
            method: Method::Post,
            endpoint: String::from(endpoint),
            body: None,
            sync_status: QueueStatus::Pending,
            queued_at: 1000,
            failure_count: 0,
            last_error: None,
        }
    }

    #[test]
    fn parses_resources() {
        let (table, id) = entry("/articles/art_94a1dd22").resource().unwrap();
        assert_eq!(table, "articles");
        assert_eq!(id, "art_94a1dd22");
        assert!(entry("/articles").resource().is_err());
        assert!(entry("/").resource().is_err());
    }

    #[test]
    fn method_round_trips() {
        for method in vec![Method::Post, Method::Put, Method::Delete] {
            assert_eq!(Method::from_str(method.as_str()).unwrap(), method);
        }
        assert!(Method::from_str("PATCH").is_err());
    }

    #[test]
    fn staleness_is_a_threshold() {
        let e = entry("/victims/abc");
        assert!(e.is_stale(100000, 3600));
        assert!(!e.is_stale(2000, 3600));
    }
}
