use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Store, SyncDescriptor, SyncStatus};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync id '{0}' was not found on the server")]
    NotFound(String),
    #[error("Sync id '{0}' has no data")]
    EmptyPayload(String),
    #[error("Server returned {0}")]
    Status(StatusCode),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Remote data is not a planner store: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Sync id must not be empty")]
    EmptyId,
    #[error("Sync id '{0}' may only contain letters, digits, '-' and '_'")]
    InvalidId(String),
    #[error("Invalid sync server URL '{0}'")]
    InvalidUrl(String),
}

impl SyncError {
    /// Text for the blocking notification shown to the user
    pub fn user_message(&self) -> String {
        match self {
            SyncError::NotFound(id) => format!(
                "ID '{}' not found. Publish from the other device first, then fetch here.",
                id
            ),
            SyncError::EmptyPayload(id) => format!(
                "Nothing stored under '{}' yet. Send your data first.",
                id
            ),
            SyncError::Status(code) => format!(
                "The sync server answered {}. Try again in a moment.",
                code
            ),
            SyncError::Network(_) => {
                "Could not reach the sync server. Check your internet connection.".to_string()
            }
            SyncError::Decode(_) => {
                "The data under this ID is not a planner backup.".to_string()
            }
            SyncError::EmptyId => "Type a sync ID first.".to_string(),
            SyncError::InvalidId(id) => format!(
                "'{}' is not a sync ID. IDs only use letters and digits.",
                id
            ),
            SyncError::InvalidUrl(url) => format!(
                "The sync server URL '{}' is invalid. Check [sync] base_url in the config.",
                url
            ),
        }
    }
}

/// A key/value bucket holding whole serialized stores.
pub trait RemoteBucket: Send + Sync {
    /// Replace the value stored under `id`
    fn put(&self, id: &str, body: &str) -> Result<(), SyncError>;

    /// Read the value under `id`; `None` when nothing was ever stored
    fn get(&self, id: &str) -> Result<Option<String>, SyncError>;
}

/// The public HTTP bucket: `PUT`/`GET` on `{base_url}/{id}`
pub struct HttpBucket {
    base_url: Url,
    http: Client,
}

impl HttpBucket {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        Self::with_client(base_url, Client::builder().build()?)
    }

    pub fn with_client(base_url: &str, http: Client) -> Result<Self, SyncError> {
        let invalid = || SyncError::InvalidUrl(base_url.to_string());
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|_| invalid())?;
        if base_url.cannot_be_a_base() {
            return Err(invalid());
        }
        Ok(Self { base_url, http })
    }

    /// The id always lands as one percent-encoded path segment
    fn url(&self, id: &str) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}

impl RemoteBucket for HttpBucket {
    fn put(&self, id: &str, body: &str) -> Result<(), SyncError> {
        let resp = self
            .http
            .put(self.url(id)?)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()?;

        if !resp.status().is_success() {
            return Err(SyncError::Status(resp.status()));
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<String>, SyncError> {
        let resp = self.http.get(self.url(id)?).send()?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(resp.text()?)),
            s => Err(SyncError::Status(s)),
        }
    }
}

fn checked_id(id: &str) -> Result<&str, SyncError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(SyncError::EmptyId);
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(SyncError::InvalidId(id.to_string()));
    }
    Ok(id)
}

/// Replace the remote value under `id` with the whole store
pub fn publish(bucket: &dyn RemoteBucket, id: &str, store: &Store) -> Result<(), SyncError> {
    let id = checked_id(id)?;
    let body = serde_json::to_string(store)?;
    bucket.put(id, &body)?;
    info!(sync_id = id, days = store.days.len(), "published store");
    Ok(())
}

/// Read the whole store under `id`. Local state is the caller's business.
pub fn fetch(bucket: &dyn RemoteBucket, id: &str) -> Result<Store, SyncError> {
    let id = checked_id(id)?;
    let body = bucket
        .get(id)?
        .ok_or_else(|| SyncError::NotFound(id.to_string()))?;

    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(SyncError::EmptyPayload(id.to_string()));
    }

    let store: Store = serde_json::from_str(trimmed)?;
    info!(sync_id = id, days = store.days.len(), "fetched store");
    Ok(store)
}

/// Short shareable code: 8 lowercase alphanumerics
pub fn generate_sync_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// The remote-mirror session: the persisted descriptor plus when the last
/// operation settled, so its outcome can fade back to idle.
#[derive(Debug, Clone)]
pub struct SyncSession {
    pub descriptor: SyncDescriptor,
    settled_at: Option<Instant>,
}

impl SyncSession {
    pub fn new(descriptor: SyncDescriptor) -> Self {
        Self {
            descriptor,
            settled_at: None,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.descriptor.status
    }

    pub fn begin(&mut self) {
        self.descriptor.status = SyncStatus::Syncing;
        self.settled_at = None;
    }

    pub fn succeed(&mut self, at: DateTime<Utc>) {
        self.descriptor.status = SyncStatus::Success;
        self.descriptor.last_sync = Some(at);
        self.settled_at = Some(Instant::now());
    }

    pub fn fail(&mut self) {
        self.descriptor.status = SyncStatus::Error;
        self.settled_at = Some(Instant::now());
    }

    /// Reset a success/error status to idle once `delay` has passed.
    /// Returns true when the status changed.
    pub fn expire(&mut self, delay: Duration) -> bool {
        match self.settled_at {
            Some(at) if at.elapsed() >= delay => {
                self.descriptor.status = SyncStatus::Idle;
                self.settled_at = None;
                debug!("sync status reset to idle");
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ChannelKind, TaskEdit};
    use crate::planner::DayKey;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-process stand-in for the public bucket
    #[derive(Default)]
    pub(crate) struct MemoryBucket {
        pub(crate) values: Mutex<HashMap<String, String>>,
    }

    impl RemoteBucket for MemoryBucket {
        fn put(&self, id: &str, body: &str) -> Result<(), SyncError> {
            self.values.lock().unwrap().insert(id.to_string(), body.to_string());
            Ok(())
        }

        fn get(&self, id: &str) -> Result<Option<String>, SyncError> {
            Ok(self.values.lock().unwrap().get(id).cloned())
        }
    }

    fn sample_store() -> Store {
        let mut store = Store::default();
        let day = DayKey::from_date(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap());
        store.toggle_channel(&day, ChannelKind::GoogleBusiness);
        store.update_task(&day, ChannelKind::GoogleBusiness, "ge-post", TaskEdit::Images("fachada".into()));
        store
    }

    #[test]
    fn publish_then_fetch_from_fresh_client() {
        let bucket = MemoryBucket::default();
        let store = sample_store();
        publish(&bucket, "x1y2z3w4", &store).unwrap();

        let fetched = fetch(&bucket, "x1y2z3w4").unwrap();
        assert_eq!(fetched, store);
    }

    #[test]
    fn publish_replaces_previous_value() {
        let bucket = MemoryBucket::default();
        publish(&bucket, "id", &sample_store()).unwrap();
        publish(&bucket, "id", &Store::default()).unwrap();
        assert_eq!(fetch(&bucket, "id").unwrap(), Store::default());
    }

    #[test]
    fn fetching_unknown_id_is_not_found() {
        let bucket = MemoryBucket::default();
        let err = fetch(&bucket, "never").unwrap_err();
        assert!(matches!(err, SyncError::NotFound(ref id) if id == "never"));
        assert!(err.user_message().contains("not found"));
    }

    #[test]
    fn empty_or_null_payload_is_reported() {
        let bucket = MemoryBucket::default();
        bucket.put("blank", "  ").unwrap();
        bucket.put("null", "null").unwrap();
        assert!(matches!(fetch(&bucket, "blank"), Err(SyncError::EmptyPayload(_))));
        assert!(matches!(fetch(&bucket, "null"), Err(SyncError::EmptyPayload(_))));
    }

    #[test]
    fn garbage_payload_is_a_decode_error() {
        let bucket = MemoryBucket::default();
        bucket.put("junk", "<html>").unwrap();
        assert!(matches!(fetch(&bucket, "junk"), Err(SyncError::Decode(_))));
    }

    #[test]
    fn ids_are_trimmed_and_must_not_be_empty() {
        let bucket = MemoryBucket::default();
        publish(&bucket, " abc ", &Store::default()).unwrap();
        assert!(fetch(&bucket, "abc").is_ok());
        assert!(matches!(fetch(&bucket, "   "), Err(SyncError::EmptyId)));
        assert!(matches!(publish(&bucket, "", &Store::default()), Err(SyncError::EmptyId)));
    }

    #[test]
    fn ids_outside_the_safe_alphabet_are_rejected() {
        let bucket = MemoryBucket::default();
        for id in ["../OtherBucket", "abc#frag", "abc?x=1", "a b", ".."] {
            assert!(
                matches!(fetch(&bucket, id), Err(SyncError::InvalidId(_))),
                "{id} was accepted"
            );
        }
        assert!(publish(&bucket, "Ab-1_z", &Store::default()).is_ok());
    }

    #[test]
    fn id_is_a_single_encoded_path_segment() {
        let bucket = HttpBucket::new("https://kvdb.io/DivulgaLocalPlanner/").unwrap();
        assert_eq!(
            bucket.url("a1b2c3d4").unwrap().as_str(),
            "https://kvdb.io/DivulgaLocalPlanner/a1b2c3d4"
        );
        for id in ["../OtherBucket", "abc#frag", "abc?x=1"] {
            let url = bucket.url(id).unwrap();
            assert_eq!(url.host_str(), Some("kvdb.io"));
            assert_eq!(url.query(), None, "{id}");
            assert_eq!(url.fragment(), None, "{id}");
            let segments: Vec<_> = url.path_segments().unwrap().collect();
            assert_eq!(segments.len(), 2, "{id} -> {url}");
            assert_eq!(segments[0], "DivulgaLocalPlanner");
        }
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(HttpBucket::new("not a url"), Err(SyncError::InvalidUrl(_))));
        assert!(matches!(HttpBucket::new("mailto:someone"), Err(SyncError::InvalidUrl(_))));
    }

    /// Answer one HTTP request on a local port; the handle yields the request line and body
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, std::thread::JoinHandle<(String, String)>) {
        use std::io::{BufRead, BufReader, Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/bucket", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header.trim().is_empty() {
                    break;
                }
                if let Some(value) = header.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let response = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            (
                request_line.trim_end().to_string(),
                String::from_utf8(request_body).unwrap(),
            )
        });
        (base_url, handle)
    }

    fn local_bucket(base_url: &str) -> HttpBucket {
        let http = Client::builder().no_proxy().build().unwrap();
        HttpBucket::with_client(base_url, http).unwrap()
    }

    #[test]
    fn http_get_maps_404_to_none() {
        let (base_url, server) = serve_once("HTTP/1.1 404 Not Found", "");
        let bucket = local_bucket(&base_url);

        assert_eq!(bucket.get("abc123").unwrap(), None);
        let (request_line, _) = server.join().unwrap();
        assert_eq!(request_line, "GET /bucket/abc123 HTTP/1.1");
    }

    #[test]
    fn http_fetch_of_unpublished_id_is_not_found() {
        let (base_url, server) = serve_once("HTTP/1.1 404 Not Found", "");
        let err = fetch(&local_bucket(&base_url), "never").unwrap_err();
        assert!(matches!(err, SyncError::NotFound(ref id) if id == "never"));
        server.join().unwrap();
    }

    #[test]
    fn http_get_returns_body_on_success() {
        let (base_url, server) = serve_once("HTTP/1.1 200 OK", "{}");
        assert_eq!(local_bucket(&base_url).get("abc").unwrap().as_deref(), Some("{}"));
        server.join().unwrap();
    }

    #[test]
    fn http_get_reports_server_errors() {
        let (base_url, server) = serve_once("HTTP/1.1 500 Internal Server Error", "oops");
        let err = local_bucket(&base_url).get("abc").unwrap_err();
        assert!(matches!(err, SyncError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        server.join().unwrap();
    }

    #[test]
    fn http_put_sends_body_and_checks_status() {
        let (base_url, server) = serve_once("HTTP/1.1 200 OK", "");
        local_bucket(&base_url).put("abc", r#"{"2024-6-12":{}}"#).unwrap();
        let (request_line, body) = server.join().unwrap();
        assert_eq!(request_line, "PUT /bucket/abc HTTP/1.1");
        assert_eq!(body, r#"{"2024-6-12":{}}"#);

        let (base_url, server) = serve_once("HTTP/1.1 503 Service Unavailable", "");
        let err = local_bucket(&base_url).put("abc", "{}").unwrap_err();
        assert!(matches!(err, SyncError::Status(StatusCode::SERVICE_UNAVAILABLE)));
        server.join().unwrap();
    }

    #[test]
    fn generated_ids_are_short_and_distinct() {
        let a = generate_sync_id();
        let b = generate_sync_id();
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn session_status_lifecycle() {
        let mut session = SyncSession::new(SyncDescriptor::new("abc".to_string()));
        assert!(!session.expire(Duration::ZERO));

        session.begin();
        assert_eq!(session.status(), SyncStatus::Syncing);
        // In-flight operations never expire
        assert!(!session.expire(Duration::ZERO));

        let now = Utc::now();
        session.succeed(now);
        assert_eq!(session.status(), SyncStatus::Success);
        assert_eq!(session.descriptor.last_sync, Some(now));
        assert!(!session.expire(Duration::from_secs(3600)));
        assert!(session.expire(Duration::ZERO));
        assert_eq!(session.status(), SyncStatus::Idle);

        session.begin();
        session.fail();
        assert_eq!(session.status(), SyncStatus::Error);
        assert_eq!(session.descriptor.last_sync, Some(now));
        assert!(session.expire(Duration::ZERO));
    }
}
