#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use fsu_portal::api::ApiError;
use fsu_portal::models::{
    Attachment, Notice, NoticeCategory, NoticeDraft, NoticePatch, StatusChange, Suggestion, SuggestionDraft,
};
use fsu_portal::notices::AttachmentRemote;
use fsu_portal::store::{CollectionStore, RemoteCollection};
use fsu_portal::SnapshotCache;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

pub fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn notice(id: &str, title: &str, pinned: bool, date: NaiveDate) -> Notice {
    Notice {
        id: id.to_string(),
        title: title.to_string(),
        content: format!("{} details", title),
        category: NoticeCategory::General,
        author: "Student Union".to_string(),
        date,
        attachment: None,
        pinned,
    }
}

pub fn notice_draft(title: &str) -> NoticeDraft {
    NoticeDraft {
        title: title.to_string(),
        content: "Bring your ID card".to_string(),
        category: NoticeCategory::Academic,
        author: "Examination Section".to_string(),
        pinned: false,
    }
}

pub fn suggestion(id: &str, subject: &str) -> Suggestion {
    Suggestion {
        id: id.to_string(),
        name: "Anil".to_string(),
        email: "anil@college.edu".to_string(),
        department: "IT".to_string(),
        subject: subject.to_string(),
        message: format!("About {}", subject),
        date: Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap(),
        status: Default::default(),
    }
}

pub fn suggestion_draft(subject: &str) -> SuggestionDraft {
    SuggestionDraft {
        name: "Anil".to_string(),
        email: "anil@college.edu".to_string(),
        department: "IT".to_string(),
        subject: subject.to_string(),
        message: "Please consider this".to_string(),
    }
}

pub fn pdf(name: &str) -> Attachment {
    Attachment {
        file_name: name.to_string(),
        bytes: b"%PDF-1.4 test".to_vec(),
    }
}

/// In-memory stand-in for the server side of one collection.
pub struct FakeBackend<E> {
    pub records: Mutex<Vec<E>>,
    failing: Mutex<HashSet<&'static str>>,
    next_id: AtomicUsize,
    hold: Mutex<Option<Arc<Notify>>>,
    pub calls: Mutex<Vec<String>>,
}

impl<E: Clone> FakeBackend<E> {
    pub fn new(records: Vec<E>) -> Self {
        Self {
            records: Mutex::new(records),
            failing: Mutex::new(HashSet::new()),
            next_id: AtomicUsize::new(1),
            hold: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().remove(operation);
    }

    pub fn records(&self) -> Vec<E> {
        self.records.lock().clone()
    }

    /// Parks every later call until the returned handle is notified once per call.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.hold.lock() = Some(gate.clone());
        gate
    }

    async fn enter(&self, operation: &'static str) -> Result<(), ApiError> {
        self.calls.lock().push(operation.to_string());
        let gate = self.hold.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().contains(operation) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    fn server_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("No record with id {}", id),
    }
}

pub type FakeNotices = FakeBackend<Notice>;
pub type FakeSuggestions = FakeBackend<Suggestion>;

#[async_trait]
impl RemoteCollection for FakeNotices {
    type Entity = Notice;
    type Draft = NoticeDraft;
    type Patch = NoticePatch;

    async fn list(&self) -> Result<Vec<Notice>, ApiError> {
        self.enter("list").await?;
        Ok(self.records())
    }

    async fn create(&self, draft: &NoticeDraft) -> Result<Notice, ApiError> {
        self.enter("create").await?;
        let created = Notice {
            id: self.server_id(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            category: draft.category,
            author: draft.author.clone(),
            date: day(2025, 3, 1),
            attachment: None,
            pinned: draft.pinned,
        };
        self.records.lock().insert(0, created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &NoticePatch) -> Result<Notice, ApiError> {
        self.enter("update").await?;
        let mut records = self.records.lock();
        let notice = records
            .iter_mut()
            .find(|notice| notice.id == id)
            .ok_or_else(|| not_found(id))?;
        if let Some(title) = &patch.title {
            notice.title = title.clone();
        }
        if let Some(content) = &patch.content {
            notice.content = content.clone();
        }
        if let Some(category) = patch.category {
            notice.category = category;
        }
        if let Some(author) = &patch.author {
            notice.author = author.clone();
        }
        if let Some(pinned) = patch.pinned {
            notice.pinned = pinned;
        }
        Ok(notice.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.enter("delete").await?;
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|notice| notice.id != id);
        if records.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl AttachmentRemote for FakeNotices {
    async fn attach(&self, notice_id: &str, attachment: &Attachment) -> Result<Notice, ApiError> {
        self.enter("attach").await?;
        let mut records = self.records.lock();
        let notice = records
            .iter_mut()
            .find(|notice| notice.id == notice_id)
            .ok_or_else(|| not_found(notice_id))?;
        notice.attachment = Some(format!("/uploads/{}", attachment.file_name));
        Ok(notice.clone())
    }
}

#[async_trait]
impl RemoteCollection for FakeSuggestions {
    type Entity = Suggestion;
    type Draft = SuggestionDraft;
    type Patch = StatusChange;

    async fn list(&self) -> Result<Vec<Suggestion>, ApiError> {
        self.enter("list").await?;
        Ok(self.records())
    }

    async fn create(&self, draft: &SuggestionDraft) -> Result<Suggestion, ApiError> {
        self.enter("create").await?;
        let created = Suggestion {
            id: self.server_id(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            department: draft.department.clone(),
            subject: draft.subject.clone(),
            message: draft.message.clone(),
            date: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            status: Default::default(),
        };
        self.records.lock().insert(0, created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &StatusChange) -> Result<Suggestion, ApiError> {
        self.enter("update").await?;
        let mut records = self.records.lock();
        let suggestion = records
            .iter_mut()
            .find(|suggestion| suggestion.id == id)
            .ok_or_else(|| not_found(id))?;
        suggestion.status = patch.status;
        Ok(suggestion.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.enter("delete").await?;
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|suggestion| suggestion.id != id);
        if records.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

pub fn notice_store(records: Vec<Notice>) -> (CollectionStore<FakeNotices>, Arc<SnapshotCache>) {
    let cache = Arc::new(SnapshotCache::in_memory().unwrap());
    (CollectionStore::new(FakeBackend::new(records), cache.clone()), cache)
}

pub fn suggestion_store(records: Vec<Suggestion>) -> (CollectionStore<FakeSuggestions>, Arc<SnapshotCache>) {
    let cache = Arc::new(SnapshotCache::in_memory().unwrap());
    (CollectionStore::new(FakeBackend::new(records), cache.clone()), cache)
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub method: &'static str,
    pub path: String,
    pub status: u16,
    pub body: String,
}

impl Route {
    pub fn new(method: &'static str, path: &str, status: u16, body: serde_json::Value) -> Self {
        Self {
            method,
            path: path.to_string(),
            status,
            body: body.to_string(),
        }
    }

    pub fn raw(method: &'static str, path: &str, status: u16, body: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            status,
            body: body.to_string(),
        }
    }
}

/// Answers each request with the first route matching method and path,
/// 404 otherwise, and records what it received.
pub struct MockServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = respond(stream, &routes, &recorded).await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

async fn respond(
    mut stream: TcpStream,
    routes: &[Route],
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok());
    let chunked = headers
        .iter()
        .any(|(key, value)| key == "transfer-encoding" && value.contains("chunked"));

    if let Some(len) = content_length {
        while buf.len() < header_end + len {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    } else if chunked {
        while !buf.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    let body = buf[header_end..].to_vec();
    let route = routes
        .iter()
        .find(|route| route.method == method && route.path == path)
        .cloned();
    recorded.lock().push(RecordedRequest {
        method,
        path,
        headers,
        body,
    });

    let (status, body) = match route {
        Some(route) => (route.status, route.body),
        None => (404, r#"{"message":"route not found"}"#.to_string()),
    };
    let response = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
