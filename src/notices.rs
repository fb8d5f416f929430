use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::api::{decode_records, ApiClient, ApiError};
use crate::error::StoreError;
use crate::models::{Attachment, Notice, NoticeCategory, NoticeDraft, NoticePatch};
use crate::store::{replace_by_id, CollectionStore, Entity, RemoteCollection};
use crate::validate::Validate;

const NOTICES_PATH: &str = "/api/v1/notices";
const NOTICE_PDF_PATH: &str = "/api/v1/notices/notice_pdf";
const NOTICE_PDF_FIELD: &str = "notice";

pub type NoticeStore = CollectionStore<NoticeService>;

#[derive(Debug, Deserialize)]
struct NoticeRecord {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    content: Option<String>,
    category: NoticeCategory,
    author: String,
    #[serde(default)]
    attachments: Option<String>,
    #[serde(default)]
    pinned: Option<bool>,
    #[serde(rename = "createdAt")]
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct NoticeList {
    notices: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SingleNotice {
    notice: NoticeRecord,
}

impl TryFrom<NoticeRecord> for Notice {
    type Error = ApiError;

    fn try_from(record: NoticeRecord) -> Result<Self, Self::Error> {
        Ok(Notice {
            date: calendar_date(&record.created_at)?,
            id: record.id,
            title: record.title,
            content: record.content.unwrap_or_default(),
            category: record.category,
            author: record.author,
            attachment: record.attachments.filter(|path| !path.is_empty()),
            pinned: record.pinned.unwrap_or(false),
        })
    }
}

/// The date part of a server timestamp, as written by the server.
fn calendar_date(created_at: &str) -> Result<NaiveDate, ApiError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(created_at) {
        return Ok(timestamp.date_naive());
    }
    let day = created_at.split('T').next().unwrap_or(created_at);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|err| ApiError::Decode(format!("invalid createdAt {:?}: {}", created_at, err)))
}

#[derive(Clone)]
pub struct NoticeService {
    api: ApiClient,
}

impl NoticeService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn fetch(&self, id: &str) -> Result<Notice, ApiError> {
        let resp: SingleNotice = self.api.get(&format!("{}/{}", NOTICES_PATH, id)).await?;
        resp.notice.try_into()
    }
}

#[async_trait]
impl RemoteCollection for NoticeService {
    type Entity = Notice;
    type Draft = NoticeDraft;
    type Patch = NoticePatch;

    async fn list(&self) -> Result<Vec<Notice>, ApiError> {
        let resp: NoticeList = self.api.get(NOTICES_PATH).await?;
        Ok(decode_records::<NoticeRecord, Notice>(Notice::CACHE_KEY, resp.notices))
    }

    async fn create(&self, draft: &NoticeDraft) -> Result<Notice, ApiError> {
        let resp: SingleNotice = self.api.post(NOTICES_PATH, draft).await?;
        resp.notice.try_into()
    }

    async fn update(&self, id: &str, patch: &NoticePatch) -> Result<Notice, ApiError> {
        let resp: SingleNotice = self
            .api
            .patch(&format!("{}/{}", NOTICES_PATH, id), patch)
            .await?;
        resp.notice.try_into()
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete(&format!("{}/{}", NOTICES_PATH, id)).await
    }
}

/// A notice remote that can also receive PDF uploads.
#[async_trait]
pub trait AttachmentRemote: RemoteCollection<Entity = Notice> {
    async fn attach(&self, notice_id: &str, attachment: &Attachment) -> Result<Notice, ApiError>;
}

#[async_trait]
impl AttachmentRemote for NoticeService {
    async fn attach(&self, notice_id: &str, attachment: &Attachment) -> Result<Notice, ApiError> {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str("application/pdf")?;
        let form = Form::new().part(NOTICE_PDF_FIELD, part);

        let resp: SingleNotice = self
            .api
            .patch_multipart(&format!("{}/{}", NOTICE_PDF_PATH, notice_id), form)
            .await?;
        resp.notice.try_into()
    }
}

impl<R: AttachmentRemote> CollectionStore<R> {
    /// Creates the notice, then uploads its PDF against the new id.
    ///
    /// The two steps are not atomic. When the upload fails the notice stays,
    /// both here and on the server, without an attachment; the error carries
    /// its id so the caller can retry the upload or delete it.
    pub async fn create_with_attachment(
        &self,
        draft: &R::Draft,
        attachment: Option<&Attachment>,
    ) -> Result<Notice, StoreError> {
        draft.validate()?;
        if let Some(attachment) = attachment {
            attachment.validate()?;
        }

        let notice = self.create(draft).await?;
        let Some(attachment) = attachment else {
            return Ok(notice);
        };

        self.begin();
        tracing::info!(id = %notice.id, file = %attachment.file_name, "Uploading notice attachment");
        match self.remote().attach(&notice.id, attachment).await {
            Ok(updated) => {
                let id = notice.id.clone();
                let stored = updated.clone();
                self.commit(|items| replace_by_id(items, &id, stored));
                Ok(updated)
            }
            Err(err) => {
                self.record_failure("attach", &err);
                tracing::warn!(id = %notice.id, "Notice left without its attachment");
                Err(StoreError::AttachmentUpload {
                    notice_id: notice.id,
                    source: err,
                })
            }
        }
    }
}

impl Entity for Notice {
    const CACHE_KEY: &'static str = "fsu_notices";

    fn id(&self) -> &str {
        &self.id
    }

    fn defaults() -> Vec<Self> {
        default_notices()
    }

    fn assign_local_id(&mut self, id: String) {
        self.id = id;
    }
}

fn default_notices() -> Vec<Notice> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    vec![
        Notice {
            id: "1".to_string(),
            title: "End Semester Examination Schedule".to_string(),
            content: "The end semester examinations for all departments will begin from 15th February 2025. Students are advised to check the detailed schedule and prepare accordingly.".to_string(),
            category: NoticeCategory::Academic,
            author: "Examination Section".to_string(),
            date: date(2025, 1, 15),
            attachment: None,
            pinned: true,
        },
        Notice {
            id: "2".to_string(),
            title: "Annual Technical Festival: TechFest 2025".to_string(),
            content: "We are excited to announce our annual technical festival \"TechFest 2025\" which will be held from March 5-7, 2025. The event will feature various competitions, workshops, and guest lectures from industry experts.".to_string(),
            category: NoticeCategory::Event,
            author: "Event Coordinator".to_string(),
            date: date(2025, 1, 20),
            attachment: None,
            pinned: false,
        },
        Notice {
            id: "3".to_string(),
            title: "Scholarship Application Deadline".to_string(),
            content: "Applications for the Merit Scholarship program for the academic year 2025-26 are now open. Eligible students can apply through the online portal before February 28, 2025.".to_string(),
            category: NoticeCategory::Important,
            author: "Scholarship Committee".to_string(),
            date: date(2025, 1, 25),
            attachment: Some("scholarship_form.pdf".to_string()),
            pinned: false,
        },
    ]
}
