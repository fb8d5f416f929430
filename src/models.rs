use std::fmt;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeCategory {
    Academic,
    Event,
    General,
    Important,
}

impl NoticeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeCategory::Academic => "academic",
            NoticeCategory::Event => "event",
            NoticeCategory::General => "general",
            NoticeCategory::Important => "important",
        }
    }
}

impl fmt::Display for NoticeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category: NoticeCategory,
    pub author: String,
    #[serde(default = "local_today")]
    pub date: NaiveDate,
    #[serde(default)]
    pub attachment: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

impl Notice {
    /// Absolute URL of the attached PDF, if any.
    pub fn attachment_url(&self, base_url: &str) -> Option<String> {
        self.attachment
            .as_ref()
            .map(|path| format!("{}{}", base_url.trim_end_matches('/'), path))
    }

    pub fn attachment_file_name(&self) -> String {
        let slug: String = self
            .title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        format!("{}.pdf", slug)
    }
}

/// Fields accepted when creating a notice. Id and date come from the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticeDraft {
    pub title: String,
    pub content: String,
    pub category: NoticeCategory,
    pub author: String,
    pub pinned: bool,
}

/// Partial notice update. Only the fields the server treats as mutable exist here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NoticePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<NoticeCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
}

impl NoticePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category.is_none()
            && self.author.is_none()
            && self.pinned.is_none()
    }
}

/// A PDF file to upload against an existing notice.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    #[default]
    Pending,
    Reviewed,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Reviewed => "reviewed",
            SuggestionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub subject: String,
    pub message: String,
    #[serde(default = "Utc::now")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub status: SuggestionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionDraft {
    pub name: String,
    pub email: String,
    pub department: String,
    pub subject: String,
    #[serde(rename = "suggestion")]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub status: SuggestionStatus,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
