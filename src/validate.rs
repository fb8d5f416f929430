use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Attachment, NoticeDraft, NoticePatch, StatusChange, SuggestionDraft};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every problem found in one input, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|err| err.field == field)
            .map(|err| err.message.as_str())
    }

    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn require(&mut self, field: &'static str, label: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("{} is required", label));
        }
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|err| format!("{}: {}", err.field, err.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "invalid input: {}", joined)
    }
}

impl std::error::Error for ValidationErrors {}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

impl Validate for NoticeDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("title", "Title", &self.title);
        errors.require("content", "Content", &self.content);
        errors.require("author", "Author", &self.author);
        errors.into_result()
    }
}

impl Validate for NoticePatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.is_empty() {
            errors.add("patch", "No fields to update");
        }
        if let Some(title) = &self.title {
            errors.require("title", "Title", title);
        }
        if let Some(content) = &self.content {
            errors.require("content", "Content", content);
        }
        if let Some(author) = &self.author {
            errors.require("author", "Author", author);
        }
        errors.into_result()
    }
}

impl Validate for SuggestionDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.require("name", "Name", &self.name);
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if !EMAIL_RE.is_match(&self.email) {
            errors.add("email", "Email is invalid");
        }
        errors.require("department", "Department", &self.department);
        errors.require("subject", "Subject", &self.subject);
        errors.require("message", "Message", &self.message);
        errors.into_result()
    }
}

impl Validate for StatusChange {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl Validate for Attachment {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.bytes.is_empty() {
            errors.add("attachment", "Attachment is empty");
        }
        if !self.file_name.to_ascii_lowercase().ends_with(".pdf") {
            errors.add("attachment", "Only PDF files can be attached");
        }
        errors.into_result()
    }
}
