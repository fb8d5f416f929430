use std::cmp::Ordering;

use crate::models::{Notice, NoticeCategory, Suggestion, SuggestionStatus};

/// Pinned notices first, newest first within each group.
pub fn display_order(notices: &[Notice]) -> Vec<Notice> {
    let mut ordered = notices.to_vec();
    ordered.sort_by(|a, b| match (a.pinned, b.pinned) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => b.date.cmp(&a.date),
    });
    ordered
}

/// `None` keeps every category.
pub fn filter_by_category(notices: &[Notice], category: Option<NoticeCategory>) -> Vec<Notice> {
    notices
        .iter()
        .filter(|notice| category.map_or(true, |wanted| notice.category == wanted))
        .cloned()
        .collect()
}

pub fn related<'a>(notices: &'a [Notice], id: &str) -> Vec<&'a Notice> {
    notices.iter().filter(|notice| notice.id != id).collect()
}

pub fn filter_by_status(suggestions: &[Suggestion], status: Option<SuggestionStatus>) -> Vec<Suggestion> {
    suggestions
        .iter()
        .filter(|suggestion| status.map_or(true, |wanted| suggestion.status == wanted))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub reviewed: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn tally(suggestions: &[Suggestion]) -> Self {
        suggestions.iter().fold(Self::default(), |mut counts, suggestion| {
            match suggestion.status {
                SuggestionStatus::Pending => counts.pending += 1,
                SuggestionStatus::Reviewed => counts.reviewed += 1,
                SuggestionStatus::Rejected => counts.rejected += 1,
            }
            counts
        })
    }

    pub fn get(&self, status: SuggestionStatus) -> usize {
        match status {
            SuggestionStatus::Pending => self.pending,
            SuggestionStatus::Reviewed => self.reviewed,
            SuggestionStatus::Rejected => self.rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_notices: usize,
    pub total_suggestions: usize,
    pub pending_suggestions: usize,
}

impl DashboardStats {
    pub fn collect(notices: &[Notice], suggestions: &[Suggestion]) -> Self {
        Self {
            total_notices: notices.len(),
            total_suggestions: suggestions.len(),
            pending_suggestions: StatusCounts::tally(suggestions).pending,
        }
    }
}
