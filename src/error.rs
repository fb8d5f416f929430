use thiserror::Error;

use crate::api::ApiError;
use crate::validate::ValidationErrors;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The notice exists on the server, but without its attachment.
    #[error("notice {notice_id} was created but its attachment upload failed: {source}")]
    AttachmentUpload {
        notice_id: String,
        #[source]
        source: ApiError,
    },
}

impl StoreError {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            StoreError::Api(err) | StoreError::AttachmentUpload { source: err, .. } => Some(err),
            StoreError::Validation(_) => None,
        }
    }
}
