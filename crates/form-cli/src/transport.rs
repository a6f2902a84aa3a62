use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use form_spec::{FormSubmission, SubmissionPayload, SubmissionTransport, TransportError};
use tracing::debug;
use uuid::Uuid;

/// Stores submissions as `<id>.submission.json` files in a directory.
pub struct FileTransport {
    out_dir: PathBuf,
}

impl FileTransport {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

#[async_trait]
impl SubmissionTransport for FileTransport {
    async fn submit(
        &self,
        form_id: &str,
        payload: &SubmissionPayload,
    ) -> Result<FormSubmission, TransportError> {
        let id = Uuid::new_v4().to_string();
        let submitted_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let submission = FormSubmission::from_payload(id, form_id, submitted_at, payload);

        fs::create_dir_all(&self.out_dir)
            .map_err(|err| TransportError::Unavailable(err.to_string()))?;
        let path = self
            .out_dir
            .join(format!("{}.submission.json", submission.id));
        let contents = serde_json::to_string_pretty(&submission)
            .map_err(|err| TransportError::Other(Box::new(err)))?;
        fs::write(&path, contents).map_err(|err| TransportError::Unavailable(err.to_string()))?;

        debug!(path = %path.display(), "wrote submission");
        Ok(submission)
    }
}
