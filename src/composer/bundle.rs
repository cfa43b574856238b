use super::attachment::Attachment;

/// Everything one submission carries, assembled once at submit time.
///
/// `attachments` holds at most the pending image or audio clip. A text
/// document never appears here; its contents were spliced into `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionBundle {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl SubmissionBundle {
    pub fn new(text: String, pending: Option<Attachment>) -> Self {
        Self {
            text,
            attachments: pending.filter(Attachment::is_submittable).into_iter().collect(),
        }
    }

    /// A bundle with no text and nothing attached is not worth sending.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }
}
