use std::collections::BTreeMap;

use uuid::Uuid;

use crate::exam::descriptor::QuestionType;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            filename: sanitized_filename(filename),
            content_type: content_type.to_string(),
            bytes,
        }
    }
}

// Metadata without the payload, for snapshots rendered every second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub id: String,
    pub filename: String,
    pub size_bytes: usize,
}

// Mutation after lock is ignored, not an error; a UI mid-render during the
// terminal transition must not crash the session.
#[derive(Debug)]
pub struct AnswerCollector {
    selections: BTreeMap<String, String>,
    attachments: Vec<Attachment>,
    max_attachments: usize,
    locked: bool,
}

impl AnswerCollector {
    pub(crate) fn new(max_attachments: usize) -> Self {
        Self { selections: BTreeMap::new(), attachments: Vec::new(), max_attachments, locked: false }
    }

    pub(crate) fn select(&mut self, question_id: &str, choice: &str) -> bool {
        if self.locked {
            tracing::warn!(question_id, "Ignoring answer selection after submission");
            return false;
        }
        self.selections.insert(question_id.to_string(), choice.to_string());
        true
    }

    pub(crate) fn attach(&mut self, attachment: Attachment) -> bool {
        if self.locked {
            tracing::warn!(filename = %attachment.filename, "Ignoring attachment after submission");
            return false;
        }
        if self.attachments.len() >= self.max_attachments {
            tracing::warn!(
                filename = %attachment.filename,
                limit = self.max_attachments,
                "Attachment limit reached, ignoring upload"
            );
            return false;
        }
        self.attachments.push(attachment);
        true
    }

    pub(crate) fn remove_attachment(&mut self, id: &str) -> bool {
        if self.locked {
            return false;
        }
        let before = self.attachments.len();
        self.attachments.retain(|attachment| attachment.id != id);
        before != self.attachments.len()
    }

    pub(crate) fn lock(&mut self) {
        self.locked = true;
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.attachments.is_empty()
    }

    // Written answers need at least one attachment; MCQ accepts any number
    // of selections including zero.
    pub(crate) fn submittable(&self, question_type: QuestionType) -> bool {
        match question_type {
            QuestionType::Mcq => true,
            QuestionType::Written => !self.attachments.is_empty(),
        }
    }

    pub(crate) fn selections(&self) -> &BTreeMap<String, String> {
        &self.selections
    }

    pub(crate) fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub(crate) fn attachment_metas(&self) -> Vec<AttachmentMeta> {
        self.attachments
            .iter()
            .map(|attachment| AttachmentMeta {
                id: attachment.id.clone(),
                filename: attachment.filename.clone(),
                size_bytes: attachment.bytes.len(),
            })
            .collect()
    }
}

fn sanitized_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect();

    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selections_are_last_write_wins() {
        let mut collector = AnswerCollector::new(10);
        collector.select("q1", "a");
        collector.select("q2", "c");
        collector.select("q1", "b");

        assert_eq!(collector.selections().get("q1").map(String::as_str), Some("b"));
        assert_eq!(collector.selections().len(), 2);
    }

    #[test]
    fn attachment_list_is_bounded() {
        let mut collector = AnswerCollector::new(2);
        assert!(collector.attach(Attachment::new("page-1.jpg", "image/jpeg", vec![1])));
        assert!(collector.attach(Attachment::new("page-2.jpg", "image/jpeg", vec![2])));
        assert!(!collector.attach(Attachment::new("page-3.jpg", "image/jpeg", vec![3])));
        assert_eq!(collector.attachments().len(), 2);
    }

    #[test]
    fn removal_frees_a_slot() {
        let mut collector = AnswerCollector::new(1);
        let attachment = Attachment::new("draft.png", "image/png", vec![0; 16]);
        let id = attachment.id.clone();
        assert!(collector.attach(attachment));
        assert!(!collector.attach(Attachment::new("extra.png", "image/png", vec![1])));

        assert!(collector.remove_attachment(&id));
        assert!(collector.attach(Attachment::new("extra.png", "image/png", vec![1])));
        assert!(!collector.remove_attachment("not-there"));
    }

    #[test]
    fn locked_collector_ignores_mutation() {
        let mut collector = AnswerCollector::new(10);
        collector.select("q1", "a");
        let attachment = Attachment::new("work.jpg", "image/jpeg", vec![9]);
        let id = attachment.id.clone();
        collector.attach(attachment);

        collector.lock();
        assert!(!collector.select("q1", "b"));
        assert!(!collector.attach(Attachment::new("late.jpg", "image/jpeg", vec![7])));
        assert!(!collector.remove_attachment(&id));
        assert_eq!(collector.selections().get("q1").map(String::as_str), Some("a"));
        assert_eq!(collector.attachments().len(), 1);
    }

    #[test]
    fn submittability_depends_on_question_type() {
        let mut collector = AnswerCollector::new(10);
        assert!(collector.submittable(QuestionType::Mcq));
        assert!(!collector.submittable(QuestionType::Written));

        collector.attach(Attachment::new("solution.pdf", "application/pdf", vec![1, 2, 3]));
        assert!(collector.submittable(QuestionType::Written));
    }

    #[test]
    fn filenames_are_sanitized() {
        let attachment = Attachment::new("../../oops répönse.pdf", "application/pdf", vec![]);
        assert_eq!(attachment.filename, "....oopsrpnse.pdf");

        let unnamed = Attachment::new("§§§", "image/png", vec![]);
        assert_eq!(unnamed.filename, "upload");
    }
}
