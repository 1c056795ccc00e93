pub mod core;
pub mod exam;
pub mod schemas;
pub mod services;
pub mod session;

pub use crate::core::config::{SessionSettings, Settings};
pub use crate::core::time::{Clock, ManualClock, SystemClock};
pub use crate::exam::descriptor::{
    ExamDescriptor, ExamStatus, ExamTiming, PriorSubmission, QuestionType,
};
pub use crate::exam::phase::{compute_phase, Phase, TimeRemaining};
pub use crate::services::exam_api::{ExamApi, HttpExamApi};
pub use crate::session::answers::{Attachment, AttachmentMeta};
pub use crate::session::controller::{SessionHandle, SessionManager, SessionSnapshot};
pub use crate::session::gate::SubmitTrigger;
pub use crate::session::notify::SessionNotice;

// The presentation shell calls this once at startup and keeps the returned
// settings around to build an HttpExamApi and a SessionManager.
pub fn init() -> anyhow::Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    core::telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    Ok(settings)
}
