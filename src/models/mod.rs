pub mod loaders;
pub mod posting;
pub mod profile;
pub mod question;
pub mod record;
pub mod session;
pub mod summary;

pub use loaders::{load_profile, parse_profile};
pub use posting::{ApplyMode, JobPosting, Platform};
pub use profile::{
    AnswerRule, ApplicantProfile, ContactInfo, DefaultStance, LocationBias, SearchPlan,
};
pub use question::{InputShape, Question};
pub use record::{ApplicationRecord, ApplicationStatus, PLATFORM_BLOCKED, UNRESOLVED_QUESTION};
pub use session::PlatformSession;
pub use summary::{CycleReport, CycleSummary, HaltReason, PlatformCounts};
