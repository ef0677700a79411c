pub mod event;
pub mod judge_job;
pub mod judge_result;
pub mod match_status;
pub mod rank;
pub mod submission_status;
pub mod violation;

pub use match_status::{MatchEndReason, MatchStatus};
pub use rank::Rank;
pub use submission_status::SubmissionStatus;
pub use violation::ViolationKind;
