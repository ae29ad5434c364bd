// nexus-domain library entry point
pub mod attendee;
pub mod error;
pub mod outcome;
pub mod payload;
pub mod stats;

pub use attendee::Attendee;
pub use error::DomainError;
pub use outcome::{MarkResult, ScanOutcome};
pub use payload::CodePayload;
pub use stats::AttendanceStats;
