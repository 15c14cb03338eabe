pub mod queue;

pub use queue::{ApprovalError, ApprovalQueue, ApprovalRequest, ApprovalStatus};
