pub mod engine;

pub use engine::{Decision, RiskLevel, SecurityPolicy};
