//! Domain types shared by the web app and the CLI.

pub mod condition;
pub mod email;
pub mod id;

pub use condition::{Category, ConditionCounts, HasConditionCounts, Severity, SEVERITY_BANDS};
pub use email::{Email, EmailError};
pub use id::*;
