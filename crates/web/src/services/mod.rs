//! Business logic services.
//!
//! # Services
//!
//! - `analysis` - Image normalization, detection, scoring, and persistence
//! - `auth` - Registration and password login
//! - `chatbot` - Support chatbot backed by a knowledge document
//! - `email` - Contact form delivery over SMTP
//! - `report` - PDF analysis reports

pub mod analysis;
pub mod auth;
pub mod chatbot;
pub mod email;
pub mod report;

pub use analysis::{AnalysisError, AnalysisRun, AnalysisService};
pub use auth::{AuthError, AuthService};
pub use chatbot::{ChatbotClient, ChatbotError};
pub use email::{EmailError, EmailService};
pub use report::{ReportError, ReportService};
