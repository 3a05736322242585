//! Domain types for the web application.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod analysis;
pub mod recommendation;
pub mod session;
pub mod user;

pub use analysis::{Analysis, AnalysisStats, AnalysisWithUser, NewAnalysis};
pub use recommendation::{ProductRecommendation, RecommendationInput};
pub use session::{ChatbotSession, CurrentUser, Flash, FlashLevel, keys as session_keys};
pub use user::{AccountUpdate, AdminUserUpdate, ProfileUpdate, User};
