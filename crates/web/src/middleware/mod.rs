//! Middleware and request extractors.

pub mod auth;
pub mod flash;
pub mod page;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, set_current_user,
};
pub use flash::{Flashes, flash, push_flash, take_flashes};
pub use page::PageContext;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer, create_session_store};
