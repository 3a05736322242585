//! Per-request page context shared by every rendered template.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::models::{CurrentUser, Flash};

use super::auth::OptionalAuth;
use super::flash::Flashes;

/// Navigation user and pending flash messages for the base layout.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
}

impl PageContext {
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let OptionalAuth(user) = OptionalAuth::from_request_parts(parts, state).await?;
        let Flashes(flashes) = Flashes::from_request_parts(parts, state).await?;
        Ok(Self { user, flashes })
    }
}
