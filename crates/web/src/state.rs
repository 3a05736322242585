//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use hocskin_core::catalog::{Catalog, CatalogError};

use crate::config::HocSkinConfig;
use crate::services::analysis::{AnalysisService, DetectionAggregator, DetectionError};
use crate::services::chatbot::{ChatbotClient, ChatbotError};
use crate::services::email::EmailService;
use crate::services::report::ReportService;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("detection model setup failed: {0}")]
    Detection(#[from] DetectionError),
    #[error("SMTP setup failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("chatbot setup failed: {0}")]
    Chatbot(#[from] ChatbotError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: HocSkinConfig,
    pool: SqlitePool,
    catalog: Catalog,
    detector: DetectionAggregator,
    email: Option<EmailService>,
    chatbot: Option<ChatbotClient>,
}

impl AppState {
    /// Create the application state from configuration.
    ///
    /// Loads the recommendation catalog (built-in unless a path is
    /// configured) and builds the model, SMTP, and chatbot clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is invalid or a client cannot be
    /// built.
    pub fn new(config: HocSkinConfig, pool: SqlitePool) -> Result<Self, StateError> {
        let catalog = match &config.catalog_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading recommendation catalog");
                Catalog::from_path(path)?
            }
            None => Catalog::builtin()?,
        };
        let detector = DetectionAggregator::from_config(&config.models)?;
        let email = config.smtp.as_ref().map(EmailService::new).transpose()?;
        let chatbot = config.chatbot.as_ref().map(ChatbotClient::new).transpose()?;

        if email.is_none() {
            tracing::warn!("SMTP not configured; contact form submissions will fail");
        }
        if chatbot.is_none() {
            tracing::warn!("CHATBOT_API_KEY not set; chatbot disabled");
        }

        Ok(Self::from_parts(config, pool, catalog, detector, email, chatbot))
    }

    /// Assemble state from prebuilt parts.
    #[must_use]
    pub fn from_parts(
        config: HocSkinConfig,
        pool: SqlitePool,
        catalog: Catalog,
        detector: DetectionAggregator,
        email: Option<EmailService>,
        chatbot: Option<ChatbotClient>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                detector,
                email,
                chatbot,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &HocSkinConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn detector(&self) -> &DetectionAggregator {
        &self.inner.detector
    }

    /// Contact form mailer, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Chatbot client, if an API key is configured.
    #[must_use]
    pub fn chatbot(&self) -> Option<&ChatbotClient> {
        self.inner.chatbot.as_ref()
    }

    /// Analysis pipeline bound to this state.
    #[must_use]
    pub fn analysis(&self) -> AnalysisService<'_> {
        let config = self.config();
        AnalysisService::new(
            self.detector(),
            self.catalog(),
            &config.static_dir,
            config.max_image_dim,
        )
    }

    /// Report generator bound to this state.
    #[must_use]
    pub fn reports(&self) -> ReportService<'_> {
        ReportService::new(&self.config().report, self.config().reports_dir())
    }
}
