//! Integration test harness for HocSkin.
//!
//! [`TestApp::spawn`] serves the real router on an ephemeral port against a
//! fresh in-memory database, with detection models replaced by
//! [`FixedModel`]s. Clients keep cookies, so sessions and flashes behave as
//! they do in a browser.
//!
//! ```bash
//! cargo test -p hocskin-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use sqlx::SqlitePool;

use hocskin_core::Email;
use hocskin_core::catalog::Catalog;
use hocskin_web::config::{HocSkinConfig, ModelServerConfig, ReportConfig};
use hocskin_web::db::{self, UserRepository};
use hocskin_web::middleware::{create_session_layer, create_session_store};
use hocskin_web::models::User;
use hocskin_web::services::analysis::detection::Detection;
use hocskin_web::services::analysis::{
    DetectionAggregator, DetectionError, ModelKind, SkinModel, imaging,
};
use hocskin_web::services::auth::hash_password;
use hocskin_web::state::AppState;

/// Password given to every user created through the harness.
pub const TEST_PASSWORD: &str = "sifre123";

/// A model that always returns `count` boxes (and `label`, if any).
pub struct FixedModel {
    kind: ModelKind,
    count: usize,
    label: Option<String>,
}

impl FixedModel {
    #[must_use]
    pub const fn new(kind: ModelKind, count: usize) -> Self {
        Self {
            kind,
            count,
            label: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

#[async_trait]
impl SkinModel for FixedModel {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    async fn detect(&self, _jpeg: &[u8]) -> Result<Vec<Detection>, DetectionError> {
        Ok((0..self.count)
            .map(|i| {
                let offset = f32::from(u8::try_from(i % 20).unwrap()) * 5.0;
                Detection {
                    x1: offset,
                    y1: offset,
                    x2: offset + 10.0,
                    y2: offset + 10.0,
                    confidence: 0.9,
                    label: self.label.clone(),
                }
            })
            .collect())
    }
}

/// Detection counts used by [`TestApp::spawn`]: one acne spot, two wrinkles.
#[must_use]
pub fn default_models() -> Vec<Arc<dyn SkinModel>> {
    vec![
        Arc::new(FixedModel::new(ModelKind::Acne, 1)),
        Arc::new(FixedModel::new(ModelKind::Wrinkle, 2)),
        Arc::new(FixedModel::new(ModelKind::Eyebag, 0)),
        Arc::new(FixedModel::new(ModelKind::Redness, 0)),
        Arc::new(FixedModel::new(ModelKind::AgeBracket, 1).with_label("25-34")),
    ]
}

/// A scratch directory removed on drop.
pub struct TempDir(PathBuf);

impl TempDir {
    #[must_use]
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("hocskin-it-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Default for TempDir {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Fresh in-memory database with the schema applied.
pub async fn test_pool() -> SqlitePool {
    let pool = db::create_memory_pool().await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// Insert a user directly, bypassing the registration form.
pub async fn create_user(pool: &SqlitePool, username: &str, email: &str) -> User {
    let hash = hash_password(TEST_PASSWORD).unwrap();
    UserRepository::new(pool)
        .create(username, &Email::parse(email).unwrap(), &hash)
        .await
        .unwrap()
}

/// The DejaVu Sans family checked in for report rendering.
#[must_use]
pub fn fixture_fonts() -> ReportConfig {
    ReportConfig {
        font_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("../web/tests/fixtures/fonts"),
        font_family: "DejaVuSans".to_string(),
    }
}

/// Configuration pointing every directory into `static_dir`.
#[must_use]
pub fn test_config(static_dir: PathBuf) -> HocSkinConfig {
    HocSkinConfig {
        database_url: SecretString::from("sqlite::memory:"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost".to_string(),
        static_dir: static_dir.clone(),
        catalog_path: None,
        max_image_dim: 400,
        models: ModelServerConfig {
            url: None,
            confidence: 0.25,
        },
        report: fixture_fonts(),
        smtp: None,
        chatbot: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The application served on an ephemeral port.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
    static_dir: TempDir,
    server: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Serve with [`default_models`].
    pub async fn spawn() -> Self {
        Self::spawn_with_models(default_models()).await
    }

    pub async fn spawn_with_models(models: Vec<Arc<dyn SkinModel>>) -> Self {
        Self::build(models, |_| {}).await
    }

    /// Serve with [`default_models`] and a tweaked [`test_config`].
    pub async fn spawn_with_config(configure: impl FnOnce(&mut HocSkinConfig)) -> Self {
        Self::build(default_models(), configure).await
    }

    async fn build(
        models: Vec<Arc<dyn SkinModel>>,
        configure: impl FnOnce(&mut HocSkinConfig),
    ) -> Self {
        let pool = test_pool().await;
        let static_dir = TempDir::new();
        let mut config = test_config(static_dir.path().to_path_buf());
        configure(&mut config);

        let store = create_session_store(&pool).await.unwrap();
        let session_layer = create_session_layer(store, &config);
        let state = AppState::from_parts(
            config,
            pool.clone(),
            Catalog::builtin().unwrap(),
            DetectionAggregator::new(models, 0.25),
            None,
            None,
        );
        let app = hocskin_web::app(state, session_layer);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            pool,
            client: Self::new_client(),
            static_dir,
            server,
        }
    }

    /// A separate browser: its own cookie jar, no redirects followed.
    #[must_use]
    pub fn new_client() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    #[must_use]
    pub fn static_dir(&self) -> &Path {
        self.static_dir.path()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client.post(self.url(path)).form(form).send().await.unwrap()
    }

    /// Follow one redirect and return the page body.
    pub async fn follow(&self, response: reqwest::Response) -> String {
        let location = location(&response);
        self.get(&location).await.text().await.unwrap()
    }

    /// Register through the form and log in; returns the stored user.
    pub async fn register_and_login(&self, username: &str, email: &str) -> User {
        let response = self
            .post_form(
                "/register",
                &[
                    ("username", username),
                    ("email", email),
                    ("password", TEST_PASSWORD),
                    ("confirm_password", TEST_PASSWORD),
                ],
            )
            .await;
        assert_eq!(location(&response), "/login");
        self.login(email).await;

        UserRepository::new(&self.pool)
            .get_by_email(&Email::parse(email).unwrap())
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn login(&self, email: &str) {
        let response = self
            .post_form("/login", &[("email", email), ("password", TEST_PASSWORD)])
            .await;
        assert_eq!(location(&response), "/");
    }

    /// Post a JPEG to `/analyze` as a file upload.
    pub async fn analyze_upload(&self) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(test_jpeg())
            .file_name("face.jpg")
            .mime_str("image/jpeg")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("image", part);
        self.client
            .post(self.url("/analyze"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    assert!(
        response.status().is_redirection(),
        "expected redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string()
}

/// A small gradient JPEG.
#[must_use]
pub fn test_jpeg() -> Vec<u8> {
    let image = image::RgbImage::from_fn(120, 90, |x, y| {
        image::Rgb([
            u8::try_from(x * 2).unwrap_or(255),
            u8::try_from(y * 2).unwrap_or(255),
            128,
        ])
    });
    imaging::encode_jpeg(&image, imaging::JPEG_QUALITY).unwrap()
}
