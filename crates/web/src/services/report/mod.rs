//! PDF analysis reports.
//!
//! A report is laid out as plain data first ([`layout::ReportLayout`]) and
//! then rendered with `genpdf` on a blocking thread. Each render gets its
//! own file, `{static}/reports/hocskin_rapor_{YYYYmmdd_HHMMSS}_{uuid}.pdf`;
//! the download keeps the name without the uuid.

pub mod layout;
pub mod render;

use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use hocskin_core::catalog::RecommendationTemplate;

use crate::config::ReportConfig;
use crate::models::{Analysis, ProductRecommendation, User};

pub use layout::{ReportData, ReportLayout, ReportUser, Section};

/// Errors that can occur while producing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to load report fonts: {0}")]
    Font(String),

    #[error("failed to render report: {0}")]
    Render(String),

    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A rendered report on disk.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    /// Name offered to the browser.
    pub file_name: String,
    /// Unique path of this render.
    pub path: PathBuf,
}

fn storage_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".pdf").unwrap_or(file_name);
    format!("{stem}_{}.pdf", Uuid::new_v4().simple())
}

impl ReportData {
    /// Report data for a stored analysis.
    #[must_use]
    pub fn from_analysis(
        analysis: &Analysis,
        recommendations: &[ProductRecommendation],
        user: Option<&User>,
        static_dir: &Path,
    ) -> Self {
        Self {
            skin_type: analysis.skin_type.clone(),
            base_age: analysis.base_age,
            skin_age: analysis.skin_age,
            assessment: analysis.skin_age_assessment.clone(),
            counts: analysis.counts,
            recommendations: recommendations
                .iter()
                .map(RecommendationTemplate::from)
                .collect(),
            image: static_dir.join(&analysis.image_path),
            user: user.map(|u| ReportUser {
                username: u.username.clone(),
                email: u.email.to_string(),
            }),
            analyzed_at: analysis.created_at,
        }
    }
}

/// Builds and renders reports.
pub struct ReportService<'a> {
    config: &'a ReportConfig,
    reports_dir: PathBuf,
}

impl<'a> ReportService<'a> {
    #[must_use]
    pub const fn new(config: &'a ReportConfig, reports_dir: PathBuf) -> Self {
        Self {
            config,
            reports_dir,
        }
    }

    /// Lay out and render a report for `data`.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if the reports directory cannot be created or
    /// rendering fails. A missing image is not an error.
    #[instrument(skip_all, fields(user = data.user.as_ref().map(|u| u.username.as_str())))]
    pub async fn generate(&self, data: ReportData) -> Result<GeneratedReport, ReportError> {
        tokio::fs::create_dir_all(&self.reports_dir).await?;

        let now = Local::now();
        let file_name = ReportLayout::file_name(now);
        let path = self.reports_dir.join(storage_name(&file_name));
        let font_dir = self.config.font_dir.clone();
        let font_family = self.config.font_family.clone();

        let output = path.clone();
        tokio::task::spawn_blocking(move || {
            let image_available = data.image.is_file();
            let layout = ReportLayout::build(&data, image_available, now);
            render::render_pdf(&layout, &font_dir, &font_family, &output)
        })
        .await??;

        tracing::info!(path = %path.display(), "Report generated");
        Ok(GeneratedReport { file_name, path })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use hocskin_core::ConditionCounts;

    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("hocskin-report-{}", Uuid::new_v4()))
    }

    fn fixture_fonts() -> ReportConfig {
        ReportConfig {
            font_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fonts"),
            font_family: "DejaVuSans".to_string(),
        }
    }

    fn data(username: &str, image: PathBuf) -> ReportData {
        ReportData {
            skin_type: "karma".to_string(),
            base_age: 30.0,
            skin_age: 31.0,
            assessment: "Cildiniz yaşınıza uygun görünüyor.".to_string(),
            counts: ConditionCounts::new(2, 1, 0, 3),
            recommendations: vec![],
            image,
            user: Some(ReportUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
            }),
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn test_storage_name_is_unique() {
        let a = storage_name("hocskin_rapor_20260101_120000.pdf");
        let b = storage_name("hocskin_rapor_20260101_120000.pdf");
        assert_ne!(a, b);
        assert!(a.starts_with("hocskin_rapor_20260101_120000_"));
        assert!(a.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_concurrent_reports_get_separate_files() {
        let dir = scratch_dir();
        let config = fixture_fonts();
        let service = ReportService::new(&config, dir.join("reports"));

        let (alice, bob) = tokio::join!(
            service.generate(data("alice", dir.join("alice.jpg"))),
            service.generate(data("bob", dir.join("bob.jpg")))
        );
        let (alice, bob) = (alice.unwrap(), bob.unwrap());

        assert_ne!(alice.path, bob.path);
        assert!(alice.file_name.starts_with("hocskin_rapor_"));
        for report in [&alice, &bob] {
            let bytes = std::fs::read(&report.path).unwrap();
            assert!(bytes.starts_with(b"%PDF"));
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_fonts_is_font_error() {
        let dir = scratch_dir();
        let config = ReportConfig {
            font_dir: dir.join("no-fonts-here"),
            font_family: "Nope".to_string(),
        };
        let service = ReportService::new(&config, dir.join("reports"));

        let err = service
            .generate(data("ayse", dir.join("missing.jpg")))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Font(_)));
        assert!(dir.join("reports").is_dir());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
