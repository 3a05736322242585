//! Skin analysis pipeline.
//!
//! Decode and bound the submitted image, run the detection models, draw
//! their boxes, store the annotated JPEG under `{static}/results/`, then
//! score skin age and pick recommendations. Logged-in users get the analysis
//! and its recommendations persisted in one transaction.

pub mod detection;
pub mod imaging;

use std::path::{Path, PathBuf};

use image::RgbImage;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use hocskin_core::catalog::{Catalog, RecommendationTemplate};
use hocskin_core::skin_age::{SkinAgeEstimate, estimate_skin_age};
use hocskin_core::{Category, ConditionCounts, HasConditionCounts};

use crate::db::{AnalysisRepository, RepositoryError};
use crate::models::{Analysis, NewAnalysis, ProductRecommendation, RecommendationInput, User};

pub use detection::{
    AGE_BRACKET_UNKNOWN, DetectionAggregator, DetectionError, DetectionReport, HttpSkinModel,
    ModelKind, SkinModel,
};
pub use imaging::ImageError;

/// Skin type recorded when the user has not set one.
pub const UNKNOWN_SKIN_TYPE: &str = "unknown";

/// Where the submitted image came from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Raw bytes of an uploaded file.
    Upload(Vec<u8>),
    /// A camera capture as a `data:` URL.
    Capture(String),
}

/// Errors from the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("camera capture could not be processed: {0}")]
    Capture(#[source] ImageError),

    #[error("uploaded image could not be processed: {0}")]
    Upload(#[source] ImageError),

    #[error("failed to encode result image: {0}")]
    Encode(#[source] ImageError),

    #[error("failed to store result image: {0}")]
    Io(#[from] std::io::Error),

    #[error("image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AnalysisError {
    /// Whether the client sent an unusable image.
    #[must_use]
    pub const fn is_bad_input(&self) -> bool {
        matches!(self, Self::Capture(_) | Self::Upload(_))
    }

    /// Text shown to the visitor for input errors.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Capture(e) => format!("Kamera görüntüsü işlenemedi: {e}"),
            Self::Upload(e) => format!("Görsel işlenemedi: {e}"),
            _ => "İşlem sırasında bir hata oluştu.".to_string(),
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub report: DetectionReport,
    /// Annotated image, relative to the static directory.
    pub image_path: String,
    pub counts: ConditionCounts,
    pub skin_type: String,
    pub estimate: SkinAgeEstimate,
    pub recommendations: Vec<RecommendationTemplate>,
}

impl HasConditionCounts for AnalysisRun {
    fn condition_counts(&self) -> ConditionCounts {
        self.counts
    }
}

impl AnalysisRun {
    /// The age-model label, if it found one.
    #[must_use]
    pub fn age_bracket(&self) -> Option<&str> {
        self.report
            .age_bracket
            .is_detected()
            .then_some(self.report.age_bracket.value.as_str())
    }

    fn new_analysis(&self, user: &User) -> NewAnalysis {
        NewAnalysis {
            user_id: user.id,
            image_path: self.image_path.clone(),
            counts: self.counts,
            skin_type: self.skin_type.clone(),
            age_bracket: self.age_bracket().map(ToOwned::to_owned),
            estimate: self.estimate,
        }
    }
}

/// Runs the analysis pipeline against shared application resources.
pub struct AnalysisService<'a> {
    aggregator: &'a DetectionAggregator,
    catalog: &'a Catalog,
    static_dir: &'a Path,
    max_image_dim: u32,
}

impl<'a> AnalysisService<'a> {
    #[must_use]
    pub const fn new(
        aggregator: &'a DetectionAggregator,
        catalog: &'a Catalog,
        static_dir: &'a Path,
        max_image_dim: u32,
    ) -> Self {
        Self {
            aggregator,
            catalog,
            static_dir,
            max_image_dim,
        }
    }

    /// Run the full pipeline for an optional logged-in user.
    ///
    /// The user's profile age and skin type feed the estimate; without a
    /// user the defaults apply and nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Capture`/`Upload` for unusable images, and
    /// other variants for storage failures. Model failures are not errors.
    #[instrument(skip(self, source, user), fields(user_id = user.map(|u| u.id.as_i64())))]
    pub async fn run(
        &self,
        source: ImageSource,
        user: Option<&User>,
    ) -> Result<AnalysisRun, AnalysisError> {
        let max_dim = self.max_image_dim;
        let (image, jpeg) = tokio::task::spawn_blocking(move || prepare(source, max_dim)).await??;

        let report = self.aggregator.run(&jpeg).await;

        let annotated = {
            let report = report.clone();
            tokio::task::spawn_blocking(move || annotate(image, &report)).await??
        };
        let image_path = self.store_result(&annotated).await?;

        let counts = report.counts();
        let estimate = estimate_skin_age(&counts, user.and_then(User::base_age));
        let recommendations = self.catalog.generate(&counts);
        let skin_type = user.map_or(UNKNOWN_SKIN_TYPE, User::analysis_skin_type).to_owned();

        tracing::info!(
            ?counts,
            skin_age = estimate.value,
            recommendations = recommendations.len(),
            "Analysis complete"
        );

        Ok(AnalysisRun {
            report,
            image_path,
            counts,
            skin_type,
            estimate,
            recommendations,
        })
    }

    /// Persist a run for `user` with its recommendations.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Repository` if the transaction fails.
    pub async fn save(
        pool: &SqlitePool,
        user: &User,
        run: &AnalysisRun,
    ) -> Result<(Analysis, Vec<ProductRecommendation>), AnalysisError> {
        let inputs: Vec<RecommendationInput> =
            run.recommendations.iter().map(RecommendationInput::from).collect();
        Ok(AnalysisRepository::new(pool)
            .create_with_recommendations(&run.new_analysis(user), &inputs)
            .await?)
    }

    async fn store_result(&self, jpeg: &[u8]) -> Result<String, AnalysisError> {
        let filename = format!("combined_{}.jpg", uuid::Uuid::new_v4().simple());
        let dir = self.static_dir.join("results");
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&filename), jpeg).await?;
        Ok(format!("results/{filename}"))
    }
}

/// Decode, bound, and re-encode the submitted image for the models.
fn prepare(source: ImageSource, max_dim: u32) -> Result<(RgbImage, Vec<u8>), AnalysisError> {
    let image = match source {
        ImageSource::Capture(data_url) => imaging::decode_data_url(&data_url)
            .and_then(|bytes| imaging::decode_image(&bytes))
            .map_err(AnalysisError::Capture)?,
        ImageSource::Upload(bytes) => {
            imaging::decode_image(&bytes).map_err(AnalysisError::Upload)?
        }
    };
    let image = imaging::bound_to(image, max_dim);
    let jpeg = imaging::encode_jpeg(&image, imaging::JPEG_QUALITY).map_err(AnalysisError::Encode)?;
    Ok((image, jpeg))
}

/// Draw every category's boxes and encode the result.
fn annotate(mut image: RgbImage, report: &DetectionReport) -> Result<Vec<u8>, AnalysisError> {
    for category in Category::ALL {
        if let Some(result) = report.category(category) {
            imaging::draw_detections(&mut image, category, &result.detections);
        }
    }
    imaging::encode_jpeg(&image, imaging::JPEG_QUALITY).map_err(AnalysisError::Encode)
}

/// Remove a stored result image. Failures are logged, never returned.
pub async fn remove_result_image(static_dir: &Path, image_path: &str) {
    let path: PathBuf = static_dir.join(image_path);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to delete result image");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use base64::Engine;
    use image::Rgb;

    use super::detection::Detection;
    use super::*;

    struct FixedModel(ModelKind, usize);

    #[async_trait]
    impl SkinModel for FixedModel {
        fn kind(&self) -> ModelKind {
            self.0
        }

        async fn detect(&self, jpeg: &[u8]) -> Result<Vec<Detection>, DetectionError> {
            assert!(imaging::decode_image(jpeg).is_ok());
            Ok((0..self.1)
                .map(|_| Detection {
                    x1: 2.0,
                    y1: 2.0,
                    x2: 10.0,
                    y2: 10.0,
                    confidence: 0.9,
                    label: Some("30-39".to_string()),
                })
                .collect())
        }
    }

    fn aggregator(acne: usize, wrinkle: usize) -> DetectionAggregator {
        DetectionAggregator::new(
            vec![
                Arc::new(FixedModel(ModelKind::Acne, acne)),
                Arc::new(FixedModel(ModelKind::Wrinkle, wrinkle)),
                Arc::new(FixedModel(ModelKind::Eyebag, 0)),
                Arc::new(FixedModel(ModelKind::Redness, 0)),
                Arc::new(FixedModel(ModelKind::AgeBracket, 1)),
            ],
            0.25,
        )
    }

    fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([200, 170, 150]));
        imaging::encode_jpeg(&image, 90).unwrap()
    }

    fn temp_static_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hocskin-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_run_anonymous_upload() {
        let dir = temp_static_dir();
        let aggregator = aggregator(1, 0);
        let catalog = Catalog::builtin().unwrap();
        let service = AnalysisService::new(&aggregator, &catalog, &dir, 400);

        let run = service
            .run(ImageSource::Upload(sample_jpeg(800, 600)), None)
            .await
            .unwrap();

        assert_eq!(run.counts, ConditionCounts::new(1, 0, 0, 0));
        assert_eq!(run.skin_type, UNKNOWN_SKIN_TYPE);
        assert_eq!(run.age_bracket(), Some("30-39"));
        assert_eq!(run.recommendations.len(), 7);
        // acne 1 => 0, no wrinkles/eyebags/redness; no acne-free bonus
        assert!((run.estimate.value - 30.0).abs() < f64::EPSILON);

        assert!(run.image_path.starts_with("results/combined_"));
        let stored = std::fs::read(dir.join(&run.image_path)).unwrap();
        let stored = imaging::decode_image(&stored).unwrap();
        assert_eq!(stored.dimensions(), (400, 300));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_run_capture_data_url() {
        let dir = temp_static_dir();
        let aggregator = aggregator(0, 12);
        let catalog = Catalog::builtin().unwrap();
        let service = AnalysisService::new(&aggregator, &catalog, &dir, 400);

        let data_url = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(sample_jpeg(64, 64))
        );
        let run = service.run(ImageSource::Capture(data_url), None).await.unwrap();

        assert_eq!(run.counts.wrinkle, 12);
        // no acne +1, wrinkles >10 +3
        assert!((run.estimate.value - 34.0).abs() < f64::EPSILON);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_bad_inputs_are_client_errors() {
        let dir = temp_static_dir();
        let aggregator = aggregator(0, 0);
        let catalog = Catalog::builtin().unwrap();
        let service = AnalysisService::new(&aggregator, &catalog, &dir, 400);

        let err = service
            .run(ImageSource::Capture("data:image/png;base64,@@@".to_string()), None)
            .await
            .unwrap_err();
        assert!(err.is_bad_input());
        assert!(err.user_message().starts_with("Kamera görüntüsü işlenemedi: "));

        let err = service
            .run(ImageSource::Upload(b"not an image".to_vec()), None)
            .await
            .unwrap_err();
        assert!(err.is_bad_input());
        assert!(err.user_message().starts_with("Görsel işlenemedi: "));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_remove_missing_image_is_not_fatal() {
        let dir = temp_static_dir();
        remove_result_image(&dir, "results/does-not-exist.jpg").await;
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
