//! Detection models and the aggregator that runs them.
//!
//! Each `SkinModel` scores one JPEG for one `ModelKind`. The
//! `DetectionAggregator` runs all five in sequence and folds their output
//! into a `DetectionReport`. A failing model never fails the request: its
//! count drops to zero and the error text is carried along.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use hocskin_core::{Category, ConditionCounts};

use crate::config::ModelServerConfig;

/// Shown when the age model finds nothing (or fails).
pub const AGE_BRACKET_UNKNOWN: &str = "Tespit edilemedi";

/// Which detection model a `SkinModel` implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKind {
    Acne,
    Wrinkle,
    Eyebag,
    Redness,
    AgeBracket,
}

impl ModelKind {
    /// Every model, in the order the aggregator runs them.
    pub const ALL: [Self; 5] = [
        Self::Acne,
        Self::Wrinkle,
        Self::Eyebag,
        Self::Redness,
        Self::AgeBracket,
    ];

    /// Path segment used by the model server.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Acne => "acne",
            Self::Wrinkle => "wrinkle",
            Self::Eyebag => "eyebag",
            Self::Redness => "redness",
            Self::AgeBracket => "age",
        }
    }

    /// The condition category this model counts, if any.
    #[must_use]
    pub const fn category(self) -> Option<Category> {
        match self {
            Self::Acne => Some(Category::Acne),
            Self::Wrinkle => Some(Category::Wrinkle),
            Self::Eyebag => Some(Category::Eyebag),
            Self::Redness => Some(Category::Redness),
            Self::AgeBracket => None,
        }
    }
}

impl From<Category> for ModelKind {
    fn from(category: Category) -> Self {
        match category {
            Category::Acne => Self::Acne,
            Category::Wrinkle => Self::Wrinkle,
            Category::Eyebag => Self::Eyebag,
            Category::Redness => Self::Redness,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One bounding box returned by a model, in image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    /// Class label (the age bracket for the age model).
    #[serde(default)]
    pub label: Option<String>,
}

/// Errors from a single model invocation.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("model server is not configured for {0}")]
    NotConfigured(ModelKind),

    #[error("invalid model server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model server returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// An object-detection model for one `ModelKind`.
#[async_trait]
pub trait SkinModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Run the model on a JPEG-encoded image.
    async fn detect(&self, jpeg: &[u8]) -> Result<Vec<Detection>, DetectionError>;
}

#[derive(Deserialize)]
struct DetectResponse {
    detections: Vec<Detection>,
}

/// A model served over HTTP.
///
/// Posts the JPEG to `{base}/models/{name}/detect?conf={threshold}` and
/// expects `{"detections": [...]}` back.
#[derive(Clone)]
pub struct HttpSkinModel {
    client: reqwest::Client,
    endpoint: Url,
    kind: ModelKind,
}

impl HttpSkinModel {
    /// Build a model client against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `DetectionError::InvalidUrl` if `base_url` cannot be parsed.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        kind: ModelKind,
        confidence: f32,
    ) -> Result<Self, DetectionError> {
        let base = base_url.trim_end_matches('/');
        let mut endpoint = Url::parse(&format!("{base}/models/{}/detect", kind.name()))?;
        endpoint
            .query_pairs_mut()
            .append_pair("conf", &confidence.to_string());
        Ok(Self {
            client,
            endpoint,
            kind,
        })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SkinModel for HttpSkinModel {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    #[instrument(skip(self, jpeg), fields(model = %self.kind, bytes = jpeg.len()))]
    async fn detect(&self, jpeg: &[u8]) -> Result<Vec<Detection>, DetectionError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "image/jpeg")
            .body(jpeg.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: DetectResponse = response.json().await?;
        Ok(parsed.detections)
    }
}

/// Stand-in used when no model server is configured.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableModel(pub ModelKind);

#[async_trait]
impl SkinModel for UnavailableModel {
    fn kind(&self) -> ModelKind {
        self.0
    }

    async fn detect(&self, _jpeg: &[u8]) -> Result<Vec<Detection>, DetectionError> {
        Err(DetectionError::NotConfigured(self.0))
    }
}

/// Result for one condition category.
#[derive(Debug, Clone, Default)]
pub struct CategoryResult {
    pub count: u32,
    /// Detections kept after thresholding (drawn on the result image).
    pub detections: Vec<Detection>,
    pub error: Option<String>,
}

/// Result of the age-bracket model.
#[derive(Debug, Clone)]
pub struct AgeBracketResult {
    pub count: u32,
    /// Label of the first detection, or `AGE_BRACKET_UNKNOWN`.
    pub value: String,
    pub error: Option<String>,
}

impl AgeBracketResult {
    /// Whether the model produced a usable label.
    #[must_use]
    pub fn is_detected(&self) -> bool {
        self.value != AGE_BRACKET_UNKNOWN
    }
}

impl Default for AgeBracketResult {
    fn default() -> Self {
        Self {
            count: 0,
            value: AGE_BRACKET_UNKNOWN.to_string(),
            error: None,
        }
    }
}

/// Everything the models said about one image.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    pub categories: BTreeMap<Category, CategoryResult>,
    pub age_bracket: AgeBracketResult,
}

impl DetectionReport {
    /// Per-category counts; missing categories count as zero.
    #[must_use]
    pub fn counts(&self) -> ConditionCounts {
        let mut counts = ConditionCounts::default();
        for (category, result) in &self.categories {
            counts.set(*category, result.count);
        }
        counts
    }

    #[must_use]
    pub fn category(&self, category: Category) -> Option<&CategoryResult> {
        self.categories.get(&category)
    }

    /// Errors reported by individual models, as `(model, message)`.
    #[must_use]
    pub fn errors(&self) -> Vec<(ModelKind, &str)> {
        let mut errors: Vec<(ModelKind, &str)> = self
            .categories
            .iter()
            .filter_map(|(category, result)| {
                result
                    .error
                    .as_deref()
                    .map(|e| (ModelKind::from(*category), e))
            })
            .collect();
        if let Some(error) = self.age_bracket.error.as_deref() {
            errors.push((ModelKind::AgeBracket, error));
        }
        errors
    }
}

/// Runs one model per `ModelKind` and folds the results.
#[derive(Clone)]
pub struct DetectionAggregator {
    models: BTreeMap<ModelKind, Arc<dyn SkinModel>>,
    confidence: f32,
}

impl fmt::Debug for DetectionAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionAggregator")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("confidence", &self.confidence)
            .finish()
    }
}

impl DetectionAggregator {
    /// Build from explicit models. A later model of the same kind replaces
    /// an earlier one.
    #[must_use]
    pub fn new(models: Vec<Arc<dyn SkinModel>>, confidence: f32) -> Self {
        let models = models.into_iter().map(|m| (m.kind(), m)).collect();
        Self { models, confidence }
    }

    /// Build HTTP models for every kind, or unavailable stand-ins when no
    /// model server URL is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the URL is
    /// invalid.
    pub fn from_config(config: &ModelServerConfig) -> Result<Self, DetectionError> {
        let models: Vec<Arc<dyn SkinModel>> = match &config.url {
            Some(url) => {
                let client = reqwest::Client::builder().build()?;
                ModelKind::ALL
                    .iter()
                    .map(|kind| {
                        HttpSkinModel::new(client.clone(), url, *kind, config.confidence)
                            .map(|m| Arc::new(m) as Arc<dyn SkinModel>)
                    })
                    .collect::<Result<_, _>>()?
            }
            None => {
                tracing::warn!("MODEL_SERVER_URL not set; analyses will report zero detections");
                ModelKind::ALL
                    .iter()
                    .map(|kind| Arc::new(UnavailableModel(*kind)) as Arc<dyn SkinModel>)
                    .collect()
            }
        };
        Ok(Self::new(models, config.confidence))
    }

    #[must_use]
    pub const fn confidence(&self) -> f32 {
        self.confidence
    }

    async fn run_model(&self, kind: ModelKind, jpeg: &[u8]) -> Result<Vec<Detection>, String> {
        let Some(model) = self.models.get(&kind) else {
            return Err(DetectionError::NotConfigured(kind).to_string());
        };
        match model.detect(jpeg).await {
            Ok(detections) => Ok(detections
                .into_iter()
                .filter(|d| d.confidence >= self.confidence)
                .collect()),
            Err(e) => {
                tracing::warn!(model = %kind, error = %e, "Detection model failed");
                Err(e.to_string())
            }
        }
    }

    /// Run every model on `jpeg`, in `ModelKind::ALL` order.
    #[instrument(skip(self, jpeg), fields(bytes = jpeg.len()))]
    pub async fn run(&self, jpeg: &[u8]) -> DetectionReport {
        let mut report = DetectionReport::default();

        for category in Category::ALL {
            let result = match self.run_model(category.into(), jpeg).await {
                Ok(detections) => CategoryResult {
                    count: u32::try_from(detections.len()).unwrap_or(u32::MAX),
                    detections,
                    error: None,
                },
                Err(error) => CategoryResult {
                    error: Some(error),
                    ..CategoryResult::default()
                },
            };
            report.categories.insert(category, result);
        }

        report.age_bracket = match self.run_model(ModelKind::AgeBracket, jpeg).await {
            Ok(detections) => AgeBracketResult {
                count: u32::try_from(detections.len()).unwrap_or(u32::MAX),
                value: detections
                    .first()
                    .and_then(|d| d.label.clone())
                    .unwrap_or_else(|| AGE_BRACKET_UNKNOWN.to_string()),
                error: None,
            },
            Err(error) => AgeBracketResult {
                error: Some(error),
                ..AgeBracketResult::default()
            },
        };

        tracing::debug!(counts = ?report.counts(), age = %report.age_bracket.value, "Detection complete");
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    /// Returns a fixed set of detections, or an error.
    pub struct FakeModel {
        pub kind: ModelKind,
        pub result: Result<Vec<Detection>, u16>,
    }

    #[async_trait]
    impl SkinModel for FakeModel {
        fn kind(&self) -> ModelKind {
            self.kind
        }

        async fn detect(&self, _jpeg: &[u8]) -> Result<Vec<Detection>, DetectionError> {
            self.result.clone().map_err(|status| DetectionError::Status {
                status,
                body: "boom".to_string(),
            })
        }
    }

    pub fn boxes(n: usize, confidence: f32) -> Vec<Detection> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let offset = i as f32 * 5.0;
                Detection {
                    x1: offset,
                    y1: offset,
                    x2: offset + 4.0,
                    y2: offset + 4.0,
                    confidence,
                    label: None,
                }
            })
            .collect()
    }

    fn fake(kind: ModelKind, result: Result<Vec<Detection>, u16>) -> Arc<dyn SkinModel> {
        Arc::new(FakeModel { kind, result })
    }

    #[tokio::test]
    async fn test_counts_detections_per_category() {
        let aggregator = DetectionAggregator::new(
            vec![
                fake(ModelKind::Acne, Ok(boxes(3, 0.9))),
                fake(ModelKind::Wrinkle, Ok(boxes(12, 0.5))),
                fake(ModelKind::Eyebag, Ok(vec![])),
                fake(ModelKind::Redness, Ok(boxes(1, 0.3))),
                fake(ModelKind::AgeBracket, Ok(vec![])),
            ],
            0.25,
        );

        let report = aggregator.run(b"jpeg").await;
        assert_eq!(report.counts(), ConditionCounts::new(3, 12, 0, 1));
        assert!(report.errors().is_empty());
        assert_eq!(report.age_bracket.value, AGE_BRACKET_UNKNOWN);
        assert!(!report.age_bracket.is_detected());
    }

    #[tokio::test]
    async fn test_threshold_filters_low_confidence() {
        let mut detections = boxes(2, 0.9);
        detections.extend(boxes(3, 0.1));
        detections.push(Detection {
            confidence: 0.25,
            ..boxes(1, 0.0).remove(0)
        });
        let aggregator =
            DetectionAggregator::new(vec![fake(ModelKind::Acne, Ok(detections))], 0.25);

        let report = aggregator.run(b"jpeg").await;
        let acne = report.category(Category::Acne).unwrap();
        assert_eq!(acne.count, 3);
        assert_eq!(acne.detections.len(), 3);
    }

    #[tokio::test]
    async fn test_failing_model_degrades_to_zero() {
        let aggregator = DetectionAggregator::new(
            vec![
                fake(ModelKind::Acne, Err(500)),
                fake(ModelKind::Wrinkle, Ok(boxes(2, 0.8))),
            ],
            0.25,
        );

        let report = aggregator.run(b"jpeg").await;
        let acne = report.category(Category::Acne).unwrap();
        assert_eq!(acne.count, 0);
        assert!(acne.error.as_deref().unwrap().contains("500"));
        assert_eq!(report.counts().get(Category::Wrinkle), 2);

        // Unregistered models report "not configured" rather than failing.
        let kinds: Vec<ModelKind> = report.errors().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                ModelKind::Acne,
                ModelKind::Eyebag,
                ModelKind::Redness,
                ModelKind::AgeBracket
            ]
        );
    }

    #[tokio::test]
    async fn test_age_bracket_uses_first_label() {
        let mut detections = boxes(2, 0.7);
        detections[0].label = Some("25-34".to_string());
        detections[1].label = Some("35-44".to_string());
        let aggregator =
            DetectionAggregator::new(vec![fake(ModelKind::AgeBracket, Ok(detections))], 0.25);

        let report = aggregator.run(b"jpeg").await;
        assert_eq!(report.age_bracket.value, "25-34");
        assert_eq!(report.age_bracket.count, 2);
        assert!(report.age_bracket.is_detected());
    }

    #[tokio::test]
    async fn test_unconfigured_server_reports_every_model() {
        let aggregator = DetectionAggregator::from_config(&ModelServerConfig::default()).unwrap();
        let report = aggregator.run(b"jpeg").await;
        assert_eq!(report.counts(), ConditionCounts::default());
        assert_eq!(report.errors().len(), 5);
    }

    #[test]
    fn test_http_model_endpoint() {
        let model = HttpSkinModel::new(
            reqwest::Client::new(),
            "http://models.local:8500/",
            ModelKind::Eyebag,
            0.25,
        )
        .unwrap();
        assert_eq!(
            model.endpoint().as_str(),
            "http://models.local:8500/models/eyebag/detect?conf=0.25"
        );
    }

    #[test]
    fn test_http_model_rejects_bad_url() {
        let result = HttpSkinModel::new(reqwest::Client::new(), "not a url", ModelKind::Acne, 0.25);
        assert!(matches!(result, Err(DetectionError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_http_model_round_trip() {
        use axum::{Json, Router, routing::post};

        let app = Router::new().route(
            "/models/acne/detect",
            post(|body: axum::body::Bytes| async move {
                assert_eq!(&body[..], b"jpeg-bytes");
                Json(serde_json::json!({
                    "detections": [
                        {"x1": 1.0, "y1": 2.0, "x2": 3.0, "y2": 4.0, "confidence": 0.8, "label": "acne"}
                    ]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let model = HttpSkinModel::new(
            reqwest::Client::new(),
            &format!("http://{addr}"),
            ModelKind::Acne,
            0.25,
        )
        .unwrap();
        let detections = model.detect(b"jpeg-bytes").await.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label.as_deref(), Some("acne"));

        let missing = HttpSkinModel::new(
            reqwest::Client::new(),
            &format!("http://{addr}"),
            ModelKind::Wrinkle,
            0.25,
        )
        .unwrap();
        assert!(matches!(
            missing.detect(b"jpeg-bytes").await,
            Err(DetectionError::Status { status: 404, .. })
        ));
    }
}
