//! Support chatbot backed by the Gemini `generateContent` API.
//!
//! The client is immutable shared state. The knowledge document it answers
//! from is read once, on first use, through a `tokio::sync::OnceCell`;
//! whether a visitor has initialized the chat is tracked in their session.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::instrument;

use crate::config::ChatbotConfig;

/// Markers in a model answer meaning "the document doesn't cover this".
const NOT_FOUND_MARKERS: &[&str] = &["metinde bu yok", "bulamadım"];

/// Returned instead of an answer that hit a `NOT_FOUND_MARKERS` phrase.
pub const FALLBACK_ANSWER: &str = "Üzgünüm, bu konu hakkında spesifik bir bilgim yok. \
Ancak size aşağıdaki konularda yardımcı olabilirim:

• Cilt bakımı ve cilt sağlığı
• Cilt analizi ve sonuçları
• Cilt problemleri ve çözümleri
• Ürün önerileri ve kullanımı
• HocSkin hizmetleri

Bu konulardan biriyle ilgili soru sorabilirsiniz. Size nasıl yardımcı olabilirim?";

/// Errors that can occur when talking to the chatbot.
#[derive(Debug, Error)]
pub enum ChatbotError {
    #[error("chatbot is not configured")]
    NotConfigured,

    #[error("knowledge document not found: {0}")]
    DocumentMissing(PathBuf),

    #[error("failed to read knowledge document: {0}")]
    Io(#[from] std::io::Error),

    #[error("API key contains invalid header characters")]
    InvalidApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("API returned no answer")]
    EmptyResponse,
}

impl ChatbotError {
    /// Message shown in the chat widget.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConfigured | Self::DocumentMissing(_) => {
                "Bilgi belgesi bulunamadı. Lütfen sistem yöneticisiyle iletişime geçin.".to_string()
            }
            other => format!("Hata oluştu: {other}"),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chatbot API client.
#[derive(Clone)]
pub struct ChatbotClient {
    inner: Arc<ChatbotClientInner>,
}

struct ChatbotClientInner {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    document: PathBuf,
    knowledge: OnceCell<String>,
}

impl ChatbotClient {
    /// Create a new chatbot client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &ChatbotConfig) -> Result<Self, ChatbotError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| ChatbotError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.api_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            inner: Arc::new(ChatbotClientInner {
                client,
                endpoint,
                model: config.model.clone(),
                document: config.document.clone(),
                knowledge: OnceCell::new(),
            }),
        })
    }

    /// The knowledge document, read on first call.
    ///
    /// # Errors
    ///
    /// Returns `ChatbotError::DocumentMissing` if the file does not exist.
    pub async fn knowledge(&self) -> Result<&str, ChatbotError> {
        let text = self
            .inner
            .knowledge
            .get_or_try_init(|| async {
                let path = &self.inner.document;
                match tokio::fs::read_to_string(path).await {
                    Ok(text) => {
                        tracing::info!(path = %path.display(), bytes = text.len(), "Chatbot knowledge loaded");
                        Ok(text)
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(ChatbotError::DocumentMissing(path.clone()))
                    }
                    Err(e) => Err(ChatbotError::Io(e)),
                }
            })
            .await?;
        Ok(text.as_str())
    }

    /// Make sure the knowledge document is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub async fn initialize(&self) -> Result<(), ChatbotError> {
        self.knowledge().await.map(|_| ())
    }

    /// Answer a question from the knowledge document.
    ///
    /// Answers that say the document doesn't cover the topic are replaced
    /// by [`FALLBACK_ANSWER`].
    ///
    /// # Errors
    ///
    /// Returns an error if the document is missing or the API call fails.
    #[instrument(skip(self, question), fields(model = %self.inner.model))]
    pub async fn ask(&self, question: &str) -> Result<String, ChatbotError> {
        let prompt = build_prompt(self.knowledge().await?, question);
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: &prompt }],
            }],
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map_or(body, |e| e.error.message);
            tracing::error!(status = %status, message = %message, "Chatbot API error");
            return Err(ChatbotError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let answer: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .collect();
        if answer.trim().is_empty() {
            return Err(ChatbotError::EmptyResponse);
        }

        Ok(apply_fallback(answer))
    }
}

/// Prompt asking the model to answer strictly from `document`.
#[must_use]
pub fn build_prompt(document: &str, question: &str) -> String {
    format!(
        "Aşağıdaki metin HocSkin hakkında bilgiler içeriyor. Soruyu yalnızca bu metne \
         dayanarak Türkçe yanıtla. Metinde cevap yoksa \"metinde bu yok\" de.\n\n\
         Metin:\n{document}\n\nSoru: {question}\nCevap:"
    )
}

/// Replace "not in the document" answers with the fixed help message.
#[must_use]
pub fn apply_fallback(answer: String) -> String {
    let lower = answer.to_lowercase();
    if NOT_FOUND_MARKERS.iter().any(|m| lower.contains(m)) {
        FALLBACK_ANSWER.to_string()
    } else {
        answer
    }
}
