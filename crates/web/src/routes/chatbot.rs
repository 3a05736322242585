//! Chatbot JSON endpoints.
//!
//! Every reply is `200 OK` with a `status` of `success` or `error`; the
//! widget shows `message` or `answer` as-is.

use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::models::{ChatbotSession, session_keys};
use crate::services::chatbot::ChatbotError;
use crate::state::AppState;

/// Body of `POST /ask`.
#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
}

/// Reply to both chatbot endpoints.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatReply {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },
    Error {
        message: String,
    },
}

impl ChatReply {
    fn initialized() -> Self {
        Self::Success {
            message: Some("Chatbot başarıyla başlatıldı!".to_string()),
            answer: None,
        }
    }

    const fn answer(answer: String) -> Self {
        Self::Success {
            message: None,
            answer: Some(answer),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Start a chat for this visitor.
#[instrument(skip_all)]
pub async fn initialize(State(state): State<AppState>, session: Session) -> Json<ChatReply> {
    let Some(chatbot) = state.chatbot() else {
        return Json(ChatReply::error(ChatbotError::NotConfigured.user_message()));
    };

    if let Err(e) = chatbot.initialize().await {
        tracing::error!(error = %e, "Chatbot initialization failed");
        return Json(ChatReply::error(e.user_message()));
    }

    let record = ChatbotSession {
        initialized_at: Utc::now(),
    };
    if let Err(e) = session.insert(session_keys::CHATBOT, record).await {
        tracing::error!(error = %e, "Failed to store chatbot session");
        return Json(ChatReply::error(format!("Hata oluştu: {e}")));
    }

    Json(ChatReply::initialized())
}

/// Answer a question from the knowledge document.
#[instrument(skip_all)]
pub async fn ask(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AskRequest>,
) -> Json<ChatReply> {
    let initialized = session
        .get::<ChatbotSession>(session_keys::CHATBOT)
        .await
        .ok()
        .flatten()
        .is_some();
    let chatbot = state.chatbot().filter(|_| initialized);
    let Some(chatbot) = chatbot else {
        return Json(ChatReply::error("Chatbot henüz başlatılmadı."));
    };

    let Some(question) = request
        .question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
    else {
        return Json(ChatReply::error("Lütfen bir soru girin."));
    };

    match chatbot.ask(question).await {
        Ok(answer) => Json(ChatReply::answer(answer)),
        Err(e) => {
            tracing::error!(error = %e, "Chatbot request failed");
            Json(ChatReply::error(e.user_message()))
        }
    }
}
