//! Contact form delivery over SMTP.
//!
//! Uses lettre with Askama text and HTML bodies.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Template)]
#[template(path = "email/contact.html")]
struct ContactEmailHtml<'a> {
    message: &'a ContactMessage,
}

#[derive(Template)]
#[template(path = "email/contact.txt")]
struct ContactEmailText<'a> {
    message: &'a ContactMessage,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP delivery is not configured.
    #[error("SMTP is not configured")]
    NotConfigured,

    /// A required form field was blank.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A submitted contact form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    /// Trim every field and reject blank ones.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::MissingField` naming the first blank field.
    pub fn new(name: &str, email: &str, subject: &str, message: &str) -> Result<Self, EmailError> {
        let field = |value: &str, name: &'static str| {
            let value = value.trim();
            if value.is_empty() {
                Err(EmailError::MissingField(name))
            } else {
                Ok(value.to_owned())
            }
        };

        Ok(Self {
            name: field(name, "name")?,
            email: field(email, "email")?,
            subject: field(subject, "subject")?,
            message: field(message, "message")?,
        })
    }

    /// Subject line of the delivered email.
    #[must_use]
    pub fn email_subject(&self) -> String {
        format!("İletişim Formu: {}", self.subject)
    }
}

/// Sends contact form messages to the configured recipient.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    contact_recipient: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            contact_recipient: config.contact_recipient.clone(),
        })
    }

    /// Deliver a contact form message. Replies go to the sender.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or delivered.
    pub async fn send_contact(&self, message: &ContactMessage) -> Result<(), EmailError> {
        let html = ContactEmailHtml { message }.render()?;
        let text = ContactEmailText { message }.render()?;
        let reply_to: Mailbox = message
            .email
            .parse()
            .map_err(|_| EmailError::InvalidAddress(message.email.clone()))?;

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .reply_to(reply_to)
            .to(self
                .contact_recipient
                .parse()
                .map_err(|_| EmailError::InvalidAddress(self.contact_recipient.clone()))?)
            .subject(message.email_subject())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(from = %message.email, subject = %message.subject, "Contact email sent");
        Ok(())
    }
}
