//! Outbound mail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::path::Path;
use thiserror::Error;

use crate::config::{MailConfig, MailTransport};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport setup failed: {0}")]
    Setup(String),

    #[error("Invalid mail address: {0}")]
    Address(String),

    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Content of the welcome mail. Carries the activation token plaintext, so it
/// is never logged.
#[derive(Clone)]
pub struct WelcomeMail {
    pub to_name: String,
    pub to_email: String,
    pub activation_token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: i32,
}

impl std::fmt::Debug for WelcomeMail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WelcomeMail")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, mail: WelcomeMail) -> Result<(), MailError>;
}

enum Transport {
    Disabled,
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

pub struct LettreMailer {
    transport: Transport,
    from: String,
}

impl LettreMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let transport = match &config.transport {
            MailTransport::Disabled => Transport::Disabled,
            MailTransport::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                        .map_err(|e| MailError::Setup(e.to_string()))?
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                };

                Transport::Smtp(
                    builder
                        .port(*port)
                        .credentials(Credentials::new(username.clone(), password.clone()))
                        .build(),
                )
            }
            MailTransport::File { path } => {
                let dir = Path::new(path);
                std::fs::create_dir_all(dir).map_err(|e| MailError::Setup(e.to_string()))?;
                Transport::File(AsyncFileTransport::<Tokio1Executor>::new(dir))
            }
        };

        Ok(Self {
            transport,
            from: format!("{} <{}>", config.from_name, config.from_email),
        })
    }

    fn welcome_body(mail: &WelcomeMail) -> String {
        format!(
            "Hi {name},\n\n\
             Thanks for signing up for a Marquee account. Your user ID is {id}.\n\n\
             To activate your account, send a PUT or POST request to /v1/users/activate with:\n\n\
             {{\"token\": \"{token}\"}}\n\n\
             This token expires at {expiry} and can only be used once.\n\n\
             Thanks,\nThe Marquee Team\n",
            name = mail.to_name,
            id = mail.user_id,
            token = mail.activation_token,
            expiry = mail.expires_at.format("%Y-%m-%d %H:%M UTC"),
        )
    }
}

#[async_trait]
impl Mailer for LettreMailer {
    async fn send_welcome(&self, mail: WelcomeMail) -> Result<(), MailError> {
        if matches!(self.transport, Transport::Disabled) {
            tracing::debug!(user_id = mail.user_id, "Mail disabled, skipping welcome mail");
            return Ok(());
        }

        let from = self
            .from
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(e.to_string()))?;
        let to = format!("{} <{}>", mail.to_name, mail.to_email)
            .parse::<Mailbox>()
            .or_else(|_| mail.to_email.parse::<Mailbox>())
            .map_err(|e| MailError::Address(e.to_string()))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject("Welcome to Marquee!")
            .header(ContentType::TEXT_PLAIN)
            .body(Self::welcome_body(&mail))
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        match &self.transport {
            Transport::Disabled => {}
            Transport::Smtp(smtp) => {
                smtp.send(message)
                    .await
                    .map_err(|e| MailError::Delivery(e.to_string()))?;
            }
            Transport::File(file) => {
                file.send(message)
                    .await
                    .map_err(|e| MailError::Delivery(e.to_string()))?;
            }
        }

        tracing::info!(user_id = mail.user_id, "Welcome mail sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> WelcomeMail {
        WelcomeMail {
            to_name: "Alice".to_string(),
            to_email: "alice@example.com".to_string(),
            activation_token: "AAAAAAAAAAAAAAAAAAAAAA".to_string(),
            expires_at: DateTime::parse_from_rfc3339("2026-01-04T09:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            user_id: 1,
        }
    }

    #[test]
    fn test_debug_hides_token() {
        assert!(!format!("{:?}", mail()).contains("AAAAAAAA"));
    }

    #[test]
    fn test_body_mentions_token() {
        let body = LettreMailer::welcome_body(&mail());
        assert!(body.contains("AAAAAAAAAAAAAAAAAAAAAA"));
        assert!(body.contains("Hi Alice"));
        assert!(body.contains("expires at 2026-01-04 09:30 UTC"));
        assert!(!body.contains("3 days"));
    }

    #[tokio::test]
    async fn test_disabled_transport_is_a_no_op() {
        let mailer = LettreMailer::new(&MailConfig::default()).unwrap();
        assert!(mailer.send_welcome(mail()).await.is_ok());
    }

    #[tokio::test]
    async fn test_file_transport_writes_message() {
        let dir = std::env::temp_dir().join(format!("marquee-mail-{}", uuid::Uuid::new_v4()));
        let config = MailConfig {
            transport: MailTransport::File {
                path: dir.to_string_lossy().into_owned(),
            },
            ..MailConfig::default()
        };

        let mailer = LettreMailer::new(&config).unwrap();
        mailer.send_welcome(mail()).await.unwrap();

        let written = std::fs::read_dir(&dir).unwrap().count();
        assert_eq!(written, 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
