#![allow(async_fn_in_trait)]

pub mod log_mailer;
pub mod smtp;
pub mod templates;

use std::time::Duration;

use common::env_config::SmtpConfig;
use thiserror::Error;

pub use log_mailer::LogMailer;
pub use smtp::SmtpMailer;

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MailError {
    #[error("mail server unreachable: {0}")]
    Unreachable(String),

    #[error("mail rejected by server: {0}")]
    Rejected(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("mail send timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not build message: {0}")]
    Build(String),
}

/// Outbound email transport.
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Sends `email`, giving up after `limit`.
pub async fn send_within<M: Mailer>(
    mailer: &M,
    email: &Email,
    limit: Duration,
) -> Result<(), MailError> {
    match tokio::time::timeout(limit, mailer.send(email)).await {
        Ok(result) => result,
        Err(_) => Err(MailError::Timeout(limit)),
    }
}

/// Mailer selected at startup: SMTP when configured, log-only otherwise.
#[derive(Clone)]
pub enum AppMailer {
    Smtp(SmtpMailer),
    Log(LogMailer),
}

impl AppMailer {
    pub fn from_config(smtp: Option<&SmtpConfig>) -> Result<Self, MailError> {
        match smtp {
            Some(config) => Ok(AppMailer::Smtp(SmtpMailer::new(config)?)),
            None => {
                log::warn!("SMTP_HOST is not set, outbound email will only be logged");
                Ok(AppMailer::Log(LogMailer))
            }
        }
    }
}

impl Mailer for AppMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        match self {
            AppMailer::Smtp(mailer) => mailer.send(email).await,
            AppMailer::Log(mailer) => mailer.send(email).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowMailer;

    impl Mailer for SlowMailer {
        async fn send(&self, _email: &Email) -> Result<(), MailError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    fn email() -> Email {
        Email {
            to: "ana@example.com".to_string(),
            subject: "Verify your email".to_string(),
            html: "<p>hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn should_time_out_slow_transport() {
        let res = send_within(&SlowMailer, &email(), Duration::from_millis(100)).await;
        assert_eq!(res, Err(MailError::Timeout(Duration::from_millis(100))));
    }

    #[tokio::test]
    async fn should_fall_back_to_log_mailer() {
        let mailer = AppMailer::from_config(None).unwrap();
        assert!(matches!(mailer, AppMailer::Log(_)));
        assert!(mailer.send(&email()).await.is_ok());
    }
}
