use crate::{Email, MailError, Mailer};

/// Writes outgoing mail to the log instead of sending it.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        log::info!(
            "Email to {} with subject {:?} ({} bytes) not sent, no SMTP server configured",
            email.to,
            email.subject,
            email.html.len()
        );
        Ok(())
    }
}
