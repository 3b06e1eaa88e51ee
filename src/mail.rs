//! Sending regression reports over SMTP.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};

/// Default SMTP endpoint: the local mail transfer agent.
pub const DEFAULT_SMTP_HOST: &str = "localhost";
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Anything that can deliver a plain-text message. The production
/// implementation speaks SMTP; tests substitute a recording stub.
pub trait Mailer {
    /// Deliver one message. When `from` is absent the implementation
    /// chooses a sender.
    fn send(&self, from: Option<&str>, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// SMTP delivery over an unencrypted connection, intended for a mail
/// transfer agent on the local network.
pub struct SmtpMailer {
    host: String,
    port: u16,
}

impl SmtpMailer {
    #[must_use]
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

impl Default for SmtpMailer {
    fn default() -> Self {
        Self::new(DEFAULT_SMTP_HOST.to_string(), DEFAULT_SMTP_PORT)
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, from: Option<&str>, to: &str, subject: &str, body: &str) -> Result<()> {
        let to_mailbox: Mailbox = to
            .parse()
            .with_context(|| format!("Invalid recipient address: {to}"))?;
        // The message format requires a sender; reuse the recipient when
        // none was given.
        let from_mailbox: Mailbox = match from {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("Invalid sender address: {addr}"))?,
            None => to_mailbox.clone(),
        };

        let message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("Failed to build email message")?;

        let transport = SmtpTransport::builder_dangerous(&self.host)
            .port(self.port)
            .build();
        transport
            .send(&message)
            .with_context(|| format!("Failed to send email via {}:{}", self.host, self.port))?;
        Ok(())
    }
}
