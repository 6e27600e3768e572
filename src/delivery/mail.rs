//! Outgoing mail

use crate::config::SmtpConfig;
use crate::error::{DeliveryError, Error, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// A file attached to an outgoing mail
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailAttachment {
    /// Attachment file name
    pub filename: String,
    /// MIME type, e.g. `application/zip`
    pub content_type: String,
    /// Raw bytes
    pub data: Vec<u8>,
}

/// A plain-text mail with at most one attachment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// Optional attachment
    pub attachment: Option<MailAttachment>,
}

/// Mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one mail
    async fn send(&self, mail: OutgoingMail) -> std::result::Result<(), DeliveryError>;
}

/// SMTP transport using STARTTLS and credential authentication
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from configuration
    ///
    /// Requires a username, a password and a parseable sender address.
    pub fn from_config(smtp: &SmtpConfig) -> Result<Self> {
        let (Some(username), Some(password)) = (smtp.username.clone(), smtp.password.clone())
        else {
            return Err(Error::Config {
                message: "SMTP username and password are required".to_string(),
                key: Some("smtp".to_string()),
            });
        };

        let sender = smtp
            .sender()
            .unwrap_or(username.as_str())
            .parse::<Mailbox>()
            .map_err(|e| Error::Config {
                message: format!("invalid sender address: {}", e),
                key: Some("smtp.from".to_string()),
            })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| Error::Config {
                message: format!("invalid SMTP relay {}: {}", smtp.host, e),
                key: Some("smtp.host".to_string()),
            })?
            .port(smtp.port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> std::result::Result<(), DeliveryError> {
        let message = build_message(&self.sender, mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        debug!("mail accepted by relay");
        Ok(())
    }
}

/// Assemble a MIME message: plain text, or multipart/mixed when there is an attachment
pub fn build_message(
    sender: &Mailbox,
    mail: OutgoingMail,
) -> std::result::Result<Message, DeliveryError> {
    let recipient = mail
        .to
        .parse::<Mailbox>()
        .map_err(|e| DeliveryError::Message(format!("invalid recipient {:?}: {}", mail.to, e)))?;

    let builder = Message::builder()
        .from(sender.clone())
        .to(recipient)
        .subject(mail.subject);

    let message = match mail.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                DeliveryError::Message(format!(
                    "invalid content type {:?}: {}",
                    attachment.content_type, e
                ))
            })?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(mail.body))
                    .singlepart(
                        Attachment::new(attachment.filename).body(attachment.data, content_type),
                    ),
            )
        }
        None => builder.header(ContentType::TEXT_PLAIN).body(mail.body),
    };

    message.map_err(|e| DeliveryError::Message(e.to_string()))
}
