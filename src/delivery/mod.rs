//! Result delivery for the web variant
//!
//! The finished mashup is zipped into a single-entry archive and mailed; a failed run
//! gets a plain failure notice instead.

pub mod archive;
pub mod mail;
pub mod notifier;

pub use archive::package_artifact;
pub use mail::{MailAttachment, Mailer, OutgoingMail, SmtpMailer};
pub use notifier::{DeliveryStatus, Notifier, NotifyReport};
