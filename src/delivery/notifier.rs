//! Terminal notification for mailed jobs

use super::archive::package_artifact;
use super::mail::{MailAttachment, Mailer, OutgoingMail};
use crate::error::DeliveryError;
use crate::types::{DeliveryPackage, JobOutcome};
use std::sync::Arc;
use tracing::{info, warn};

/// Subject of the mail carrying a finished mashup
pub const SUCCESS_SUBJECT: &str = "Your Audio Mashup is Ready!";

/// Body of the mail carrying a finished mashup
pub const SUCCESS_BODY: &str =
    "Your mashup has been generated successfully. Find the ZIP file attached.";

/// Subject of the mail reporting a failed run
pub const FAILURE_SUBJECT: &str = "Mashup Generation Failed";

/// Body of the mail reporting a failed run
pub fn failure_body(error: &str) -> String {
    format!(
        "Sorry, there was an error generating your mashup: {}. Please try again.",
        error
    )
}

/// Whether the mail left
#[derive(Debug)]
pub enum DeliveryStatus {
    /// The relay accepted the mail
    Sent {
        /// `true` if the mail carried the mashup, `false` for a failure notice
        success: bool,
    },
    /// Delivery failed; the error has been logged and nothing further happens
    Dropped(DeliveryError),
}

/// What [`Notifier::notify`] did
#[derive(Debug)]
pub struct NotifyReport {
    /// Mail delivery result
    pub status: DeliveryStatus,
    /// Archive created for a successful run, left on disk for cleanup
    pub package: Option<DeliveryPackage>,
    /// Set when a completed run could not be packaged and a failure notice went out
    pub packaging_error: Option<DeliveryError>,
}

impl NotifyReport {
    /// Whether the relay accepted the mail
    pub fn is_sent(&self) -> bool {
        matches!(self.status, DeliveryStatus::Sent { .. })
    }
}

/// Mails job outcomes to requesters
///
/// Never fails: every packaging or transport problem ends up in
/// [`DeliveryStatus::Dropped`] after being logged.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    archive_name: String,
}

impl Notifier {
    /// Create a notifier that names delivery archives `archive_name`
    pub fn new(mailer: Arc<dyn Mailer>, archive_name: impl Into<String>) -> Self {
        Self {
            mailer,
            archive_name: archive_name.into(),
        }
    }

    /// Send `outcome` to `recipient`
    ///
    /// A completed outcome is zipped next to the artifact and attached. If packaging
    /// fails, a failure notice naming the packaging error is sent instead.
    pub async fn notify(&self, recipient: &str, outcome: &JobOutcome) -> NotifyReport {
        let mut packaging_error = None;
        let (mail, package, success) = match outcome {
            JobOutcome::Completed(artifact) => {
                let archive_path = artifact.path.with_file_name(&self.archive_name);
                match package_artifact(artifact, &archive_path).await {
                    Ok(package) => match self.success_mail(recipient, &package).await {
                        Ok(mail) => (mail, Some(package), true),
                        Err(e) => return self.dropped(recipient, e, Some(package), None),
                    },
                    Err(e) => {
                        warn!(recipient, error = %e, "packaging failed, sending failure notice");
                        let mail = failure_mail(recipient, &e.to_string());
                        packaging_error = Some(e);
                        (mail, None, false)
                    }
                }
            }
            JobOutcome::Failed { message, .. } => (failure_mail(recipient, message), None, false),
        };

        match self.mailer.send(mail).await {
            Ok(()) => {
                info!(recipient, success, "notification sent");
                NotifyReport {
                    status: DeliveryStatus::Sent { success },
                    package,
                    packaging_error,
                }
            }
            Err(e) => self.dropped(recipient, e, package, packaging_error),
        }
    }

    async fn success_mail(
        &self,
        recipient: &str,
        package: &DeliveryPackage,
    ) -> Result<OutgoingMail, DeliveryError> {
        let data = tokio::fs::read(&package.path)
            .await
            .map_err(|e| DeliveryError::Package {
                path: package.path.clone(),
                reason: format!("failed to read archive: {}", e),
            })?;

        Ok(OutgoingMail {
            to: recipient.to_string(),
            subject: SUCCESS_SUBJECT.to_string(),
            body: SUCCESS_BODY.to_string(),
            attachment: Some(MailAttachment {
                filename: package.file_name(),
                content_type: "application/zip".to_string(),
                data,
            }),
        })
    }

    fn dropped(
        &self,
        recipient: &str,
        error: DeliveryError,
        package: Option<DeliveryPackage>,
        packaging_error: Option<DeliveryError>,
    ) -> NotifyReport {
        warn!(recipient, error = %error, "notification dropped");
        NotifyReport {
            status: DeliveryStatus::Dropped(error),
            package,
            packaging_error,
        }
    }
}

fn failure_mail(recipient: &str, error: &str) -> OutgoingMail {
    OutgoingMail {
        to: recipient.to_string(),
        subject: FAILURE_SUBJECT.to_string(),
        body: failure_body(error),
        attachment: None,
    }
}
