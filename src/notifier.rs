use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};

use crate::alert::AlertMessage;
use crate::config::{FailureMode, MailSettings};
use crate::error::{CheckError, Result};

/// Delivers one message to one recipient.
pub trait Notifier {
    fn deliver(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Plain-text mail through an unauthenticated relay, usually the local MTA.
pub struct SmtpNotifier {
    transport: SmtpTransport,
}

impl SmtpNotifier {
    pub fn new(settings: &MailSettings) -> Self {
        let transport = SmtpTransport::builder_dangerous(settings.smtp_host.as_str())
            .port(settings.smtp_port)
            .build();
        Self { transport }
    }
}

impl Notifier for SmtpNotifier {
    fn deliver(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<()> {
        let from: Mailbox = from.parse().map_err(|e| CheckError::delivery(to, e))?;
        let to_mailbox: Mailbox = to.parse().map_err(|e| CheckError::delivery(to, e))?;
        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| CheckError::delivery(to, e))?;

        self.transport
            .send(&message)
            .map_err(|e| CheckError::delivery(to, e))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DeliverySummary {
    pub delivered: Vec<String>,
    pub failed: Vec<CheckError>,
}

/// Sends the alert to every recipient, one delivery each.
///
/// In `Abort` mode the first failure is returned and later recipients are
/// never attempted. In `Continue` mode every recipient is tried and failures
/// are collected in the summary.
pub fn send_alert(
    notifier: &dyn Notifier,
    alert: &AlertMessage,
    from: &str,
    recipients: &[String],
    mode: FailureMode,
) -> Result<DeliverySummary> {
    let mut summary = DeliverySummary::default();
    for recipient in recipients {
        match notifier.deliver(from, recipient, &alert.subject, &alert.body) {
            Ok(()) => {
                tracing::info!("Alert sent to {}", recipient);
                summary.delivered.push(recipient.clone());
            }
            Err(e) if mode == FailureMode::Abort => return Err(e),
            Err(e) => {
                tracing::error!("{}", e);
                summary.failed.push(e);
            }
        }
    }
    Ok(summary)
}
