//! SMTP delivery of document notifications.

use std::fs;
use std::path::PathBuf;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use quotekit_engine::{Notifier, NotifyError, SpecNotification};
use url::Url;

use crate::config::SpecSmtpRaw;

const CONTENT_TYPE_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// [`Notifier`] sending one plain-text mail with the document attached.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    mailbox_from: Mailbox,
}

impl SmtpNotifier {
    pub fn from_config(spec_smtp: &SpecSmtpRaw) -> anyhow::Result<Self> {
        if spec_smtp.host.trim().is_empty() {
            anyhow::bail!("smtp.host is empty");
        }
        let mailbox_from: Mailbox = spec_smtp
            .from
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid smtp.from `{}`: {e}", spec_smtp.from))?;

        let mut builder = if spec_smtp.use_tls {
            SmtpTransport::relay(&spec_smtp.host)?.port(spec_smtp.port)
        } else {
            SmtpTransport::builder_dangerous(&spec_smtp.host).port(spec_smtp.port)
        };
        match (&spec_smtp.user, &spec_smtp.password) {
            (Some(user), Some(password)) => {
                builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
            }
            (None, None) => {}
            _ => anyhow::bail!("set both smtp.user and smtp.password, or neither"),
        }

        Ok(Self {
            transport: builder.build(),
            mailbox_from,
        })
    }

    fn build_message(&self, notification: &SpecNotification) -> Result<Message, NotifyError> {
        let mailbox_to: Mailbox = notification
            .recipient
            .parse()
            .map_err(|_| NotifyError::InvalidRecipient(notification.recipient.clone()))?;

        let path_attachment = derive_attachment_path(&notification.attachment_ref)?;
        let attachment_error = |message: String| NotifyError::Attachment {
            location: notification.attachment_ref.clone(),
            message,
        };
        let bytes = fs::read(&path_attachment).map_err(|e| attachment_error(e.to_string()))?;
        let name_file = path_attachment
            .file_name()
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.xlsx".to_string());
        let content_type =
            ContentType::parse(CONTENT_TYPE_XLSX).map_err(|e| attachment_error(e.to_string()))?;

        Message::builder()
            .from(self.mailbox_from.clone())
            .to(mailbox_to)
            .subject(notification.subject.clone())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(notification.body.clone()))
                    .singlepart(Attachment::new(name_file).body(bytes, content_type)),
            )
            .map_err(|e| NotifyError::Transport(format!("failed to build message: {e}")))
    }
}

impl Notifier for SmtpNotifier {
    fn send(&mut self, notification: &SpecNotification) -> Result<(), NotifyError> {
        let message = self.build_message(notification)?;
        self.transport
            .send(&message)
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        tracing::info!(recipient = %notification.recipient, "notification sent");
        Ok(())
    }
}

/// Local file behind an attachment reference (`file://` URL or plain path).
pub fn derive_attachment_path(attachment_ref: &str) -> Result<PathBuf, NotifyError> {
    if !attachment_ref.contains("://") {
        return Ok(PathBuf::from(attachment_ref));
    }
    let attachment_error = |message: &str| NotifyError::Attachment {
        location: attachment_ref.to_string(),
        message: message.to_string(),
    };
    let url = Url::parse(attachment_ref).map_err(|e| attachment_error(&e.to_string()))?;
    if url.scheme() != "file" {
        return Err(attachment_error("only file:// references can be attached"));
    }
    url.to_file_path()
        .map_err(|_| attachment_error("URL does not name a local file"))
}
