use thiserror::Error;
use tracing::info;

use sest_types::events::IngestEvent;
use sest_types::models::Channel;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("an html or a text body has to be provided")]
    MissingBody,

    #[error("no recipients")]
    NoRecipients,

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// Recipient list. A single address converts into a one-element list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients(Vec<String>);

impl From<&str> for Recipients {
    fn from(addr: &str) -> Self {
        Self(vec![addr.to_string()])
    }
}

impl From<String> for Recipients {
    fn from(addr: String) -> Self {
        Self(vec![addr])
    }
}

impl From<Vec<String>> for Recipients {
    fn from(addrs: Vec<String>) -> Self {
        Self(addrs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
}

impl EmailMessage {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<Recipients>,
        subject: impl Into<String>,
        text_body: Option<String>,
        html_body: Option<String>,
    ) -> Result<Self, NotifyError> {
        if text_body.is_none() && html_body.is_none() {
            return Err(NotifyError::MissingBody);
        }

        let Recipients(to) = to.into();
        let to: Vec<String> = to
            .into_iter()
            .map(|addr| addr.trim().to_string())
            .filter(|addr| !addr.is_empty())
            .collect();
        if to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        Ok(Self {
            from: from.into(),
            to,
            subject: subject.into(),
            text_body,
            html_body,
        })
    }
}

/// Outbound mail capability, injected wherever notifications are sent.
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Mailer that only logs what it would have sent.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        for recipient in &message.to {
            info!(
                from = %message.from,
                to = %recipient,
                subject = %message.subject,
                "mail queued"
            );
        }
        Ok(())
    }
}

/// Message announcing `event` to the channel's notification address, if
/// the channel has one.
pub fn record_created_email(channel: &Channel, event: &IngestEvent, from: &str) -> Option<EmailMessage> {
    let to = channel.notification_email.as_deref()?;
    if event.channel_id() != channel.id {
        return None;
    }

    let IngestEvent::RecordCreated {
        record_id,
        field_count,
        at,
        ..
    } = event;

    let subject = format!("Channel {}: new record {}", channel.id, record_id);
    let text = format!(
        "Record {} with {} field(s) was stored on channel {} at {}.",
        record_id,
        field_count,
        channel.id,
        at.to_rfc3339()
    );

    EmailMessage::new(from, to, subject, Some(text), None).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    impl Mailer for CapturingMailer {
        fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn channel(email: Option<&str>) -> Channel {
        Channel {
            id: 5,
            user_id: 1,
            write_key: Uuid::new_v4(),
            last_update: chrono::Utc::now(),
            number_fields: 2,
            notification_email: email.map(str::to_string),
        }
    }

    fn event(channel_id: i64) -> IngestEvent {
        IngestEvent::RecordCreated {
            channel_id,
            record_id: 42,
            field_count: 2,
            at: chrono::Utc::now(),
        }
    }

    #[test]
    fn body_is_required() {
        let err = EmailMessage::new("a@b.c", "d@e.f", "hi", None, None).unwrap_err();
        assert!(matches!(err, NotifyError::MissingBody));
    }

    #[test]
    fn recipients_are_required() {
        let err = EmailMessage::new("a@b.c", Vec::<String>::new(), "hi", Some("x".into()), None).unwrap_err();
        assert!(matches!(err, NotifyError::NoRecipients));

        let err = EmailMessage::new("a@b.c", "  ", "hi", Some("x".into()), None).unwrap_err();
        assert!(matches!(err, NotifyError::NoRecipients));
    }

    #[test]
    fn single_recipient_becomes_list() {
        let msg = EmailMessage::new("a@b.c", "d@e.f", "hi", None, Some("<p>x</p>".into())).unwrap();
        assert_eq!(msg.to, vec!["d@e.f".to_string()]);
    }

    #[test]
    fn record_created_email_needs_address() {
        assert!(record_created_email(&channel(None), &event(5), "sest@localhost").is_none());
        assert!(record_created_email(&channel(Some("o@x.y")), &event(6), "sest@localhost").is_none());

        let msg = record_created_email(&channel(Some("o@x.y")), &event(5), "sest@localhost").unwrap();
        assert_eq!(msg.to, vec!["o@x.y".to_string()]);
        assert!(msg.subject.contains("record 42"));
    }

    #[test]
    fn mailer_is_injected() {
        let mailer = CapturingMailer::default();
        let msg = record_created_email(&channel(Some("o@x.y")), &event(5), "sest@localhost").unwrap();
        let boxed: &dyn Mailer = &mailer;
        boxed.send(&msg).unwrap();
        LogMailer.send(&msg).unwrap();
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }
}
