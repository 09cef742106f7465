use log::{error, info};
use thiserror::Error;
use crate::manager_mail::{Mail, MailError};
use crate::manager_topic::{Topic, TopicError};
use crate::rain::RainEvent;

/// Email leg of a notification
pub trait EmailSender: Sync {
    fn send_report(&self, body: &str, attachment: &str) -> Result<(), MailError>;
}

/// Publish leg of a notification
pub trait Publisher: Sync {
    fn publish(&self, message: &str) -> Result<(), TopicError>;
}

impl EmailSender for Mail {
    fn send_report(&self, body: &str, attachment: &str) -> Result<(), MailError> {
        Mail::send_report(self, body, attachment)
    }
}

impl Publisher for Topic {
    fn publish(&self, message: &str) -> Result<(), TopicError> {
        Topic::publish(self, message)
    }
}

/// Builds the summary text, one line per event
///
/// # Arguments
///
/// * 'events' - rain events in time order
pub fn summary(events: &[RainEvent]) -> String {
    events.iter()
        .map(|e| e.to_string())
        .collect::<Vec<String>>()
        .join("\n")
}

/// Sends the email and publishes to the topic concurrently. Both legs always run to completion.
/// If exactly one leg fails its error is returned, if both fail the email error is returned
/// and the publish error is only logged.
///
/// # Arguments
///
/// * 'events' - rain events to notify about, nothing is sent if empty
/// * 'raw_json' - the raw forecast response, attached to the email
/// * 'mail' - email leg
/// * 'topic' - publish leg
pub fn notify<M, P>(events: &[RainEvent], raw_json: &str, mail: &M, topic: &P) -> Result<(), NotifyError>
where
    M: EmailSender,
    P: Publisher,
{
    if events.is_empty() {
        return Ok(());
    }

    let message = summary(events);

    let (email_result, publish_result) = rayon::join(
        || mail.send_report(&message, raw_json),
        || topic.publish(&message),
    );

    match (email_result, publish_result) {
        (Ok(()), Ok(())) => {
            info!("notified about {} hours of rain", events.len());
            Ok(())
        }
        (Err(e), Ok(())) => Err(NotifyError::Email(e)),
        (Ok(()), Err(e)) => Err(NotifyError::Publish(e)),
        (Err(email), Err(publish)) => {
            error!("publish failed as well: {}", publish);
            Err(NotifyError::Email(email))
        }
    }
}

/// Error depicting a failed notification leg
///
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("sending email: {0}")]
    Email(MailError),
    #[error("publishing message: {0}")]
    Publish(TopicError),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Leg that records what it was asked to send and optionally fails
    #[derive(Default)]
    pub struct FakeLeg {
        pub fail: bool,
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl FakeLeg {
        pub fn failing() -> Self {
            FakeLeg { fail: true, ..Default::default() }
        }

        pub fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl EmailSender for FakeLeg {
        fn send_report(&self, body: &str, attachment: &str) -> Result<(), MailError> {
            self.sent.lock().unwrap().push((body.to_string(), attachment.to_string()));
            if self.fail { Err(MailError::MessageError("email down".into())) } else { Ok(()) }
        }
    }

    impl Publisher for FakeLeg {
        fn publish(&self, message: &str) -> Result<(), TopicError> {
            self.sent.lock().unwrap().push((message.to_string(), String::new()));
            if self.fail { Err(TopicError::ParseError("topic down".into())) } else { Ok(()) }
        }
    }

    fn events() -> Vec<RainEvent> {
        vec![
            RainEvent { formatted_time: "10:00AM".into(), probability_percent: 30.0 },
            RainEvent { formatted_time: "2:00PM".into(), probability_percent: 80.0 },
        ]
    }

    #[test]
    fn summary_lines() {
        assert_eq!(summary(&events()), "10:00AM: 30%\n2:00PM: 80%");
    }

    #[test]
    fn both_legs_called_once() {
        let (mail, topic) = (FakeLeg::default(), FakeLeg::default());

        notify(&events(), "{}", &mail, &topic).unwrap();

        assert_eq!(mail.calls(), 1);
        assert_eq!(topic.calls(), 1);
        assert_eq!(mail.sent.lock().unwrap()[0], ("10:00AM: 30%\n2:00PM: 80%".to_string(), "{}".to_string()));
        assert_eq!(topic.sent.lock().unwrap()[0].0, "10:00AM: 30%\n2:00PM: 80%");
    }

    #[test]
    fn no_events_sends_nothing() {
        let (mail, topic) = (FakeLeg::default(), FakeLeg::default());

        notify(&[], "{}", &mail, &topic).unwrap();

        assert_eq!(mail.calls(), 0);
        assert_eq!(topic.calls(), 0);
    }

    #[test]
    fn failing_email_fails_notification() {
        let (mail, topic) = (FakeLeg::failing(), FakeLeg::default());

        let err = notify(&events(), "{}", &mail, &topic).err().unwrap();

        assert!(matches!(err, NotifyError::Email(_)));
        assert_eq!(topic.calls(), 1);
    }

    #[test]
    fn failing_publish_fails_notification() {
        let (mail, topic) = (FakeLeg::default(), FakeLeg::failing());

        let err = notify(&events(), "{}", &mail, &topic).err().unwrap();

        assert!(matches!(err, NotifyError::Publish(_)));
        assert_eq!(mail.calls(), 1);
    }

    #[test]
    fn both_failing_reports_email() {
        let (mail, topic) = (FakeLeg::failing(), FakeLeg::failing());

        let err = notify(&events(), "{}", &mail, &topic).err().unwrap();

        assert!(matches!(err, NotifyError::Email(_)));
        assert_eq!(mail.calls(), 1);
        assert_eq!(topic.calls(), 1);
    }
}
