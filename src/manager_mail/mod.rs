use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use log::info;
use thiserror::Error;
use crate::config::MailParameters;
use crate::manager_aws::{message_id, AwsClient, AwsError};

const SUBJECT: &str = "It might rain soon!";
const ATTACHMENT_NAME: &str = "data.json";

pub struct Mail {
    aws: AwsClient,
    endpoint: String,
    from: Mailbox,
    to: Mailbox,
}

impl Mail {
    /// Returns a new instance of the Mail struct
    ///
    /// # Arguments
    ///
    /// * 'config' - mail configuration parameters
    /// * 'aws' - client used to reach SES
    /// * 'endpoint' - SES endpoint
    pub fn new(config: &MailParameters, aws: AwsClient, endpoint: &str) -> Result<Self, MailError> {
        let from = config.from.parse::<Mailbox>()
            .map_err(|e| MailError::ParseError(format!("from address: {}", e.to_string())))?;
        let to = config.to.parse::<Mailbox>()
            .map_err(|e| MailError::ParseError(format!("to address: {}", e.to_string())))?;

        Ok(
            Self {
                aws,
                endpoint: endpoint.to_string(),
                from,
                to,
            }
        )
    }

    /// Sends the rain report, with the raw forecast attached as data.json
    ///
    /// # Arguments
    ///
    /// * 'body' - the plain text body of the mail
    /// * 'attachment' - JSON document to attach
    pub fn send_report(&self, body: &str, attachment: &str) -> Result<(), MailError> {
        let raw = self.build_message(body, attachment)?.formatted();
        let data = STANDARD.encode(&raw);
        let source = self.from.email.to_string();
        let destination = self.to.email.to_string();

        info!("sending email to {}", destination);

        let response = self.aws.call("ses", &self.endpoint, &[
            ("Action", "SendRawEmail"),
            ("Version", "2010-12-01"),
            ("Source", &source),
            ("Destinations.member.1", &destination),
            ("RawMessage.Data", &data),
        ])?;

        info!("email sent, message id {}", message_id(&response).unwrap_or("unknown"));

        Ok(())
    }

    /// Builds a multipart message with a plain text part and a JSON attachment
    ///
    /// # Arguments
    ///
    /// * 'body' - the plain text body of the mail
    /// * 'attachment' - JSON document to attach
    fn build_message(&self, body: &str, attachment: &str) -> Result<Message, MailError> {
        let json = ContentType::parse("application/json")
            .map_err(|e| MailError::MessageError(e.to_string()))?;

        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(SUBJECT)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(Attachment::new(ATTACHMENT_NAME.to_string()).body(attachment.to_string(), json))
            )
            .map_err(|e| MailError::MessageError(e.to_string()))
    }
}

/// Error depicting errors that occur while sending emails
///
#[derive(Debug, Error)]
pub enum MailError {
    #[error("TransportError: {0}")]
    TransportError(#[from] AwsError),
    #[error("ParseError: {0}")]
    ParseError(String),
    #[error("MessageError: {0}")]
    MessageError(String),
}
