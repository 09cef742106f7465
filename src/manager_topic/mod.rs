use log::info;
use thiserror::Error;
use crate::config::TopicParameters;
use crate::manager_aws::{message_id, AwsClient, AwsError};

/// Struct for publishing messages to a pub/sub topic
pub struct Topic {
    aws: AwsClient,
    endpoint: String,
    topic_arn: String,
}

impl Topic {
    /// Returns a new instance of the Topic struct
    ///
    /// # Arguments
    ///
    /// * 'config' - topic configuration
    /// * 'aws' - client used to reach SNS
    /// * 'endpoint' - SNS endpoint
    pub fn new(config: &TopicParameters, aws: AwsClient, endpoint: &str) -> Result<Self, TopicError> {
        if !config.topic_arn.starts_with("arn:") {
            return Err(TopicError::ParseError(format!("not a topic ARN: {}", config.topic_arn)));
        }

        Ok(Self { aws, endpoint: endpoint.to_string(), topic_arn: config.topic_arn.clone() })
    }

    /// Publishes a plain text message to the topic
    ///
    /// # Arguments
    ///
    /// * 'message' - the message to publish
    pub fn publish(&self, message: &str) -> Result<(), TopicError> {
        info!("publishing message to topic {}", self.topic_arn);

        let response = self.aws.call("sns", &self.endpoint, &[
            ("Action", "Publish"),
            ("Version", "2010-03-31"),
            ("TopicArn", &self.topic_arn),
            ("Message", message),
        ])?;

        info!("message published, message id {}", message_id(&response).unwrap_or("unknown"));

        Ok(())
    }
}

/// Error depicting errors that occur while publishing to a topic
///
#[derive(Debug, Error)]
pub enum TopicError {
    #[error("TransportError: {0}")]
    TransportError(#[from] AwsError),
    #[error("ParseError: {0}")]
    ParseError(String),
}
