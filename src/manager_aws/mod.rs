use std::time::Duration;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::debug;
use reqwest::blocking::Client;
use reqwest::Url;
use sha2::{Digest, Sha256};
use thiserror::Error;
use crate::config::AwsParameters;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

type HmacSha256 = Hmac<Sha256>;

/// Client for the AWS query APIs (SES, SNS), requests are signed with Signature Version 4
///
#[derive(Clone)]
pub struct AwsClient {
    client: Client,
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    region: String,
}

impl AwsClient {
    /// Returns a new instance of the AwsClient struct
    ///
    /// # Arguments
    ///
    /// * 'config' - AWS credentials and region
    pub fn new(config: &AwsParameters) -> Result<AwsClient, AwsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(AwsClient {
            client,
            access_key_id: config.access_key_id.clone(),
            secret_access_key: config.secret_access_key.clone(),
            session_token: config.session_token.clone(),
            region: config.region.clone(),
        })
    }

    /// Calls a query API action and returns the response body
    ///
    /// # Arguments
    ///
    /// * 'service' - signing name of the service, e.g. "sns"
    /// * 'endpoint' - the service endpoint
    /// * 'params' - action parameters, including Action and Version
    pub fn call(&self, service: &str, endpoint: &str, params: &[(&str, &str)]) -> Result<String, AwsError> {
        let url = Url::parse(endpoint)
            .map_err(|e| AwsError::Signing(format!("endpoint {}: {}", endpoint, e)))?;
        let host = host_header(&url)?;
        let body = form_body(params);

        let headers = self.sign(service, &host, url.path(), &body, Utc::now())?;

        let mut request = self.client
            .post(url)
            .header("content-type", CONTENT_TYPE);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.body(body).send()?;
        let status = response.status();
        let text = response.text()?;
        debug!("{} responded {}, length {}", service, status, text.len());

        if !status.is_success() {
            return Err(AwsError::Status { status: status.as_u16(), body: text });
        }

        Ok(text)
    }

    /// Returns the headers (besides content-type and host) that make up a signed request
    ///
    /// # Arguments
    ///
    /// * 'service' - signing name of the service
    /// * 'host' - value of the host header
    /// * 'path' - request path
    /// * 'body' - the form encoded request body
    /// * 'now' - signing time
    fn sign(&self, service: &str, host: &str, path: &str, body: &str, now: DateTime<Utc>) -> Result<Vec<(&'static str, String)>, AwsError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let mut canonical_headers = vec![
            ("content-type", CONTENT_TYPE.to_string()),
            ("host", host.to_string()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = &self.session_token {
            canonical_headers.push(("x-amz-security-token", token.clone()));
        }

        let signed_headers = canonical_headers.iter()
            .map(|(k, _)| *k)
            .collect::<Vec<&str>>()
            .join(";");
        let header_block = canonical_headers.iter()
            .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
            .collect::<String>();

        let path = if path.is_empty() { "/" } else { path };
        let canonical_request = format!("POST\n{}\n\n{}\n{}\n{}",
            path, header_block, signed_headers, sha256_hex(body.as_bytes()));

        let scope = format!("{}/{}/{}/aws4_request", date, self.region, service);
        let string_to_sign = format!("{}\n{}\n{}\n{}",
            ALGORITHM, amz_date, scope, sha256_hex(canonical_request.as_bytes()));

        let key = signing_key(&self.secret_access_key, &date, &self.region, service)?;
        let signature = hex(&hmac(&key, string_to_sign.as_bytes())?);

        let authorization = format!("{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.access_key_id, scope, signed_headers, signature);

        let mut headers = vec![("x-amz-date", amz_date), ("authorization", authorization)];
        if let Some(token) = &self.session_token {
            headers.push(("x-amz-security-token", token.clone()));
        }

        Ok(headers)
    }
}

/// Derives the SigV4 signing key
///
/// # Arguments
///
/// * 'secret' - secret access key
/// * 'date' - date as YYYYMMDD
/// * 'region' - AWS region
/// * 'service' - signing name of the service
fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>, AwsError> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;

    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AwsError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AwsError::Signing(e.to_string()))?;
    mac.update(data);

    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &[u8]) -> String {
    hex(&Sha256::digest(data))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|x| format!("{:02x}", x)).collect::<String>()
}

/// Host header value, the port included when it isn't the scheme default
///
fn host_header(url: &Url) -> Result<String, AwsError> {
    let host = url.host_str()
        .ok_or_else(|| AwsError::Signing(format!("no host in endpoint {}", url)))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Form encodes parameters sorted on key, using the RFC 3986 unreserved set
///
fn form_body(params: &[(&str, &str)]) -> String {
    let mut params = params.to_vec();
    params.sort_by(|a, b| a.0.cmp(b.0));

    params.iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<String>>()
        .join("&")
}

/// Picks out the MessageId element from a query API response, if present.
/// Only used to log the id, the response is not otherwise parsed
///
pub fn message_id(response: &str) -> Option<&str> {
    let start = response.find("<MessageId>")? + "<MessageId>".len();
    let end = response[start..].find("</MessageId>")?;

    Some(response[start..start + end].trim())
}

/// Error depicting errors that occur while calling AWS
///
#[derive(Error, Debug)]
pub enum AwsError {
    #[error("SigningError: {0}")]
    Signing(String),
    #[error("NetworkError: {0}")]
    Network(#[from] reqwest::Error),
    #[error("StatusError: {status}: {body}")]
    Status { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client(session_token: Option<&str>) -> AwsClient {
        AwsClient::new(&AwsParameters {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            session_token: session_token.map(|t| t.to_string()),
            region: "us-east-1".into(),
            ses_endpoint: "https://email.us-east-1.amazonaws.com/".into(),
            sns_endpoint: "https://sns.us-east-1.amazonaws.com/".into(),
        }).unwrap()
    }

    #[test]
    fn signing_key_matches_published_vector() {
        let key = signing_key("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY", "20120215", "us-east-1", "iam").unwrap();

        assert_eq!(hex(&key), "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d");
    }

    #[test]
    fn empty_payload_hash() {
        assert_eq!(sha256_hex(b""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn form_body_is_sorted_and_encoded() {
        let body = form_body(&[("Message", "Jan 2 3:04PM: 30%\nx"), ("Action", "Publish")]);

        assert_eq!(body, "Action=Publish&Message=Jan%202%203%3A04PM%3A%2030%25%0Ax");
    }

    #[test]
    fn authorization_header_layout() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
        let headers = client(None).sign("sns", "sns.us-east-1.amazonaws.com", "/", "Action=Publish", now).unwrap();

        let auth = &headers.iter().find(|(k, _)| *k == "authorization").unwrap().1;
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240115/us-east-1/sns/aws4_request, SignedHeaders=content-type;host;x-amz-date, Signature="));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);

        let date = &headers.iter().find(|(k, _)| *k == "x-amz-date").unwrap().1;
        assert_eq!(date, "20240115T083000Z");
    }

    #[test]
    fn session_token_is_signed_and_sent() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
        let headers = client(Some("TOKEN")).sign("ses", "email.us-east-1.amazonaws.com", "/", "", now).unwrap();

        let auth = &headers.iter().find(|(k, _)| *k == "authorization").unwrap().1;
        assert!(auth.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
        assert!(headers.iter().any(|(k, v)| *k == "x-amz-security-token" && v == "TOKEN"));
    }

    #[test]
    fn signature_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap();
        let c = client(None);

        let a = c.sign("sns", "localhost:8080", "/", "Action=Publish", now).unwrap();
        let b = c.sign("sns", "localhost:8080", "/", "Action=Publish", now).unwrap();
        let other = c.sign("sns", "localhost:8080", "/", "Action=Other", now).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, other);
    }

    #[test]
    fn host_header_keeps_explicit_port() {
        assert_eq!(host_header(&Url::parse("http://127.0.0.1:4566/").unwrap()).unwrap(), "127.0.0.1:4566");
        assert_eq!(host_header(&Url::parse("https://sns.us-east-1.amazonaws.com/").unwrap()).unwrap(), "sns.us-east-1.amazonaws.com");
    }

    #[test]
    fn message_id_is_extracted() {
        let xml = "<PublishResponse><PublishResult><MessageId>abc-123</MessageId></PublishResult></PublishResponse>";

        assert_eq!(message_id(xml), Some("abc-123"));
        assert_eq!(message_id("<Other/>"), None);
    }
}
