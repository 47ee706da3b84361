//! Signed HTTP transport shared by the AWS service clients.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{StatusCode, Url};
use tracing::debug;

use super::credentials::AwsCredentials;
use super::sigv4::{self, SignableRequest, SigningParams};
use crate::error::ServiceError;

/// Raw outcome of a signed request.
#[derive(Debug, Clone)]
pub struct AwsResponse {
    pub status: StatusCode,
    /// Value of `x-amzn-ErrorType`, when the service sent one.
    pub error_type: Option<String>,
    pub body: String,
}

impl AwsResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// reqwest client that SigV4-signs every request for one region.
#[derive(Clone)]
pub struct AwsClient {
    http: reqwest::Client,
    credentials: Arc<AwsCredentials>,
    region: String,
}

impl AwsClient {
    pub fn new(
        credentials: Arc<AwsCredentials>,
        region: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::RequestFailed {
                service: "http".to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            credentials,
            region: region.into(),
        })
    }

    /// POST `body` to `url`, signed for `signing_name`.
    ///
    /// Only transport failures are errors here; HTTP error statuses come back
    /// in the [`AwsResponse`] for the caller to interpret.
    pub async fn post(
        &self,
        signing_name: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<AwsResponse, ServiceError> {
        let request_failed = |reason: String| ServiceError::RequestFailed {
            service: signing_name.to_string(),
            reason,
        };

        let parsed = Url::parse(url).map_err(|e| request_failed(format!("Invalid URL {url}: {e}")))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(request_failed(format!("URL has no host: {url}"))),
        };
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let canonical_query =
            sigv4::canonical_query(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let signed = sigv4::sign(
            &SignableRequest {
                method: "POST",
                host: &host,
                path: parsed.path(),
                canonical_query: &canonical_query,
                headers,
                body: &body,
            },
            &SigningParams {
                access_key_id: &self.credentials.access_key_id,
                secret_access_key: self.credentials.secret(),
                session_token: self.credentials.token(),
                region: &self.region,
                service: signing_name,
                time: Utc::now(),
            },
        )?;

        let mut builder = self.http.post(parsed);
        for &(name, value) in headers {
            builder = builder.header(name, value);
        }
        for (name, value) in signed.iter() {
            builder = builder.header(name, value);
        }

        debug!(service = signing_name, url, bytes = body.len(), "Sending signed request");
        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;

        let status = response.status();
        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(':').next().unwrap_or(v).to_string());
        let body = response
            .text()
            .await
            .map_err(|e| request_failed(format!("Failed to read response body: {e}")))?;

        Ok(AwsResponse {
            status,
            error_type,
            body,
        })
    }
}

/// Map a non-success response onto a [`ServiceError`].
///
/// `code` is the service's error code (e.g. `ThrottlingException`), when known.
pub fn service_error(
    service: &str,
    status: StatusCode,
    code: Option<&str>,
    message: String,
) -> ServiceError {
    let service = service.to_string();
    let code = code.unwrap_or_default();
    if code.contains("TextSizeLimitExceeded") {
        ServiceError::TextSizeLimitExceeded { service, message }
    } else if code.contains("Throttl") || status == StatusCode::TOO_MANY_REQUESTS {
        ServiceError::Throttled { service, message }
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ServiceError::AuthFailed {
            service,
            status: status.as_u16(),
            message,
        }
    } else {
        let message = if code.is_empty() {
            message
        } else {
            format!("{code}: {message}")
        };
        ServiceError::Http {
            service,
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    fn client() -> AwsClient {
        let creds = AwsCredentials::new("AKIDTEST", "secret", Some("session".into()));
        AwsClient::new(Arc::new(creds), "ap-south-1", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn post_signs_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header(
                "authorization",
                Matcher::Regex(
                    r"^AWS4-HMAC-SHA256 Credential=AKIDTEST/\d{8}/ap-south-1/comprehend/aws4_request, SignedHeaders=content-type;host;x-amz-date;x-amz-security-token, Signature=[0-9a-f]{64}$".into(),
                ),
            )
            .match_header("x-amz-date", Matcher::Regex(r"^\d{8}T\d{6}Z$".into()))
            .match_header("x-amz-security-token", "session")
            .match_header("content-type", "application/json")
            .match_body("{}")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let response = client()
            .post(
                "comprehend",
                &server.url(),
                &[("content-type", "application/json")],
                b"{}".to_vec(),
            )
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_type_header_is_captured() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(400)
            .with_header(
                "x-amzn-ErrorType",
                "ThrottlingException:http://internal.amazon.com/coral/",
            )
            .with_body("{}")
            .create_async()
            .await;

        let response = client()
            .post("bedrock", &server.url(), &[], Vec::new())
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error_type.as_deref(), Some("ThrottlingException"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_failure() {
        let err = client()
            .post("sns", "http://127.0.0.1:1/", &[], Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RequestFailed { ref service, .. } if service == "sns"));
    }

    #[test]
    fn status_and_code_map_to_errors() {
        assert!(matches!(
            service_error("comprehend", StatusCode::BAD_REQUEST, Some("TextSizeLimitExceededException"), "too big".into()),
            ServiceError::TextSizeLimitExceeded { .. }
        ));
        assert!(matches!(
            service_error("comprehend", StatusCode::BAD_REQUEST, Some("ThrottlingException"), "slow".into()),
            ServiceError::Throttled { .. }
        ));
        assert!(matches!(
            service_error("sns", StatusCode::FORBIDDEN, Some("AuthorizationError"), "denied".into()),
            ServiceError::AuthFailed { status: 403, .. }
        ));
        match service_error("sns", StatusCode::NOT_FOUND, Some("NotFound"), "no topic".into()) {
            ServiceError::Http { status, message, .. } => {
                assert_eq!(status, 404);
                assert_eq!(message, "NotFound: no topic");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
