//! Amazon SNS publisher.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::client::{AwsClient, service_error};
use crate::error::ServiceError;
use crate::notify::Publisher;

const SERVICE: &str = "sns";
const API_VERSION: &str = "2010-03-31";

static ERROR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Code>([^<]*)</Code>").expect("valid regex"));
static ERROR_MESSAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Message>([^<]*)</Message>").expect("valid regex"));

static XML_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(lt|gt|quot|apos|amp|#[0-9]+|#x[0-9a-fA-F]+);").expect("valid regex")
});

/// Text of the first `re` capture, with XML entities decoded.
fn capture(re: &Regex, body: &str) -> Option<String> {
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| xml_unescape(m.as_str()))
}

/// Decode the predefined XML entities and numeric character references in one
/// pass, so `&amp;lt;` becomes `&lt;` rather than `<`. Unknown or invalid
/// references are left as written.
fn xml_unescape(text: &str) -> String {
    XML_ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .unwrap_or_else(|| entity[1..].parse())
                    .ok()
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// [`Publisher`] that calls the SNS `Publish` query API.
pub struct SnsClient {
    aws: AwsClient,
    endpoint: String,
}

impl SnsClient {
    pub fn new(aws: AwsClient, endpoint: impl Into<String>) -> Self {
        Self {
            aws,
            endpoint: endpoint.into(),
        }
    }
}

/// Form-encoded `Publish` request body.
pub fn publish_body(topic: &str, message: &str) -> Result<String, ServiceError> {
    serde_urlencoded::to_string([
        ("Action", "Publish"),
        ("Version", API_VERSION),
        ("TopicArn", topic),
        ("Message", message),
    ])
    .map_err(|e| ServiceError::RequestFailed {
        service: SERVICE.to_string(),
        reason: format!("Failed to encode request: {e}"),
    })
}

#[async_trait]
impl Publisher for SnsClient {
    async fn publish(&self, topic: &str, message: &str) -> Result<(), ServiceError> {
        let body = publish_body(topic, message)?;
        let response = self
            .aws
            .post(
                SERVICE,
                &self.endpoint,
                &[(
                    "content-type",
                    "application/x-www-form-urlencoded; charset=utf-8",
                )],
                body.into_bytes(),
            )
            .await?;

        if response.is_success() {
            return Ok(());
        }
        let code = capture(&ERROR_CODE, &response.body);
        let message =
            capture(&ERROR_MESSAGE, &response.body).unwrap_or_else(|| response.body.clone());
        Err(service_error(SERVICE, response.status, code.as_deref(), message))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mockito::Matcher;

    use super::*;
    use crate::aws::AwsCredentials;

    const TOPIC: &str = "arn:aws:sns:ap-south-1:123456789012:negative-comments";

    fn client(url: &str) -> SnsClient {
        let creds = Arc::new(AwsCredentials::new("AKIDTEST", "secret", None));
        let aws = AwsClient::new(creds, "ap-south-1", Duration::from_secs(5)).unwrap();
        SnsClient::new(aws, url)
    }

    #[test]
    fn body_is_form_encoded() {
        let body = publish_body(TOPIC, "Sentiment: NEGATIVE\nIssue: KAN-1").unwrap();
        assert_eq!(
            body,
            "Action=Publish&Version=2010-03-31\
             &TopicArn=arn%3Aaws%3Asns%3Aap-south-1%3A123456789012%3Anegative-comments\
             &Message=Sentiment%3A+NEGATIVE%0AIssue%3A+KAN-1"
        );
    }

    #[tokio::test]
    async fn publish_posts_signed_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("content-type", "application/x-www-form-urlencoded; charset=utf-8")
            .match_header("authorization", Matcher::Regex("/ap-south-1/sns/aws4_request".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("Action".into(), "Publish".into()),
                Matcher::UrlEncoded("TopicArn".into(), TOPIC.into()),
                Matcher::UrlEncoded("Message".into(), "hello world".into()),
            ]))
            .with_status(200)
            .with_body("<PublishResponse><PublishResult><MessageId>abc</MessageId></PublishResult></PublishResponse>")
            .create_async()
            .await;

        client(&server.url()).publish(TOPIC, "hello world").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn xml_error_is_mapped() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(403)
            .with_body(
                "<ErrorResponse><Error><Type>Sender</Type><Code>AuthorizationError</Code>\
                 <Message>User is not authorized to publish</Message></Error></ErrorResponse>",
            )
            .create_async()
            .await;

        let err = client(&server.url()).publish(TOPIC, "x").await.unwrap_err();
        match err {
            ServiceError::AuthFailed { status, message, .. } => {
                assert_eq!(status, 403);
                assert_eq!(message, "User is not authorized to publish");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn xml_error_message_is_unescaped() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(400)
            .with_body(
                "<ErrorResponse><Error><Code>InvalidParameter</Code>\
                 <Message>Invalid parameter: User&apos;s topic &amp; policy &lt;v2&gt; \
                 &quot;alerts&quot; &#233;t&#xE9;</Message></Error></ErrorResponse>",
            )
            .create_async()
            .await;

        let err = client(&server.url()).publish(TOPIC, "x").await.unwrap_err();
        match err {
            ServiceError::Http { status, message, .. } => {
                assert_eq!(status, 400);
                assert_eq!(
                    message,
                    "InvalidParameter: Invalid parameter: User's topic & policy <v2> \"alerts\" été"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn xml_unescape_decodes_once() {
        assert_eq!(xml_unescape("a &amp;lt; b"), "a &lt; b");
        assert_eq!(xml_unescape("fish &amp; chips"), "fish & chips");
        assert_eq!(xml_unescape("&bogus; &#xZZ; &"), "&bogus; &#xZZ; &");
        assert_eq!(xml_unescape("plain"), "plain");
    }

    #[tokio::test]
    async fn missing_topic_is_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(404)
            .with_body("<ErrorResponse><Error><Code>NotFound</Code><Message>Topic does not exist</Message></Error></ErrorResponse>")
            .create_async()
            .await;

        let err = client(&server.url()).publish(TOPIC, "x").await.unwrap_err();
        assert!(matches!(err, ServiceError::Http { status: 404, .. }));
    }
}
