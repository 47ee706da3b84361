//! AWS service clients: Comprehend, Bedrock runtime and SNS.
//!
//! All three speak plain HTTPS through [`AwsClient`], which signs requests
//! with Signature Version 4.

pub mod bedrock;
pub mod client;
pub mod comprehend;
pub mod credentials;
pub mod sigv4;
pub mod sns;

pub use bedrock::BedrockClient;
pub use client::{AwsClient, AwsResponse};
pub use comprehend::ComprehendClient;
pub use credentials::AwsCredentials;
pub use sns::SnsClient;

/// Default HTTPS endpoint for `prefix` (e.g. `comprehend`) in `region`.
pub fn regional_endpoint(prefix: &str, region: &str) -> String {
    format!("https://{prefix}.{region}.amazonaws.com")
}
