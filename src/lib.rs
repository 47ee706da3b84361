//! Sentiment webhook: flags negative issue-tracker comments.

pub mod aws;
pub mod config;
pub mod error;
pub mod handler;
pub mod normalize;
pub mod notify;
pub mod paraphrase;
pub mod sentiment;
pub mod server;
pub mod webhook;
