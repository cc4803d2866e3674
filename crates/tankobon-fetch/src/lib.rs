//! Rate-limited HTTP client for the tankobon manga download agent.
//!
//! This crate provides the outbound request path shared by all connectors:
//!
//! - [`RequestClass`] - Category of requests sharing one rate limit
//! - [`RateLimitConfig`] - Minimum inter-request interval per class
//! - [`RateLimiter`] - Slot reservation enforcing those intervals
//! - [`RateLimitedClient`] - HTTP client that never fails, only reports status
//! - [`RequestResult`] - Normalized outcome of one request

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tankobon-rs/tankobon/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod rate_limit;
mod result;

pub use client::{ClientConfig, RateLimitedClient};
pub use rate_limit::{RateLimitConfig, RateLimiter, RequestClass};
pub use reqwest::StatusCode;
pub use result::RequestResult;
