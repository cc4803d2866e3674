//! Job registry and scheduler for the tankobon manga download agent.
//!
//! - [`JobKind`] / [`JobKey`] / [`JobId`] - Job identity and deduplication
//! - [`JobFilter`] - Partial key match for listing and bulk removal
//! - [`JobTask`] - What a job does
//! - [`Job`] / [`JobSnapshot`] - Registered job and its point-in-time view
//! - [`JobBoss`] - Registry, scheduler, and execution boundary

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tankobon-rs/tankobon/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod boss;
mod error;
mod job;
mod key;
mod scheduler;
mod worker;

#[cfg(test)]
mod testing;

pub use boss::JobBoss;
pub use error::{JobError, Result};
pub use job::{Job, JobSnapshot, JobTask};
pub use key::{JobFilter, JobId, JobKey, JobKind};
