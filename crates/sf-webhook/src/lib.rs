//! Webhook ingestion (dedup, persist-then-queue, signature verification)
//! and the worker pool that drains the queue against the sync engine and
//! field mapper.

pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod periodic;
pub mod signature;
pub mod worker;

pub use error::{Result, WebhookError};
pub use ingest::{ingest, IngestOutcome};
pub use worker::WorkerPool;
