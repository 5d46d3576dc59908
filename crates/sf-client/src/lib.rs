//! Authenticated, rate-limited, retry-aware HTTP access to the tracker's
//! REST and Agile APIs, with Cloud/Server instance auto-detection.

pub mod client;
pub mod dto;
pub mod error;

pub use client::{InstanceType, TrackerClient};
pub use error::{ClientError, Result};
