//! # Backend Seams
//!
//! The tracker, the interaction browser and the status panel only see the
//! backend through these traits. `VisumClient` implements all of them over
//! HTTP; tests substitute in-memory mocks.

use crate::error::ClientError;
use crate::models::{InteractionDraft, InteractionRecord, ScanOutcome};
use crate::status::Subsystem;
use async_trait::async_trait;

/// One Bluetooth scan cycle
#[async_trait]
pub trait ScanSource: Send + Sync {
    async fn scan(&self) -> Result<ScanOutcome, ClientError>;
}

/// Interaction history storage
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// All interactions recorded for `address`, oldest first
    async fn search(&self, address: &str) -> Result<Vec<InteractionRecord>, ClientError>;

    async fn save(&self, draft: &InteractionDraft) -> Result<(), ClientError>;
}

/// Per-subsystem health check
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn is_available(&self, module: Subsystem) -> Result<bool, ClientError>;
}
