//! Fetch requests, outcomes and errors.

use crate::coord::TileAddress;
use crate::decode::{DecodeError, TileData};
use crate::provider::ProviderError;
use std::sync::Arc;
use thiserror::Error;

/// Bookkeeping carried alongside a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Tile the caller was ultimately after, when this is a fallback fetch.
    pub origin: Option<TileAddress>,
    /// Frame number the request was issued in.
    pub frame: u64,
}

/// A tile the scheduler should download.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    pub address: TileAddress,
    pub url: String,
    /// Higher values are fetched first.
    pub priority: f64,
    pub metadata: RequestMetadata,
}

impl ResourceRequest {
    pub fn new(address: TileAddress, url: impl Into<String>, priority: f64) -> Self {
        Self {
            address,
            url: url.into(),
            priority,
            metadata: RequestMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// What happened to a request handed to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Newly queued
    Enqueued,
    /// Folded into an already queued request for the same address
    Merged,
    /// Ignored because the address is already downloading
    AlreadyInFlight,
}

/// Why a fetch produced no data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Network failure: {0}")]
    Network(#[from] ProviderError),

    #[error("Corrupt payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("Fetch task panicked: {0}")]
    Panicked(String),
}

/// Result of a finished fetch, as seen by the owning layer.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Done {
        address: TileAddress,
        data: Arc<TileData>,
    },
    Failed {
        address: TileAddress,
        error: FetchError,
    },
}

impl FetchOutcome {
    pub fn address(&self) -> TileAddress {
        match self {
            FetchOutcome::Done { address, .. } | FetchOutcome::Failed { address, .. } => *address,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, FetchOutcome::Done { .. })
    }
}

/// Message sent by a fetch task when it finishes.
///
/// The ticket identifies the dispatch; completions whose ticket no longer
/// matches the in-flight entry are discarded.
#[derive(Debug)]
pub struct Completion {
    pub(crate) ticket: u64,
    pub(crate) address: TileAddress,
    pub(crate) result: Result<Arc<TileData>, FetchError>,
}

impl Completion {
    pub fn address(&self) -> TileAddress {
        self.address
    }
}
