//! Tile download scheduling
//!
//! The [`FetchScheduler`] turns [`ResourceRequest`]s into HTTP downloads with
//! at most `max_concurrent` running at once. Duplicate requests merge, the
//! highest-priority request is dispatched first, and requests that fall out
//! of the current wishlist are pruned before they waste bandwidth.
//!
//! # Example
//!
//! ```ignore
//! use terrastream::loader::{FetchScheduler, ResourceRequest, SchedulerConfig};
//!
//! let mut scheduler = FetchScheduler::new(client, decoder, SchedulerConfig::default());
//! scheduler.request(ResourceRequest::new(address, url, 12.5));
//! scheduler.process_queue();
//!
//! while let Some(outcome) = scheduler.next_outcome().await {
//!     println!("{} finished", outcome.address());
//! }
//! ```

mod queue;
mod request;
mod scheduler;

pub use queue::RequestQueue;
pub use request::{
    Completion, FetchError, FetchOutcome, RequestMetadata, RequestOutcome, ResourceRequest,
};
pub use scheduler::{FetchScheduler, SchedulerConfig, SchedulerStats, DEFAULT_MAX_CONCURRENT};
