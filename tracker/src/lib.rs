//! Pulsetrail Tracker - interaction telemetry capture and delivery.
//!
//! This crate observes user interactions forwarded by a host application,
//! turns them into structured events with human-readable descriptions, and
//! delivers them to an ingestion service in batches.
//!
//! # Overview
//!
//! A host builds a [`TrackerConfig`], picks a [`Transport`] and calls
//! [`Tracker::start`]. From then on it forwards [`InteractionEvent`]s through
//! the non-blocking handle. Clicks, hovers, pointer samples and semantic
//! actions are queued and flushed when the queue reaches `batch_size` or the
//! flush timer fires. Session lifecycle, page views and errors are sent
//! immediately. [`Tracker::shutdown`] sends the residual queue and a
//! session-end payload, bounded by `teardown_timeout`.
//!
//! Delivery is best-effort: failed sends are logged at debug level and
//! dropped.
//!
//! # Privacy
//!
//! Element text, class strings and custom attributes are truncated, and
//! attributes with sensitive-looking names are never collected. See
//! [`privacy`].
//!
//! # Modules
//!
//! - [`capture`]: Builds events from host signals
//! - [`config`]: Configuration from code or environment variables
//! - [`describe`]: Human-readable event descriptions
//! - [`dom`]: Element snapshots received from the host
//! - [`error`]: Error types for tracker operations
//! - [`idle`]: Active/Idle session state
//! - [`input`]: Host signals
//! - [`interactive`]: Interactive element detection and classification
//! - [`path`]: Bounded ancestor path identifiers
//! - [`privacy`]: Sanitization limits
//! - [`queue`]: Batch buffer
//! - [`replay`]: JSON-lines signal replay
//! - [`sender`]: Transports and fire-and-forget dispatch
//! - [`tracker`]: The tracker handle and event loop
//! - [`types`]: Outgoing event schema
//! - [`utils`]: Debouncing and sampling

pub mod capture;
pub mod config;
pub mod describe;
pub mod dom;
pub mod error;
pub mod idle;
pub mod input;
pub mod interactive;
pub mod path;
pub mod privacy;
pub mod queue;
pub mod replay;
pub mod sender;
pub mod tracker;
pub mod types;
pub mod utils;

pub use config::{ConfigError, TrackerConfig};
pub use dom::Element;
pub use error::{Result, TrackerError};
pub use input::{InteractionEvent, PointerInput};
pub use path::resolve_path;
pub use sender::{Dispatcher, Endpoint, HttpTransport, MemoryTransport, Transport, TransportError};
pub use tracker::Tracker;
pub use types::{Event, EventType};
pub use utils::{Debounced, Debouncer, Sampler};
