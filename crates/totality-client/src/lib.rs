//! Client library for the Totality observations service.
//!
//! Builds batches of node and reading observations, validates their
//! metadata, and posts them as JSON documents.
//!
//! # Example
//!
//! ```rust,no_run
//! use totality_client::{BatchMetadata, Node, NodeId, Totality};
//!
//! # async fn run() -> Result<(), totality_client::ObservationError> {
//! let client = Totality::with_api_key("my-key")?;
//! let metadata = BatchMetadata::builder()
//!     .username("system")
//!     .organization_type("company")
//!     .build()?;
//!
//! let mut batch = client.create_nodes_collection(metadata);
//! let mut scope = batch.scope();
//! let id = NodeId::new().with("node_type", "facility")?;
//! scope.add(Node::new(id, 34.0, -120.0)?).await?;
//! scope.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod transport;

pub use batch::{BatchScope, FlushOutcome, ObservationBatch};
pub use client::Totality;
pub use config::{AutoFlush, ClientConfig, FailurePolicy, FlushPolicy, DEFAULT_BATCH_SIZE};
pub use transport::{HttpTransport, RecordedRequest, RecordingTransport, Transport, TransportResponse};

// Re-export the record model so most callers need only this crate
pub use observation_common::{ErrorKind, ObservationError, ObservationResult, ObservedAt};
pub use observation_protocol::{
    BatchMetadata, CollectionType, Feature, Geometry, Node, NodeId, NodeType, Observation,
    Reading, Record, Shape,
};
