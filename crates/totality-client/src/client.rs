//! Client facade.

use std::sync::Arc;

use tracing::debug;

use observation_common::ObservationResult;
use observation_protocol::{BatchMetadata, CollectionType};

use crate::batch::ObservationBatch;
use crate::config::ClientConfig;
use crate::transport::{HttpTransport, Transport};

/// Entry point for submitting observations.
///
/// Holds the API key and transport, and hands out batches that share them.
#[derive(Clone)]
pub struct Totality {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl Totality {
    /// Create a client that talks HTTP to the configured service.
    pub fn new(config: ClientConfig) -> ObservationResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
        })
    }

    /// Create a client with default settings and the given API key.
    pub fn with_api_key(api_key: impl Into<String>) -> ObservationResult<Self> {
        Self::new(ClientConfig::with_api_key(api_key))
    }

    /// Create a client from `TOTALITY_*` environment variables.
    pub fn from_env() -> ObservationResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client with a custom transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> ObservationResult<Self> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn api_key(&self) -> Option<&str> {
        self.config.api_key.as_deref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a batch of node observations.
    pub fn create_nodes_collection(&self, metadata: BatchMetadata) -> ObservationBatch {
        self.create_collection(CollectionType::Nodes, metadata)
    }

    /// Create a batch of reading observations.
    pub fn create_readings_collection(&self, metadata: BatchMetadata) -> ObservationBatch {
        self.create_collection(CollectionType::Readings, metadata)
    }

    /// Create a batch of the given type.
    pub fn create_collection(
        &self,
        collection_type: CollectionType,
        metadata: BatchMetadata,
    ) -> ObservationBatch {
        let endpoint = self.config.endpoint(collection_type);
        debug!(collection = %collection_type, endpoint = %endpoint, "Creating observation batch");
        ObservationBatch::new(
            collection_type,
            metadata,
            endpoint,
            self.config.api_key.clone(),
            Arc::clone(&self.transport),
            self.config.flush,
        )
    }
}

impl std::fmt::Debug for Totality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Totality")
            .field("base_url", &self.config.base_url)
            .field("api_key", &self.config.api_key.as_ref().map(|_| "<redacted>"))
            .field("flush", &self.config.flush)
            .finish()
    }
}
