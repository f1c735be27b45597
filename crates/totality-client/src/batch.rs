//! Observation batches and the flush policy.
//!
//! A batch owns its pending records and posts them as one document per
//! flush. Records are flushed:
//! - explicitly, via [`ObservationBatch::flush`]
//! - automatically on `add` once the pending count reaches the threshold,
//!   while the batch is inside a [`BatchScope`] (or always, with
//!   [`AutoFlush::Always`])
//! - when a scope is closed, regardless of the threshold
//!
//! Delivery is best effort. A rejected or failed POST is logged, and by
//! default the pending records are discarded rather than retried
//! ([`FailurePolicy`]).
//!
//! Batches are single-owner: every mutating operation takes `&mut self`, so
//! a batch cannot be shared between concurrent callers.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use observation_common::{ObservationError, ObservationResult};
use observation_protocol::{
    BatchMetadata, CollectionType, Observation, ObservationDocument, Record, WireItem,
};

use crate::config::{AutoFlush, FailurePolicy, FlushPolicy};
use crate::transport::Transport;

/// Result of a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending; no request was made.
    Empty,
    /// The service accepted `count` records.
    Delivered { count: usize },
    /// The service answered with a non-200 status.
    Rejected {
        status: u16,
        count: usize,
        /// Whether the records were kept pending.
        requeued: bool,
    },
}

impl FlushOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, FlushOutcome::Delivered { .. })
    }
}

/// A collection of observations headed for one endpoint.
pub struct ObservationBatch {
    collection_type: CollectionType,
    metadata: Arc<BatchMetadata>,
    endpoint: String,
    api_key: Option<String>,
    transport: Arc<dyn Transport>,
    policy: FlushPolicy,
    pending: Vec<Observation>,
    /// Pending count at which the next automatic flush fires.
    auto_flush_at: usize,
    scoped: bool,
}

impl ObservationBatch {
    pub(crate) fn new(
        collection_type: CollectionType,
        metadata: BatchMetadata,
        endpoint: String,
        api_key: Option<String>,
        transport: Arc<dyn Transport>,
        policy: FlushPolicy,
    ) -> Self {
        Self {
            collection_type,
            metadata: Arc::new(metadata),
            endpoint,
            api_key,
            transport,
            policy,
            pending: Vec::new(),
            auto_flush_at: policy.threshold,
            scoped: false,
        }
    }

    pub fn collection_type(&self) -> CollectionType {
        self.collection_type
    }

    pub fn metadata(&self) -> &BatchMetadata {
        &self.metadata
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    /// Records waiting for the next flush, in insertion order.
    pub fn pending(&self) -> &[Observation] {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a [`BatchScope`] is currently open on this batch.
    pub fn is_scoped(&self) -> bool {
        self.scoped
    }

    /// Batch-level metadata document, without any records.
    pub fn to_doc(&self) -> ObservationDocument {
        self.metadata.to_doc()
    }

    /// Point a record at this batch's metadata without adding it.
    pub fn attach<R: Record>(&self, record: &mut R) {
        record.base_mut().attach(&self.metadata);
    }

    /// Add a record.
    ///
    /// Fails if the record belongs in the other collection type or cannot
    /// be rendered. Returns the outcome if the add triggered a flush.
    pub async fn add(
        &mut self,
        record: impl Into<Observation>,
    ) -> ObservationResult<Option<FlushOutcome>> {
        let mut record = record.into();
        self.check_accepts(&record)?;
        self.attach(&mut record);
        self.pending.push(record);
        debug!(
            collection = %self.collection_type,
            pending = self.pending.len(),
            threshold = self.policy.threshold,
            "Added observation"
        );

        if self.auto_flush_enabled() {
            self.maybe_flush().await
        } else {
            Ok(None)
        }
    }

    fn check_accepts(&self, record: &Observation) -> ObservationResult<()> {
        if record.collection_type() != self.collection_type {
            return Err(ObservationError::CollectionMismatch {
                record: record.kind_name(),
                collection: self.collection_type.as_str(),
            });
        }
        // A record that cannot be rendered could never be flushed.
        record.to_item().map(|_| ())
    }

    fn auto_flush_enabled(&self) -> bool {
        self.scoped || self.policy.auto_flush == AutoFlush::Always
    }

    async fn maybe_flush(&mut self) -> ObservationResult<Option<FlushOutcome>> {
        if self.pending.len() >= self.auto_flush_at {
            self.flush().await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Full document for the pending records: metadata plus items.
    pub fn pending_document(&self) -> ObservationResult<ObservationDocument> {
        let items = self
            .pending
            .iter()
            .map(Record::to_item)
            .collect::<ObservationResult<Vec<WireItem>>>()?;
        Ok(self.to_doc().with_items(self.collection_type, items))
    }

    /// Post every pending record in one request.
    ///
    /// Non-200 responses are logged and reported as
    /// [`FlushOutcome::Rejected`]; transport failures are returned as
    /// errors. Either way the failure policy decides whether the records
    /// stay pending.
    #[instrument(skip(self), fields(collection = %self.collection_type, pending = self.pending.len()))]
    pub async fn flush(&mut self) -> ObservationResult<FlushOutcome> {
        if self.pending.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        let doc = self.pending_document()?;
        let count = self.pending.len();

        let result = self
            .transport
            .post_json(&self.endpoint, self.api_key.as_deref(), &doc)
            .await;

        match result {
            Ok(response) if response.is_success() => {
                self.pending.clear();
                self.auto_flush_at = self.policy.threshold;
                info!(count, endpoint = %self.endpoint, "Observations delivered");
                Ok(FlushOutcome::Delivered { count })
            }
            Ok(response) => {
                let requeued = self.apply_failure_policy();
                warn!(
                    status = response.status,
                    body = %response.body,
                    count,
                    requeued,
                    "POST observation responded with failure status"
                );
                Ok(FlushOutcome::Rejected {
                    status: response.status,
                    count,
                    requeued,
                })
            }
            Err(e) => {
                let requeued = self.apply_failure_policy();
                warn!(error = %e, count, requeued, "POST observation failed");
                Err(e)
            }
        }
    }

    /// Returns whether the pending records were kept.
    ///
    /// Kept records push the next automatic flush a full threshold further
    /// out, so a rejecting service is not re-sent the backlog on every add.
    fn apply_failure_policy(&mut self) -> bool {
        match self.policy.on_failure {
            FailurePolicy::Discard => {
                self.pending.clear();
                self.auto_flush_at = self.policy.threshold;
                false
            }
            FailurePolicy::Requeue => {
                self.auto_flush_at = self.pending.len() + self.policy.threshold;
                true
            }
        }
    }

    /// Open a scope: adds auto-flush at the threshold until it is closed.
    pub fn scope(&mut self) -> BatchScope<'_> {
        self.scoped = true;
        BatchScope {
            batch: self,
            closed: false,
        }
    }
}

impl Drop for ObservationBatch {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                collection = %self.collection_type,
                pending = self.pending.len(),
                "Observation batch dropped with unflushed records"
            );
        }
    }
}

impl std::fmt::Debug for ObservationBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationBatch")
            .field("collection_type", &self.collection_type)
            .field("endpoint", &self.endpoint)
            .field("pending", &self.pending.len())
            .field("scoped", &self.scoped)
            .field("policy", &self.policy)
            .finish()
    }
}

/// A bracketed use of a batch.
///
/// While open, every add checks the flush threshold. [`close`](Self::close)
/// always performs a final flush. A scope dropped without closing leaves its
/// records pending on the batch and logs a warning.
pub struct BatchScope<'a> {
    batch: &'a mut ObservationBatch,
    closed: bool,
}

impl BatchScope<'_> {
    /// Add a record, flushing if the threshold is reached.
    pub async fn add(
        &mut self,
        record: impl Into<Observation>,
    ) -> ObservationResult<Option<FlushOutcome>> {
        self.batch.add(record).await
    }

    /// Flush now, without closing the scope.
    pub async fn flush(&mut self) -> ObservationResult<FlushOutcome> {
        self.batch.flush().await
    }

    pub fn batch(&self) -> &ObservationBatch {
        self.batch
    }

    /// Close the scope with a final flush of whatever is pending.
    pub async fn close(mut self) -> ObservationResult<FlushOutcome> {
        self.closed = true;
        self.batch.scoped = false;
        self.batch.flush().await
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.batch.scoped = false;
        if !self.batch.pending.is_empty() {
            warn!(
                collection = %self.batch.collection_type,
                pending = self.batch.pending.len(),
                "Batch scope dropped without close; records left pending"
            );
        }
    }
}
