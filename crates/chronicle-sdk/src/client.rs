use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use chronicle_engine::{
    DetailOutcome, DetailResolver, DetailedWriteOutcome, EngineConfig, EngineObserver,
    PeerSelector, QueryOrchestrator, QueryOutcome, RandomSelector, TracingObserver,
    WriteOrchestrator, WriteOutcome,
};
use chronicle_session::{InMemoryNetwork, LedgerSession};
use chronicle_types::{
    QueryRequest, TransactionId, WriteRequest, DEFAULT_EVALUATE_TIMEOUT, DEFAULT_QUERY_TIMEOUT,
    DEFAULT_WRITE_TIMEOUT,
};

use crate::config::ClientConfig;
use crate::error::SdkResult;

/// Timeouts for calls that do not carry their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallTimeouts {
    /// One-shot submissions.
    pub submit: Duration,
    /// Transaction lookups.
    pub lookup: Duration,
    /// One-shot evaluations.
    pub evaluate: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            submit: DEFAULT_WRITE_TIMEOUT,
            lookup: DEFAULT_QUERY_TIMEOUT,
            evaluate: DEFAULT_EVALUATE_TIMEOUT,
        }
    }
}

impl From<&ClientConfig> for CallTimeouts {
    fn from(config: &ClientConfig) -> Self {
        Self {
            submit: config.write_timeout(),
            lookup: config.query_timeout(),
            evaluate: config.evaluate_timeout(),
        }
    }
}

/// Assembles a [`Chronicle`] around a ledger session.
pub struct ChronicleBuilder {
    session: Arc<dyn LedgerSession>,
    config: EngineConfig,
    selector: Arc<dyn PeerSelector>,
    observer: Arc<dyn EngineObserver>,
    timeouts: CallTimeouts,
}

impl ChronicleBuilder {
    /// Peer selection for writes and queries.
    pub fn with_selector(mut self, selector: Arc<dyn PeerSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn build(self) -> Chronicle {
        let config = Arc::new(self.config);
        Chronicle {
            writer: WriteOrchestrator::new(
                Arc::clone(&self.session),
                Arc::clone(&config),
                Arc::clone(&self.selector),
                Arc::clone(&self.observer),
            ),
            reader: QueryOrchestrator::new(
                Arc::clone(&self.session),
                Arc::clone(&config),
                self.selector,
                Arc::clone(&self.observer),
            ),
            // Detail lookups always draw a fresh random peer per attempt.
            details: DetailResolver::new(
                Arc::clone(&self.session),
                Arc::new(RandomSelector),
                self.observer,
            ),
            session: self.session,
            config,
            timeouts: self.timeouts,
        }
    }
}

/// Client facade for writing and reading ledger records.
///
/// Cheap to clone; clones share the session and observer. Every operation
/// returns a structured outcome rather than failing outright, except the
/// gateway-style one-shot calls which return the raw payload.
#[derive(Clone)]
pub struct Chronicle {
    session: Arc<dyn LedgerSession>,
    config: Arc<EngineConfig>,
    writer: WriteOrchestrator,
    reader: QueryOrchestrator,
    details: DetailResolver,
    timeouts: CallTimeouts,
}

impl Chronicle {
    /// Random peer selection, tracing diagnostics, default timeouts.
    pub fn builder(session: Arc<dyn LedgerSession>, config: EngineConfig) -> ChronicleBuilder {
        ChronicleBuilder {
            session,
            config,
            selector: Arc::new(RandomSelector),
            observer: Arc::new(TracingObserver),
            timeouts: CallTimeouts::default(),
        }
    }

    pub fn new(session: Arc<dyn LedgerSession>, config: EngineConfig) -> Self {
        Self::builder(session, config).build()
    }

    /// A client using the contract names and timeouts of `config`.
    pub fn from_config(session: Arc<dyn LedgerSession>, config: &ClientConfig) -> Self {
        Self::builder(session, config.engine_config())
            .with_timeouts(CallTimeouts::from(config))
            .build()
    }

    /// A client wired to a fresh in-memory network holding the configured
    /// peers. The network handle is returned for scripting and inspection.
    pub fn in_memory(config: &ClientConfig) -> SdkResult<(Self, InMemoryNetwork)> {
        config.validate(false)?;
        let network = InMemoryNetwork::new(
            config.channel.as_str(),
            config.user.as_str(),
            config.peer_handles(),
        );
        info!(
            channel = %config.channel,
            peers = config.peers.len(),
            "in-memory network ready"
        );
        let client = Self::from_config(Arc::new(network.clone()), config);
        Ok((client, network))
    }

    pub fn channel(&self) -> &str {
        self.session.channel()
    }

    pub fn contract(&self) -> &str {
        &self.config.contract
    }

    pub fn timeouts(&self) -> CallTimeouts {
        self.timeouts
    }

    pub async fn write_record(&self, request: &WriteRequest) -> WriteOutcome {
        self.writer.write(request).await
    }

    /// Write a record, then fetch the committed transaction and its
    /// timestamp with the request's own attempt budget and timeout.
    pub async fn write_record_with_details(&self, request: &WriteRequest) -> DetailedWriteOutcome {
        let write = self.writer.write(request).await;
        let Some(transaction_id) = write.transaction_id.clone().filter(|_| write.succeeded) else {
            return DetailedWriteOutcome::without_details(write);
        };

        let mut outcome = DetailedWriteOutcome::without_details(write);
        match self
            .details
            .resolve_details(&transaction_id, request.max_attempts, request.timeout)
            .await
        {
            Ok(resolved) => {
                outcome.timestamp = Some(resolved.timestamp);
                outcome.details = Some(resolved.record);
            }
            Err(err) => {
                debug!(tx_id = transaction_id.short_id(), error = %err, "details unavailable");
                outcome.detail_error = Some(err);
            }
        }
        outcome
    }

    pub async fn query_record(&self, request: &QueryRequest) -> QueryOutcome {
        self.reader.query(request).await
    }

    /// Single lookup of a transaction, on `peer` or on the default peer.
    pub async fn get_transaction_details(
        &self,
        transaction_id: &TransactionId,
        peer: Option<&str>,
    ) -> DetailOutcome {
        self.details
            .fetch(transaction_id, peer, self.timeouts.lookup)
            .await
    }

    /// One write attempt of `function(args)`, returning the contract's
    /// result once the transaction is committed as valid.
    pub async fn submit_transaction(&self, function: &str, args: Vec<String>) -> SdkResult<Vec<u8>> {
        let outcome = self
            .writer
            .submit_once(function, args, self.timeouts.submit)
            .await;
        match outcome.error {
            Some(err) => Err(err.into()),
            None => Ok(outcome.payload),
        }
    }

    /// Evaluate `function(args)` on one random peer, without ordering.
    pub async fn evaluate_transaction(
        &self,
        function: &str,
        args: Vec<String>,
    ) -> SdkResult<Vec<u8>> {
        Ok(self
            .reader
            .evaluate_once(function, args, self.timeouts.evaluate)
            .await?)
    }
}
