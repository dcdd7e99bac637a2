use std::time::Duration;

use crate::transaction::TransactionId;

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(9_500);
pub const DEFAULT_WRITE_ATTEMPTS: u32 = 2;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(7_500);
pub const DEFAULT_QUERY_ATTEMPTS: u32 = 2;
/// Timeout for one-shot evaluations that bypass the retrying query path.
pub const DEFAULT_EVALUATE_TIMEOUT: Duration = Duration::from_millis(12_500);

/// A request to record data on the ledger.
///
/// The record identifier travels as one of the contract arguments: at
/// `identifier_position` when given, otherwise first. With
/// `autogenerate_id` the transaction id minted for the attempt is used as
/// the identifier, so every retry records under a different key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRequest {
    pub record_id: Option<String>,
    pub autogenerate_id: bool,
    pub payload: Vec<String>,
    pub identifier_position: Option<usize>,
    pub contract: Option<String>,
    pub function: Option<String>,
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl WriteRequest {
    pub fn new<I, S>(payload: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            record_id: None,
            autogenerate_id: false,
            payload: payload.into_iter().map(Into::into).collect(),
            identifier_position: None,
            contract: None,
            function: None,
            timeout: DEFAULT_WRITE_TIMEOUT,
            max_attempts: DEFAULT_WRITE_ATTEMPTS,
        }
    }

    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }

    pub fn autogenerate_id(mut self) -> Self {
        self.autogenerate_id = true;
        self
    }

    pub fn with_identifier_position(mut self, position: usize) -> Self {
        self.identifier_position = Some(position);
        self
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// The identifier this write records under for the given transaction.
    pub fn record_key(&self, transaction_id: &TransactionId) -> Option<String> {
        if self.autogenerate_id {
            Some(transaction_id.to_string())
        } else {
            self.record_id.clone()
        }
    }

    /// Contract arguments with `identifier` spliced in.
    ///
    /// Positions past the end of the payload append the identifier.
    pub fn assemble_args(&self, identifier: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(self.payload.len() + 1);
        args.extend(self.payload.iter().cloned());
        let position = self
            .identifier_position
            .map_or(0, |p| p.min(self.payload.len()));
        args.insert(position, identifier.to_string());
        args
    }
}

/// Which peers a query addresses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum QueryTarget {
    /// Every peer the session knows about; first non-empty answer wins.
    #[default]
    AllPeers,
    /// A single peer, by name.
    Peer(String),
}

/// A request to read one record by key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    pub key: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub contract: Option<String>,
    pub function: Option<String>,
    pub target: QueryTarget,
}

impl QueryRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            timeout: DEFAULT_QUERY_TIMEOUT,
            max_attempts: DEFAULT_QUERY_ATTEMPTS,
            contract: None,
            function: None,
            target: QueryTarget::AllPeers,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn on_peer(mut self, name: impl Into<String>) -> Self {
        self.target = QueryTarget::Peer(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn write_defaults() {
        let req = WriteRequest::new(["a", "b"]);
        assert_eq!(req.timeout, Duration::from_millis(9500));
        assert_eq!(req.max_attempts, 2);
        assert!(!req.autogenerate_id);
        assert_eq!(req.payload, vec!["a", "b"]);
    }

    #[test]
    fn query_defaults() {
        let req = QueryRequest::new("k1");
        assert_eq!(req.timeout, Duration::from_millis(7500));
        assert_eq!(req.max_attempts, 2);
        assert_eq!(req.target, QueryTarget::AllPeers);
        assert_eq!(req.on_peer("p1").target, QueryTarget::Peer("p1".into()));
    }

    #[test]
    fn identifier_is_prepended_by_default() {
        let req = WriteRequest::new(["x", "y"]);
        assert_eq!(req.assemble_args("id"), vec!["id", "x", "y"]);
    }

    #[test]
    fn identifier_goes_to_requested_position() {
        let req = WriteRequest::new(["x", "y"]).with_identifier_position(1);
        assert_eq!(req.assemble_args("id"), vec!["x", "id", "y"]);
    }

    #[test]
    fn out_of_range_position_appends() {
        let req = WriteRequest::new(["x"]).with_identifier_position(9);
        assert_eq!(req.assemble_args("id"), vec!["x", "id"]);
    }

    #[test]
    fn record_key_follows_autogenerate_flag() {
        let tx = TransactionId::derive(&[1; 24], "u");
        let explicit = WriteRequest::new(["x"]).with_record_id("doc-1");
        assert_eq!(explicit.record_key(&tx).as_deref(), Some("doc-1"));

        let auto = WriteRequest::new(["x"]).with_record_id("ignored").autogenerate_id();
        assert_eq!(auto.record_key(&tx), Some(tx.to_string()));

        let missing = WriteRequest::new(["x"]);
        assert_eq!(missing.record_key(&tx), None);
    }

    proptest! {
        #[test]
        fn assembled_args_keep_payload_order(
            payload in proptest::collection::vec("[a-z]{1,6}", 0..8),
            position in proptest::option::of(0usize..12),
        ) {
            let mut req = WriteRequest::new(payload.clone());
            req.identifier_position = position;
            let args = req.assemble_args("ID");

            prop_assert_eq!(args.len(), payload.len() + 1);
            let idx = args.iter().position(|a| a == "ID").unwrap();
            prop_assert_eq!(idx, position.unwrap_or(0).min(payload.len()));

            let without: Vec<String> = args
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .map(|(_, a)| a.clone())
                .collect();
            prop_assert_eq!(without, payload);
        }
    }
}
