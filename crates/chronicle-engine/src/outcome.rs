use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use chronicle_types::{CommitStatus, ProcessedTransaction, TransactionId};

use crate::error::EngineError;
use crate::retry::AttemptReport;

// ---------------------------------------------------------------------------
// WriteOutcome
// ---------------------------------------------------------------------------

/// Result of a record write: the last attempt's view of the transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub succeeded: bool,
    pub transaction_id: Option<TransactionId>,
    pub record_id: Option<String>,
    /// Peer that endorsed and reported the commit.
    pub peer: Option<String>,
    pub commit_status: Option<CommitStatus>,
    pub block_number: Option<u64>,
    /// Contract result from the endorsement; the sandbox contract returns a
    /// provisional timestamp here.
    #[serde(serialize_with = "lossy_text")]
    pub payload: Vec<u8>,
    pub attempts: u32,
    pub error: Option<EngineError>,
}

impl WriteOutcome {
    /// A write that never reached the network or never got endorsed.
    pub fn failed(error: EngineError) -> Self {
        Self {
            succeeded: false,
            transaction_id: None,
            record_id: None,
            peer: None,
            commit_status: None,
            block_number: None,
            payload: Vec::new(),
            attempts: 0,
            error: Some(error),
        }
    }

    /// The endorsement payload as text.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Committed, but not observed before the deadline.
    pub fn is_pending(&self) -> bool {
        self.commit_status.as_ref().is_some_and(CommitStatus::is_timeout)
    }
}

impl AttemptReport for WriteOutcome {
    fn failure(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }
}

/// A write plus the ledger record of its transaction.
///
/// A failed detail lookup never overturns a successful write; it is only
/// reported in `detail_error`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetailedWriteOutcome {
    #[serde(flatten)]
    pub write: WriteOutcome,
    pub details: Option<ProcessedTransaction>,
    /// Commit timestamp from the transaction's channel header.
    pub timestamp: Option<DateTime<Utc>>,
    pub detail_error: Option<EngineError>,
}

impl DetailedWriteOutcome {
    pub fn without_details(write: WriteOutcome) -> Self {
        Self {
            write,
            details: None,
            timestamp: None,
            detail_error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.write.succeeded
    }
}

// ---------------------------------------------------------------------------
// QueryOutcome
// ---------------------------------------------------------------------------

/// Result of a record query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    pub succeeded: bool,
    #[serde(serialize_with = "lossy_text_opt")]
    pub payload: Option<Vec<u8>>,
    pub attempts: u32,
    pub error: Option<EngineError>,
}

impl QueryOutcome {
    pub fn found(payload: Vec<u8>, attempts: u32) -> Self {
        Self {
            succeeded: true,
            payload: Some(payload),
            attempts,
            error: None,
        }
    }

    pub fn failed(error: EngineError, attempts: u32) -> Self {
        Self {
            succeeded: false,
            payload: None,
            attempts,
            error: Some(error),
        }
    }

    pub fn payload_text(&self) -> Option<String> {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
    }

    /// One entry per queried peer when every peer failed.
    pub fn peer_errors(&self) -> &[String] {
        match &self.error {
            Some(EngineError::QueryAllPeersFailed(errors)) => errors,
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// DetailOutcome
// ---------------------------------------------------------------------------

/// Result of a transaction detail lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetailOutcome {
    pub succeeded: bool,
    pub result: Option<ProcessedTransaction>,
    pub error: Option<EngineError>,
}

impl DetailOutcome {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.result.as_ref().and_then(ProcessedTransaction::commit_timestamp)
    }
}

impl From<Result<ProcessedTransaction, EngineError>> for DetailOutcome {
    fn from(result: Result<ProcessedTransaction, EngineError>) -> Self {
        match result {
            Ok(record) => Self {
                succeeded: true,
                result: Some(record),
                error: None,
            },
            Err(err) => Self {
                succeeded: false,
                result: None,
                error: Some(err),
            },
        }
    }
}

fn lossy_text<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

fn lossy_text_opt<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(bytes) => lossy_text(bytes, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_write_serializes_error_and_empty_payload() {
        let outcome = WriteOutcome::failed(EngineError::precondition("payload must not be empty"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["succeeded"], false);
        assert_eq!(json["payload"], "");
        assert_eq!(json["error"]["kind"], "precondition");
        assert_eq!(outcome.attempts, 0);
    }

    #[test]
    fn pending_means_timeout_status() {
        let mut outcome = WriteOutcome::failed(EngineError::CommitTimedOut { timeout_ms: 5 });
        assert!(!outcome.is_pending());
        outcome.commit_status = Some(CommitStatus::Timeout);
        assert!(outcome.is_pending());
    }

    #[test]
    fn query_payload_is_text_in_json() {
        let outcome = QueryOutcome::found(b"{\"a\":1}".to_vec(), 1);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["payload"], "{\"a\":1}");
        assert!(outcome.peer_errors().is_empty());
    }

    #[test]
    fn peer_errors_come_from_the_aggregate() {
        let outcome = QueryOutcome::failed(
            EngineError::QueryAllPeersFailed(vec!["a".into(), "b".into(), "c".into()]),
            2,
        );
        assert_eq!(outcome.peer_errors().len(), 3);
        assert_eq!(outcome.payload_text(), None);
    }

    #[test]
    fn detailed_outcome_flattens_the_write() {
        let detailed = DetailedWriteOutcome::without_details(WriteOutcome::failed(
            EngineError::OrderingFailed("x".into()),
        ));
        let json = serde_json::to_value(&detailed).unwrap();
        assert_eq!(json["succeeded"], false);
        assert!(json["details"].is_null());
        assert!(!detailed.succeeded());
    }
}
