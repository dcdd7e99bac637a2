use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transaction::TransactionId;

/// Terminal status of a transaction as seen by the client.
///
/// `Valid` and `Invalid` come from the peer's event stream. The set of
/// invalid codes belongs to the ledger network and is passed through
/// verbatim. `Timeout` is produced locally when no notification arrived in
/// time: the transaction may still commit later.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommitStatus {
    Valid,
    Invalid(String),
    Timeout,
}

impl CommitStatus {
    pub const VALID_CODE: &'static str = "VALID";
    pub const TIMEOUT_CODE: &'static str = "TIMEOUT";

    /// Map a peer-reported validation code.
    pub fn from_code(code: &str) -> Self {
        match code {
            Self::VALID_CODE => Self::Valid,
            Self::TIMEOUT_CODE => Self::Timeout,
            other => Self::Invalid(other.to_string()),
        }
    }

    pub fn as_code(&self) -> &str {
        match self {
            Self::Valid => Self::VALID_CODE,
            Self::Invalid(code) => code,
            Self::Timeout => Self::TIMEOUT_CODE,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<String> for CommitStatus {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<CommitStatus> for String {
    fn from(status: CommitStatus) -> Self {
        status.as_code().to_string()
    }
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Single-fire commit notification for one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub transaction_id: TransactionId,
    pub status: CommitStatus,
    /// Block the transaction landed in; absent for local timeouts.
    pub block_number: Option<u64>,
}

impl CommitEvent {
    pub fn new(transaction_id: TransactionId, status: CommitStatus, block_number: u64) -> Self {
        Self {
            transaction_id,
            status,
            block_number: Some(block_number),
        }
    }

    /// The sentinel produced when the wait timer wins the race.
    pub fn timeout(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            status: CommitStatus::Timeout,
            block_number: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_both_ways() {
        assert_eq!(CommitStatus::from_code("VALID"), CommitStatus::Valid);
        assert_eq!(CommitStatus::from_code("TIMEOUT"), CommitStatus::Timeout);
        let mvcc = CommitStatus::from_code("MVCC_READ_CONFLICT");
        assert_eq!(mvcc, CommitStatus::Invalid("MVCC_READ_CONFLICT".into()));
        assert_eq!(mvcc.as_code(), "MVCC_READ_CONFLICT");
    }

    #[test]
    fn serializes_as_plain_code() {
        let json = serde_json::to_string(&CommitStatus::Valid).unwrap();
        assert_eq!(json, "\"VALID\"");
        let parsed: CommitStatus = serde_json::from_str("\"ENDORSEMENT_POLICY_FAILURE\"").unwrap();
        assert_eq!(
            parsed,
            CommitStatus::Invalid("ENDORSEMENT_POLICY_FAILURE".into())
        );
    }

    #[test]
    fn timeout_event_has_no_block() {
        let tx = TransactionId::derive(&[3; 24], "u");
        let event = CommitEvent::timeout(tx.clone());
        assert!(event.status.is_timeout());
        assert_eq!(event.block_number, None);
        assert_eq!(event.transaction_id, tx);
    }
}
