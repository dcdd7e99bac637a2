use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::CommitStatus;
use crate::proposal::ContractCall;
use crate::transaction::TransactionId;

/// Ledger record of a transaction, as returned by a peer's transaction
/// lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    pub validation_code: CommitStatus,
    pub block_number: u64,
    pub transaction_envelope: TransactionEnvelope,
}

impl ProcessedTransaction {
    /// Commit timestamp stamped into the channel header, if the peer
    /// returned one.
    pub fn commit_timestamp(&self) -> Option<DateTime<Utc>> {
        self.transaction_envelope.payload.header.channel_header.timestamp
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_envelope.payload.header.channel_header.tx_id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub payload: EnvelopePayload,
    #[serde(default)]
    pub signature: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopePayload {
    pub header: Header,
    /// The contract invocation carried by the transaction.
    pub data: ContractCall,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub channel_header: ChannelHeader,
    pub signature_header: SignatureHeader,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHeader {
    /// Header type, e.g. `ENDORSER_TRANSACTION`.
    #[serde(rename = "type")]
    pub kind: String,
    pub channel_id: String,
    pub tx_id: TransactionId,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureHeader {
    pub creator: String,
    #[serde(default)]
    pub nonce: Vec<u8>,
}
