use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use chronicle_types::{
    ChannelHeader, CommitEvent, CommitStatus, ContractCall, EndorsedTransaction, EnvelopePayload,
    Header, ProcessedTransaction, SignatureHeader, TransactionEnvelope, TransactionId,
};

const DUPLICATE_TXID: &str = "DUPLICATE_TXID";

/// World state and block log of the in-memory channel.
///
/// The sandbox contract is a plain key/value registry: every invocation
/// stores `args[1..]` (as a JSON array) under `args[0]`, and every query
/// reads the value stored under `args[0]`.
#[derive(Default)]
pub(crate) struct LedgerState {
    world: BTreeMap<(String, String), Vec<u8>>,
    transactions: HashMap<TransactionId, ProcessedTransaction>,
    height: u64,
}

impl LedgerState {
    /// Result the contract returns while simulating a write: the
    /// endorsement time, as RFC 3339 text.
    pub(crate) fn simulate(&self, now: DateTime<Utc>) -> Vec<u8> {
        now.to_rfc3339().into_bytes()
    }

    /// Append the transaction to a new block and apply it if valid.
    pub(crate) fn commit(
        &mut self,
        channel: &str,
        creator: &str,
        transaction: &EndorsedTransaction,
        status: CommitStatus,
        timestamp: DateTime<Utc>,
    ) -> CommitEvent {
        let tx_id = transaction.transaction_id().clone();
        let block_number = self.height;
        self.height += 1;

        if self.transactions.contains_key(&tx_id) {
            return CommitEvent::new(tx_id, CommitStatus::Invalid(DUPLICATE_TXID.into()), block_number);
        }

        let call = &transaction.proposal.call;
        if status.is_valid() {
            if let Some((key, values)) = call.args.split_first() {
                let value = serde_json::to_vec(values).unwrap_or_default();
                self.world
                    .insert((call.contract.clone(), key.clone()), value);
            }
        }

        let record = ProcessedTransaction {
            validation_code: status.clone(),
            block_number,
            transaction_envelope: TransactionEnvelope {
                payload: EnvelopePayload {
                    header: Header {
                        channel_header: ChannelHeader {
                            kind: "ENDORSER_TRANSACTION".into(),
                            channel_id: channel.to_string(),
                            tx_id: tx_id.clone(),
                            timestamp: Some(timestamp),
                        },
                        signature_header: SignatureHeader {
                            creator: creator.to_string(),
                            nonce: Vec::new(),
                        },
                    },
                    data: call.clone(),
                },
                signature: Vec::new(),
            },
        };
        self.transactions.insert(tx_id.clone(), record);

        CommitEvent::new(tx_id, status, block_number)
    }

    pub(crate) fn read(&self, call: &ContractCall) -> Vec<u8> {
        call.args
            .first()
            .and_then(|key| self.world.get(&(call.contract.clone(), key.clone())))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn put(&mut self, contract: &str, key: &str, value: Vec<u8>) {
        self.world.insert((contract.to_string(), key.to_string()), value);
    }

    pub(crate) fn transaction(&self, tx_id: &TransactionId) -> Option<ProcessedTransaction> {
        self.transactions.get(tx_id).cloned()
    }

    pub(crate) fn height(&self) -> u64 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_types::{EndorsementResponse, PeerHandle, ProposalRequest};

    fn endorsed(seed: u8, args: &[&str]) -> EndorsedTransaction {
        EndorsedTransaction {
            proposal: ProposalRequest {
                transaction_id: TransactionId::derive(&[seed; 24], "u"),
                call: ContractCall::new("registry", "introducir", args.iter().map(|s| s.to_string()).collect()),
            },
            peer: PeerHandle::new("peer0", "mem://peer0"),
            response: EndorsementResponse::ok(vec![]),
        }
    }

    #[test]
    fn valid_commit_updates_world_state() {
        let mut ledger = LedgerState::default();
        let tx = endorsed(1, &["doc-1", "a", "b"]);
        let event = ledger.commit("ch", "u", &tx, CommitStatus::Valid, Utc::now());
        assert_eq!(event.block_number, Some(0));

        let read = ledger.read(&ContractCall::new("registry", "consultar", vec!["doc-1".into()]));
        assert_eq!(read, br#"["a","b"]"#.to_vec());
        assert!(ledger.transaction(tx.transaction_id()).is_some());
    }

    #[test]
    fn invalid_commit_is_recorded_but_not_applied() {
        let mut ledger = LedgerState::default();
        let tx = endorsed(2, &["doc-2", "a"]);
        let event = ledger.commit("ch", "u", &tx, CommitStatus::Invalid("MVCC_READ_CONFLICT".into()), Utc::now());
        assert_eq!(event.status.as_code(), "MVCC_READ_CONFLICT");
        assert!(ledger
            .read(&ContractCall::new("registry", "consultar", vec!["doc-2".into()]))
            .is_empty());
        assert_eq!(ledger.height(), 1);
    }

    #[test]
    fn duplicate_transaction_id_is_rejected() {
        let mut ledger = LedgerState::default();
        let tx = endorsed(3, &["doc-3", "a"]);
        ledger.commit("ch", "u", &tx, CommitStatus::Valid, Utc::now());
        let again = ledger.commit("ch", "u", &tx, CommitStatus::Valid, Utc::now());
        assert_eq!(again.status, CommitStatus::Invalid("DUPLICATE_TXID".into()));
    }
}
