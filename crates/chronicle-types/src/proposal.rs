use serde::{Deserialize, Serialize};

use crate::peer::PeerHandle;
use crate::transaction::TransactionId;

/// Status a peer reports for a successful endorsement.
pub const ENDORSEMENT_OK: u32 = 200;

/// Status the ordering service reports when it accepted a transaction.
pub const ORDERING_SUCCESS: &str = "SUCCESS";

/// A contract function invocation: target plus ordered string arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub contract: String,
    pub function: String,
    pub args: Vec<String>,
}

impl ContractCall {
    pub fn new(
        contract: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            contract: contract.into(),
            function: function.into(),
            args,
        }
    }
}

/// Endorsement proposal addressed to one peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub transaction_id: TransactionId,
    pub call: ContractCall,
}

/// A peer's answer to an endorsement proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementResponse {
    pub status: u32,
    pub message: String,
    /// Bytes the contract returned from the simulated execution.
    pub payload: Vec<u8>,
}

impl EndorsementResponse {
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            status: ENDORSEMENT_OK,
            message: String::new(),
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ENDORSEMENT_OK
    }
}

/// A proposal together with the endorsement it collected, ready for ordering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsedTransaction {
    pub proposal: ProposalRequest,
    pub peer: PeerHandle,
    pub response: EndorsementResponse,
}

impl EndorsedTransaction {
    pub fn transaction_id(&self) -> &TransactionId {
        &self.proposal.transaction_id
    }
}

/// Acknowledgement from the ordering service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingResult {
    pub status: String,
    pub info: String,
}

impl OrderingResult {
    pub fn success() -> Self {
        Self {
            status: ORDERING_SUCCESS.into(),
            info: String::new(),
        }
    }

    pub fn rejected(status: impl Into<String>, info: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            info: info.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ORDERING_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endorsement_status_check() {
        assert!(EndorsementResponse::ok(vec![]).is_success());
        let denied = EndorsementResponse {
            status: 500,
            message: "chaincode error".into(),
            payload: vec![],
        };
        assert!(!denied.is_success());
    }

    #[test]
    fn ordering_status_check() {
        assert!(OrderingResult::success().is_success());
        assert!(!OrderingResult::rejected("SERVICE_UNAVAILABLE", "no leader").is_success());
    }
}
