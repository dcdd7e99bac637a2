use std::sync::Arc;

use tracing::debug;

use chronicle_session::LedgerSession;
use chronicle_types::{
    ContractCall, EndorsedTransaction, PeerHandle, ProposalRequest, TransactionId, WriteRequest,
};

use crate::config::EngineConfig;
use crate::error::{peer_reason, EngineError, EngineResult};

/// A proposal that collected a successful endorsement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndorsedProposal {
    pub transaction: EndorsedTransaction,
    /// Identifier the record is stored under, when the call carries one.
    pub record_id: Option<String>,
}

impl EndorsedProposal {
    pub fn transaction_id(&self) -> &TransactionId {
        self.transaction.transaction_id()
    }

    pub fn peer(&self) -> &PeerHandle {
        &self.transaction.peer
    }

    /// Result the contract returned from the simulated execution.
    pub fn payload(&self) -> &[u8] {
        &self.transaction.response.payload
    }
}

/// Builds endorsement proposals and judges the peer's answer.
///
/// Each call mints a fresh transaction id; nothing is retried here.
#[derive(Clone, Debug)]
pub struct ProposalSubmitter {
    config: Arc<EngineConfig>,
}

impl ProposalSubmitter {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Contract call for `request`, with the record identifier spliced in.
    pub fn build_call(&self, request: &WriteRequest, identifier: &str) -> ContractCall {
        ContractCall::new(
            self.config.contract_for(request.contract.as_deref()),
            request
                .function
                .as_deref()
                .unwrap_or(&self.config.write_function),
            request.assemble_args(identifier),
        )
    }

    /// Propose a record write to `peer`.
    pub async fn propose(
        &self,
        session: &dyn LedgerSession,
        peer: &PeerHandle,
        request: &WriteRequest,
    ) -> EngineResult<EndorsedProposal> {
        let transaction_id = TransactionId::generate(session.creator());
        let record_id = request.record_key(&transaction_id).ok_or_else(|| {
            EngineError::precondition("a record id is required unless it is autogenerated")
        })?;
        let call = self.build_call(request, &record_id);
        let transaction = self.endorse(session, peer, transaction_id, call).await?;
        Ok(EndorsedProposal {
            transaction,
            record_id: Some(record_id),
        })
    }

    /// Propose an arbitrary contract call to `peer`, arguments untouched.
    pub async fn propose_call(
        &self,
        session: &dyn LedgerSession,
        peer: &PeerHandle,
        call: ContractCall,
    ) -> EngineResult<EndorsedProposal> {
        let transaction_id = TransactionId::generate(session.creator());
        let transaction = self.endorse(session, peer, transaction_id, call).await?;
        Ok(EndorsedProposal {
            transaction,
            record_id: None,
        })
    }

    async fn endorse(
        &self,
        session: &dyn LedgerSession,
        peer: &PeerHandle,
        transaction_id: TransactionId,
        call: ContractCall,
    ) -> EngineResult<EndorsedTransaction> {
        let proposal = ProposalRequest {
            transaction_id,
            call,
        };
        debug!(
            peer = %peer,
            tx_id = proposal.transaction_id.short_id(),
            function = %proposal.call.function,
            "sending proposal"
        );

        let response = session
            .send_endorsement_proposal(peer, &proposal)
            .await
            .map_err(|err| EngineError::proposal_rejected(&peer.name, peer_reason(err)))?;

        if !response.is_success() {
            return Err(EngineError::proposal_rejected(
                &peer.name,
                format!("endorsement status {}: {}", response.status, response.message),
            ));
        }

        Ok(EndorsedTransaction {
            proposal,
            peer: peer.clone(),
            response,
        })
    }
}
