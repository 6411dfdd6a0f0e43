//! Governance VAA admission.
//!
//! A governance VAA is handed to the executor only after its emitter, its signatures by the current
//! guardian set, its payload and its target chain all check out, and its sequence has been admitted for the first time.
//! Any rejection leaves the governance channel untouched, so a corrected submission of the same
//! sequence can still go through.

use log::{info, warn};
use primitive_types::U256;
use sequence_window::{
    ChannelId, CollateralVault, OverflowLedger, ReplayGuard, SequenceCounter, SequenceWindow,
};
use serde::{Deserialize, Serialize};
use wormhole_vaas::{
    payload::GovernancePacket, verify_vaa, Address, Chain, Digest, GuardianSetRegistry, Vaa,
    VerificationError,
};

use crate::{config::GovernanceOrdering, Config, Error};

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<T> {
    /// Admitted for the first time.
    Admitted(T),
    /// The sequence is ahead of the channel's window, which has moved one block towards it.
    /// Submit again.
    Pending,
}

/// A verified and admitted governance action, ready for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceVaa {
    pub packet: GovernancePacket,
    pub sequence: u64,
    pub digest: Digest,
}

/// Replay protection of the governance channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceGuard {
    Strict(SequenceCounter),
    Window(SequenceWindow),
}

impl GovernanceGuard {
    fn as_replay_guard(&mut self) -> &mut dyn ReplayGuard {
        match self {
            GovernanceGuard::Strict(counter) => counter,
            GovernanceGuard::Window(window) => window,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GovernanceDispatcher {
    chain: Chain,
    emitter_chain: Chain,
    emitter_address: Address,
    guard: GovernanceGuard,
}

impl GovernanceDispatcher {
    pub fn new(
        chain: Chain,
        emitter_chain: Chain,
        emitter_address: Address,
        guard: GovernanceGuard,
    ) -> Self {
        GovernanceDispatcher {
            chain,
            emitter_chain,
            emitter_address,
            guard,
        }
    }

    /// `channel` identifies the governance window when `Window` ordering is configured.
    pub fn from_config(config: &Config, channel: ChannelId) -> Result<Self, Error> {
        let guard = match config.governance_ordering {
            GovernanceOrdering::Strict => GovernanceGuard::Strict(SequenceCounter::default()),
            GovernanceOrdering::Window => GovernanceGuard::Window(SequenceWindow::new(
                channel,
                config.overflow_collateral,
            )),
        };

        Ok(Self::new(
            config.chain(),
            config.governance_chain(),
            config.governance_emitter()?,
            guard,
        ))
    }

    pub fn guard(&self) -> &GovernanceGuard {
        &self.guard
    }

    pub fn apply(
        &mut self,
        vaa: &Vaa,
        registry: &GuardianSetRegistry,
        now: u64,
        ledger: &mut OverflowLedger,
        vault: &mut dyn CollateralVault,
    ) -> Result<Admission<GovernanceVaa>, Error> {
        let res = self.try_apply(vaa, registry, now, ledger, vault);

        match &res {
            Ok(Admission::Admitted(gov)) => info!(
                "governance VAA {} admitted: {} {:?}",
                gov.sequence,
                gov.packet.module.name(),
                gov.packet.action
            ),
            Ok(Admission::Pending) => info!(
                "governance VAA {} is ahead of the window, resubmit",
                vaa.body.sequence
            ),
            Err(e) => warn!(
                "rejected governance VAA {} from {}: {e}",
                vaa.body.sequence, vaa.body.emitter_chain
            ),
        }

        res
    }

    fn try_apply(
        &mut self,
        vaa: &Vaa,
        registry: &GuardianSetRegistry,
        now: u64,
        ledger: &mut OverflowLedger,
        vault: &mut dyn CollateralVault,
    ) -> Result<Admission<GovernanceVaa>, Error> {
        let body = &vaa.body;
        if body.emitter_chain != self.emitter_chain || body.emitter_address != self.emitter_address
        {
            return Err(Error::InvalidGovernanceEmitter(
                body.emitter_chain,
                body.emitter_address,
            ));
        }

        let digest = verify_vaa(vaa, registry, now)?;
        // Only the current set governs. The outgoing one still verifies messages until expiry.
        if vaa.guardian_set_index != registry.current().index {
            return Err(VerificationError::NotCurrentGuardianSet(vaa.guardian_set_index).into());
        }

        let packet = GovernancePacket::decode(&body.payload)?;

        if body.target_chain != self.chain && body.target_chain != Chain::Any {
            return Err(Error::WrongTargetChain(body.target_chain));
        }

        let admitted =
            self.guard
                .as_replay_guard()
                .admit(U256::from(body.sequence), ledger, vault)?;
        if !admitted {
            return Ok(Admission::Pending);
        }

        Ok(Admission::Admitted(GovernanceVaa {
            packet,
            sequence: body.sequence,
            digest,
        }))
    }
}
