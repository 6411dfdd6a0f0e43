//! The bridge state machine: guardian sets, governance, registered emitters and one sequence
//! window per remote chain.

use std::collections::BTreeMap;

use log::info;
use primitive_types::U256;
use sequence_window::{
    ChannelId, CollateralVault, OverflowEvent, OverflowLedger, SequenceWindow,
};
use serde::{Deserialize, Serialize};
use wormhole_vaas::{
    payload::{Action, ContractUpgrade, Module, TokenMessage},
    verify_vaa, Address, Chain, Digest, GuardianSetRegistry, Vaa,
};

use crate::{
    upgrade::{check_migration, state_hash},
    Admission, Config, Error, GovernanceDispatcher, GovernanceVaa,
};

/// Side effects of governance actions that leave the bridge.
pub trait ActionExecutor {
    fn transfer_fee(&mut self, amount: U256, recipient: Address) -> Result<(), Error>;

    /// Installs new code. A state migration, if any, has already been checked against the
    /// persisted state.
    fn upgrade(&mut self, module: Module, upgrade: &ContractUpgrade) -> Result<(), Error>;
}

/// Everything the bridge persists. Upgrade migrations are checked against the hash of this.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BridgeState {
    pub guardians: GuardianSetRegistry,
    pub governance: GovernanceDispatcher,
    pub message_fee: U256,
    pub minimal_consistency_level: u8,
    /// Registered token bridge emitter per remote chain id.
    pub emitters: BTreeMap<u16, Address>,
    /// Inbound window per remote chain id, created on the first message.
    pub windows: BTreeMap<u16, SequenceWindow>,
    pub overflow: OverflowLedger,
}

/// A verified, admitted token bridge message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub emitter_chain: Chain,
    pub sequence: u64,
    pub digest: Digest,
    pub message: TokenMessage,
}

pub struct Bridge<V> {
    identity: [u8; 32],
    chain: Chain,
    guardian_set_expiry: u64,
    overflow_collateral: u128,
    state: BridgeState,
    vault: V,
}

impl<V: CollateralVault + Clone> Bridge<V> {
    pub fn new(config: &Config, vault: V) -> Result<Self, Error> {
        config.validate()?;

        let identity = identity(config.chain_id);
        let governance =
            GovernanceDispatcher::from_config(config, governance_channel(&identity))?;

        Ok(Bridge {
            identity,
            chain: config.chain(),
            guardian_set_expiry: config.guardian_set_expiry,
            overflow_collateral: config.overflow_collateral,
            state: BridgeState {
                guardians: GuardianSetRegistry::new(config.guardian_set()?),
                governance,
                message_fee: config.message_fee.unwrap_or_default(),
                minimal_consistency_level: config.minimal_consistency_level.unwrap_or_default(),
                emitters: BTreeMap::new(),
                windows: BTreeMap::new(),
                overflow: OverflowLedger::new(),
            },
            vault,
        })
    }

    /// Resumes from a persisted state. The configuration supplies everything that is not state.
    pub fn restore(config: &Config, state: BridgeState, vault: V) -> Result<Self, Error> {
        let mut bridge = Self::new(config, vault)?;
        bridge.state = state;
        Ok(bridge)
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    pub fn state_hash(&self) -> Result<[u8; 32], Error> {
        state_hash(&self.state)
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn guardians(&self) -> &GuardianSetRegistry {
        &self.state.guardians
    }

    pub fn message_fee(&self) -> U256 {
        self.state.message_fee
    }

    pub fn minimal_consistency_level(&self) -> u8 {
        self.state.minimal_consistency_level
    }

    pub fn emitter(&self, chain: Chain) -> Option<&Address> {
        self.state.emitters.get(&u16::from(chain))
    }

    pub fn window(&self, chain: Chain) -> Option<&SequenceWindow> {
        self.state.windows.get(&u16::from(chain))
    }

    pub fn overflow(&self) -> &OverflowLedger {
        &self.state.overflow
    }

    /// The inbound channel for messages from `chain`. Overflow collateral of that channel is
    /// reserved from the vault under this id.
    pub fn channel(&self, chain: Chain) -> ChannelId {
        ChannelId::for_chain(&self.identity, chain.into())
    }

    pub fn governance_channel(&self) -> ChannelId {
        governance_channel(&self.identity)
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn vault_mut(&mut self) -> &mut V {
        &mut self.vault
    }

    pub fn drain_events(&mut self) -> Vec<OverflowEvent> {
        self.state.overflow.drain_events()
    }

    /// Verifies, admits and executes a governance VAA. On any error the bridge and the vault are
    /// left as they were before the call.
    pub fn submit_governance(
        &mut self,
        data: &[u8],
        now: u64,
        executor: &mut dyn ActionExecutor,
    ) -> Result<Admission<Action>, Error> {
        let vaa = Vaa::decode(data)?;

        let saved = (self.state.clone(), self.vault.clone());
        let res = self.apply_governance(&vaa, &saved.0, now, executor);
        if res.is_err() {
            (self.state, self.vault) = saved;
        }

        res
    }

    fn apply_governance(
        &mut self,
        vaa: &Vaa,
        persisted: &BridgeState,
        now: u64,
        executor: &mut dyn ActionExecutor,
    ) -> Result<Admission<Action>, Error> {
        let state = &mut self.state;
        let admission = state.governance.apply(
            vaa,
            &state.guardians,
            now,
            &mut state.overflow,
            &mut self.vault,
        )?;

        let GovernanceVaa { packet, .. } = match admission {
            Admission::Admitted(gov) => gov,
            Admission::Pending => return Ok(Admission::Pending),
        };

        match &packet.action {
            Action::UpdateGuardianSet(set) => {
                state
                    .guardians
                    .rotate(set.clone(), self.guardian_set_expiry, now)?;
            }
            Action::SetMessageFee { fee } => {
                info!("message fee set to {fee}");
                state.message_fee = *fee;
            }
            Action::UpdateMinimalConsistencyLevel { level } => {
                info!("minimal consistency level set to {level}");
                state.minimal_consistency_level = *level;
            }
            Action::RegisterChain {
                chain,
                emitter_address,
            } => {
                let key = u16::from(*chain);
                if state.emitters.contains_key(&key) {
                    return Err(Error::ChainAlreadyRegistered(*chain));
                }
                info!("registered emitter {emitter_address} for chain {chain}");
                let _ = state.emitters.insert(key, *emitter_address);
            }
            Action::DestroyUnexecutedSequenceContracts {
                chain,
                block_offsets,
            } => {
                let channel = match chain {
                    Chain::Any => governance_channel(&self.identity),
                    remote => ChannelId::for_chain(&self.identity, (*remote).into()),
                };
                let window = SequenceWindow::new(channel, self.overflow_collateral);
                for offset in block_offsets {
                    window.destroy(U256::from(*offset), &mut state.overflow, &mut self.vault)?;
                }
            }
            Action::SubmitTransferFee { amount, recipient } => {
                executor.transfer_fee(*amount, *recipient)?;
            }
            Action::ContractUpgrade(upgrade) => {
                if let Some(migration) = &upgrade.migration {
                    check_migration(state_hash(persisted)?, migration)?;
                }
                executor.upgrade(packet.module, upgrade)?;
            }
        }

        Ok(Admission::Admitted(packet.action))
    }

    /// Verifies and admits a token bridge message from a registered emitter.
    pub fn receive_message(&mut self, data: &[u8], now: u64) -> Result<Admission<Delivery>, Error> {
        let vaa = Vaa::decode(data)?;
        let body = &vaa.body;

        let digest = verify_vaa(&vaa, &self.state.guardians, now)?;

        if self.emitter(body.emitter_chain) != Some(&body.emitter_address) {
            return Err(Error::UnregisteredEmitter(
                body.emitter_chain,
                body.emitter_address,
            ));
        }
        if body.target_chain != self.chain {
            return Err(Error::WrongTargetChain(body.target_chain));
        }
        if body.consistency_level < self.state.minimal_consistency_level {
            return Err(Error::ConsistencyTooLow {
                required: self.state.minimal_consistency_level,
                actual: body.consistency_level,
            });
        }

        let message = TokenMessage::decode(&body.payload)?;

        // A rejected sequence must not leave a new window behind.
        let key = u16::from(body.emitter_chain);
        let mut window = match self.state.windows.get(&key) {
            Some(w) => w.clone(),
            None => SequenceWindow::new(self.channel(body.emitter_chain), self.overflow_collateral),
        };
        let admitted = window.check(
            U256::from(body.sequence),
            &mut self.state.overflow,
            &mut self.vault,
        )?;
        let _ = self.state.windows.insert(key, window);
        if !admitted {
            return Ok(Admission::Pending);
        }

        info!(
            "delivered message {} from {}",
            body.sequence, body.emitter_chain
        );

        Ok(Admission::Admitted(Delivery {
            emitter_chain: body.emitter_chain,
            sequence: body.sequence,
            digest,
            message,
        }))
    }
}

fn identity(chain_id: u16) -> [u8; 32] {
    ChannelId::derive(&Module::TokenBridge.tag(), &[&chain_id.to_be_bytes()]).0
}

fn governance_channel(identity: &[u8; 32]) -> ChannelId {
    ChannelId::derive(identity, &[&b"governance"[..]])
}
