//! Governance payloads.
//!
//! ```markdown
//! 0   [32]uint8   module, ASCII name left-padded with zeroes
//! 32  uint8       action id
//! 33  []uint8     action-specific fields
//! ```
//!
//! | module      | id | action                             |
//! |-------------|----|------------------------------------|
//! | Core        | 1  | ContractUpgrade                    |
//! | Core        | 2  | UpdateGuardianSet                  |
//! | Core        | 3  | SetMessageFee                      |
//! | Core        | 4  | SubmitTransferFee                  |
//! | Core        | 5  | UpdateMinimalConsistencyLevel      |
//! | TokenBridge | 1  | RegisterChain                      |
//! | TokenBridge | 2  | ContractUpgrade                    |
//! | TokenBridge | 3  | DestroyUnexecutedSequenceContracts |

use primitive_types::U256;

use super::module_tag;
use crate::{Address, Chain, GuardianAddress, GuardianSet, MalformedInput, Reader, Writer};

const CORE_TAG: [u8; 32] = module_tag(b"Core");
const TOKEN_BRIDGE_TAG: [u8; 32] = module_tag(b"TokenBridge");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    Core,
    TokenBridge,
}

impl Module {
    pub const fn tag(self) -> [u8; 32] {
        match self {
            Module::Core => CORE_TAG,
            Module::TokenBridge => TOKEN_BRIDGE_TAG,
        }
    }

    pub fn from_tag(tag: &[u8; 32]) -> Option<Self> {
        if *tag == CORE_TAG {
            Some(Module::Core)
        } else if *tag == TOKEN_BRIDGE_TAG {
            Some(Module::TokenBridge)
        } else {
            None
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Module::Core => "Core",
            Module::TokenBridge => "TokenBridge",
        }
    }
}

/// New contract code, optionally with a state migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractUpgrade {
    pub code: Vec<u8>,
    pub migration: Option<StateMigration>,
}

/// Replacement state for an upgrade. The executor only accepts it if the keccak256 hash of the
/// state it currently persists equals `prev_state_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMigration {
    pub prev_state_hash: [u8; 32],
    pub immutable_state: Vec<u8>,
    pub mutable_state: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ContractUpgrade(ContractUpgrade),
    UpdateGuardianSet(GuardianSet),
    SetMessageFee {
        fee: U256,
    },
    SubmitTransferFee {
        amount: U256,
        recipient: Address,
    },
    UpdateMinimalConsistencyLevel {
        level: u8,
    },
    RegisterChain {
        chain: Chain,
        emitter_address: Address,
    },
    /// Removes overflow records of the inbound channel for `chain` that are known never to
    /// complete. `Chain::Any` selects the governance channel. Each offset is the first sequence
    /// of the block the record covers.
    DestroyUnexecutedSequenceContracts {
        chain: Chain,
        block_offsets: Vec<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernancePacket {
    pub module: Module,
    pub action: Action,
}

impl GovernancePacket {
    pub fn decode(payload: &[u8]) -> Result<Self, MalformedInput> {
        let mut r = Reader::new(payload);

        let module = Module::from_tag(&r.read_array()?).ok_or(MalformedInput::UnknownModule)?;
        let id = r.read_u8()?;

        let action = match (module, id) {
            (Module::Core, 1) | (Module::TokenBridge, 2) => {
                Action::ContractUpgrade(decode_contract_upgrade(&mut r)?)
            }
            (Module::Core, 2) => {
                let index = r.read_u32()?;
                let size = r.read_u8()?;
                let addresses = (0..size)
                    .map(|_| r.read_array().map(GuardianAddress))
                    .collect::<Result<Vec<_>, _>>()?;
                Action::UpdateGuardianSet(GuardianSet::new(index, addresses)?)
            }
            (Module::Core, 3) => Action::SetMessageFee {
                fee: r.read_u256()?,
            },
            (Module::Core, 4) => Action::SubmitTransferFee {
                amount: r.read_u256()?,
                recipient: r.read_address()?,
            },
            (Module::Core, 5) => Action::UpdateMinimalConsistencyLevel {
                level: r.read_u8()?,
            },
            (Module::TokenBridge, 1) => Action::RegisterChain {
                chain: r.read_concrete_chain("remote chain")?,
                emitter_address: r.read_address()?,
            },
            (Module::TokenBridge, 3) => {
                let chain = r.read_chain()?;
                let count = r.read_u16()?;
                let block_offsets = (0..count)
                    .map(|_| r.read_u64())
                    .collect::<Result<Vec<_>, _>>()?;
                Action::DestroyUnexecutedSequenceContracts {
                    chain,
                    block_offsets,
                }
            }
            (module, action) => {
                return Err(MalformedInput::UnknownAction {
                    module: module.name(),
                    action,
                })
            }
        };

        r.finish()?;

        Ok(GovernancePacket { module, action })
    }

    pub fn encode(&self) -> Result<Vec<u8>, MalformedInput> {
        let mut w = Writer::default();
        let _ = w.bytes(&self.module.tag());

        match (&self.action, self.module) {
            (Action::ContractUpgrade(upgrade), Module::Core) => {
                let _ = w.u8(1);
                encode_contract_upgrade(&mut w, upgrade)?;
            }
            (Action::ContractUpgrade(upgrade), Module::TokenBridge) => {
                let _ = w.u8(2);
                encode_contract_upgrade(&mut w, upgrade)?;
            }
            (Action::UpdateGuardianSet(set), Module::Core) => {
                let size = u8::try_from(set.addresses.len())
                    .map_err(|_| MalformedInput::TooLong("guardian set", set.addresses.len()))?;
                let _ = w.u8(2).u32(set.index).u8(size);
                for a in &set.addresses {
                    let _ = w.bytes(&a.0);
                }
            }
            (Action::SetMessageFee { fee }, Module::Core) => {
                let _ = w.u8(3).u256(fee);
            }
            (Action::SubmitTransferFee { amount, recipient }, Module::Core) => {
                let _ = w.u8(4).u256(amount).bytes(&recipient.0);
            }
            (Action::UpdateMinimalConsistencyLevel { level }, Module::Core) => {
                let _ = w.u8(5).u8(*level);
            }
            (
                Action::RegisterChain {
                    chain,
                    emitter_address,
                },
                Module::TokenBridge,
            ) => {
                let _ = w.u8(1).chain(*chain).bytes(&emitter_address.0);
            }
            (
                Action::DestroyUnexecutedSequenceContracts {
                    chain,
                    block_offsets,
                },
                Module::TokenBridge,
            ) => {
                let count = u16::try_from(block_offsets.len())
                    .map_err(|_| MalformedInput::TooLong("block offsets", block_offsets.len()))?;
                let _ = w.u8(3).chain(*chain).u16(count);
                for o in block_offsets {
                    let _ = w.u64(*o);
                }
            }
            (_, module) => {
                return Err(MalformedInput::UnknownAction {
                    module: module.name(),
                    action: 0,
                })
            }
        }

        Ok(w.into_vec())
    }
}

fn decode_contract_upgrade(r: &mut Reader) -> Result<ContractUpgrade, MalformedInput> {
    let code = r.read_u16_prefixed()?.to_vec();

    let migration = if r.is_empty() {
        None
    } else {
        Some(StateMigration {
            prev_state_hash: r.read_array()?,
            immutable_state: r.read_u16_prefixed()?.to_vec(),
            mutable_state: r.read_u16_prefixed()?.to_vec(),
        })
    };

    Ok(ContractUpgrade { code, migration })
}

fn encode_contract_upgrade(w: &mut Writer, upgrade: &ContractUpgrade) -> Result<(), MalformedInput> {
    let _ = w.u16_prefixed("code", &upgrade.code)?;
    if let Some(m) = &upgrade.migration {
        let _ = w
            .bytes(&m.prev_state_hash)
            .u16_prefixed("immutable state", &m.immutable_state)?
            .u16_prefixed("mutable state", &m.mutable_state)?;
    }
    Ok(())
}
