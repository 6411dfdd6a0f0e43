//! Payload codecs. Governance payloads are tagged with a 32 byte module name and a one byte
//! action id; token payloads start with a one byte payload id.

pub mod governance;
pub mod token;

pub use governance::{Action, ContractUpgrade, GovernancePacket, Module, StateMigration};
pub use token::{AttestToken, RoutingPostfix, TokenMessage, Transfer};

/// Left-pads `name` with zeroes to 32 bytes, the way governance module names are written on the
/// wire.
pub const fn module_tag(name: &[u8]) -> [u8; 32] {
    let mut tag = [0u8; 32];
    let offset = 32 - name.len();
    let mut i = 0;
    while i < name.len() {
        tag[offset + i] = name[i];
        i += 1;
    }
    tag
}
