//! Token bridge payloads. These are decoded here and handed to the action executor that owns the
//! custody logic; nothing in this module moves funds.
//!
//! ```markdown
//! Transfer (payload id 1):
//! 0    uint256     amount
//! 32   [32]uint8   token address
//! 64   uint16      token chain
//! 66   [32]uint8   recipient
//! 98   uint256     arbiter fee
//! 130  uint8       routing kind       (optional)
//! 131  [32]uint8   target channel     (optional)
//!
//! AttestToken (payload id 2):
//! 0    [32]uint8   token address
//! 32   uint16      token chain
//! 34   uint8       decimals
//! 35   [32]uint8   symbol (UTF-8, zero padded)
//! 67   [32]uint8   name (UTF-8, zero padded)
//! ```

use primitive_types::U256;

use crate::{Address, Chain, MalformedInput, Reader, Writer};

const TRANSFER: u8 = 1;
const ATTEST_TOKEN: u8 = 2;

/// Forwards a transfer to a further channel once it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPostfix {
    pub kind: u8,
    pub target_channel: [u8; 32],
}

/// A lock-up or burn on the sending chain that the receiving chain should mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub amount: U256,

    /// Address of the token on its origin chain. Left-zero-padded if shorter than 32 bytes.
    pub token_address: Address,

    /// Origin chain of the token. Never `Chain::Any`.
    pub token_chain: Chain,

    pub recipient: Address,

    /// Portion of `amount` the sender is willing to pay whoever relays the transfer.
    pub arbiter_fee: U256,

    pub routing: Option<RoutingPostfix>,
}

/// Metadata of a token on its origin chain, used to create the wrapped representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestToken {
    pub token_address: Address,
    pub token_chain: Chain,
    pub decimals: u8,
    pub symbol: [u8; 32],
    pub name: [u8; 32],
}

impl AttestToken {
    pub fn symbol(&self) -> String {
        fixed_utf8(&self.symbol)
    }

    pub fn name(&self) -> String {
        fixed_utf8(&self.name)
    }
}

// Strips the zero padding and replaces invalid UTF-8 instead of failing on it.
fn fixed_utf8(field: &[u8; 32]) -> String {
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenMessage {
    Transfer(Transfer),
    AttestToken(AttestToken),
}

impl TokenMessage {
    pub fn decode(payload: &[u8]) -> Result<Self, MalformedInput> {
        let mut r = Reader::new(payload);

        let msg = match r.read_u8()? {
            TRANSFER => {
                let amount = r.read_u256()?;
                let token_address = r.read_address()?;
                let token_chain = r.read_concrete_chain("token chain")?;
                let recipient = r.read_address()?;
                let arbiter_fee = r.read_u256()?;
                let routing = if r.is_empty() {
                    None
                } else {
                    Some(RoutingPostfix {
                        kind: r.read_u8()?,
                        target_channel: r.read_array()?,
                    })
                };

                TokenMessage::Transfer(Transfer {
                    amount,
                    token_address,
                    token_chain,
                    recipient,
                    arbiter_fee,
                    routing,
                })
            }
            ATTEST_TOKEN => TokenMessage::AttestToken(AttestToken {
                token_address: r.read_address()?,
                token_chain: r.read_concrete_chain("token chain")?,
                decimals: r.read_u8()?,
                symbol: r.read_array()?,
                name: r.read_array()?,
            }),
            id => return Err(MalformedInput::UnknownPayload(id)),
        };

        r.finish()?;

        Ok(msg)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::default();

        match self {
            TokenMessage::Transfer(t) => {
                let _ = w
                    .u8(TRANSFER)
                    .u256(&t.amount)
                    .bytes(&t.token_address.0)
                    .chain(t.token_chain)
                    .bytes(&t.recipient.0)
                    .u256(&t.arbiter_fee);
                if let Some(routing) = &t.routing {
                    let _ = w.u8(routing.kind).bytes(&routing.target_channel);
                }
            }
            TokenMessage::AttestToken(a) => {
                let _ = w
                    .u8(ATTEST_TOKEN)
                    .bytes(&a.token_address.0)
                    .chain(a.token_chain)
                    .u8(a.decimals)
                    .bytes(&a.symbol)
                    .bytes(&a.name);
            }
        }

        w.into_vec()
    }
}
