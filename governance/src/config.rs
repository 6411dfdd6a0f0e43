//! Bridge configuration, loaded from JSON.
//!
//! ```json
//! {
//!   "chain_id": 2,
//!   "governance_chain": 1,
//!   "governance_emitter": "0000000000000000000000000000000000000000000000000000000000000004",
//!   "guardian_set_expiry": 86400,
//!   "overflow_collateral": 1000,
//!   "initial_guardian_set": {
//!     "index": 0,
//!     "addresses": ["beFA429d57cD18b7F8A4d91A2da9AB4AF05d0FBe"]
//!   },
//!   "governance_ordering": "strict"
//! }
//! ```

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use wormhole_vaas::{Address, Chain, GuardianAddress, GuardianSet};

use crate::Error;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GuardianSetConfig {
    pub index: u32,
    /// Hex encoded 20 byte addresses, optionally `0x` prefixed.
    pub addresses: Vec<String>,
}

/// How sequences of governance VAAs are admitted.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceOrdering {
    /// Every governance VAA must carry the sequence right after the previous one.
    #[default]
    Strict,
    /// Governance VAAs may arrive in any order, each admitted at most once.
    Window,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The wormhole id of the current chain.
    pub chain_id: u16,

    /// Governance chain (typically Solana, i.e. chain id 1).
    pub governance_chain: u16,

    /// Address of the governance emitter, hex encoded 32 bytes.
    pub governance_emitter: String,

    /// Seconds a guardian set stays usable after it has been replaced.
    pub guardian_set_expiry: u64,

    /// Reserved for every overflow record a channel creates.
    pub overflow_collateral: u128,

    pub initial_guardian_set: GuardianSetConfig,

    #[serde(default)]
    pub governance_ordering: GovernanceOrdering,

    #[serde(default)]
    pub message_fee: Option<U256>,

    #[serde(default)]
    pub minimal_consistency_level: Option<u8>,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.chain_id == 0 {
            return Err(Error::InvalidConfig("chain_id must not be 0".into()));
        }
        if self.governance_chain == 0 {
            return Err(Error::InvalidConfig("governance_chain must not be 0".into()));
        }
        let _ = self.governance_emitter()?;
        let _ = self.guardian_set()?;
        Ok(())
    }

    pub fn chain(&self) -> Chain {
        Chain::from(self.chain_id)
    }

    pub fn governance_chain(&self) -> Chain {
        Chain::from(self.governance_chain)
    }

    pub fn governance_emitter(&self) -> Result<Address, Error> {
        decode_hex("governance_emitter", &self.governance_emitter).map(Address)
    }

    pub fn guardian_set(&self) -> Result<GuardianSet, Error> {
        let addresses = self
            .initial_guardian_set
            .addresses
            .iter()
            .map(|a| decode_hex("guardian address", a).map(GuardianAddress))
            .collect::<Result<Vec<_>, _>>()?;

        GuardianSet::new(self.initial_guardian_set.index, addresses)
            .map_err(|e| Error::InvalidConfig(format!("initial_guardian_set: {e}")))
    }
}

fn decode_hex<const N: usize>(what: &str, s: &str) -> Result<[u8; N], Error> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| Error::InvalidConfig(format!("{what}: {e}")))?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        Error::InvalidConfig(format!(
            "{what}: expected {N} bytes, got {}",
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const CONFIG: &str = r#"{
        "chain_id": 2,
        "governance_chain": 1,
        "governance_emitter": "0000000000000000000000000000000000000000000000000000000000000004",
        "guardian_set_expiry": 86400,
        "overflow_collateral": 1000,
        "initial_guardian_set": {
            "index": 0,
            "addresses": [
                "0xbeFA429d57cD18b7F8A4d91A2da9AB4AF05d0FBe",
                "88d7d8b32a9105d228100e72dffe2fae0705d31c"
            ]
        }
    }"#;

    #[test]
    fn parse_defaults() {
        let config = Config::from_json(CONFIG).unwrap();

        assert_eq!(Chain::Ethereum, config.chain());
        assert_eq!(Chain::Solana, config.governance_chain());
        assert_eq!(
            wormhole_vaas::GOVERNANCE_EMITTER,
            config.governance_emitter().unwrap()
        );
        assert_eq!(GovernanceOrdering::Strict, config.governance_ordering);
        assert_eq!(None, config.message_fee);

        let set = config.guardian_set().unwrap();
        assert_eq!(2, set.addresses.len());
        assert_eq!(0xbe, set.addresses[0].0[0]);
        assert_eq!(0x1c, set.addresses[1].0[19]);
    }

    #[test]
    fn parse_window_ordering_and_fee() {
        let mut json: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        json["governance_ordering"] = "window".into();
        json["message_fee"] = "0x64".into();
        json["minimal_consistency_level"] = 15.into();

        let config = Config::from_json(&json.to_string()).unwrap();
        assert_eq!(GovernanceOrdering::Window, config.governance_ordering);
        assert_eq!(Some(U256::from(100)), config.message_fee);
        assert_eq!(Some(15), config.minimal_consistency_level);
    }

    #[test]
    fn rejects_invalid() {
        let cases: [(&str, serde_json::Value); 5] = [
            ("chain_id", 0.into()),
            ("governance_chain", 0.into()),
            ("governance_emitter", "0004".into()),
            ("governance_emitter", "zz".into()),
            ("initial_guardian_set", serde_json::json!({ "index": 0, "addresses": [] })),
        ];

        for (field, value) in cases {
            let mut json: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
            json[field] = value;
            assert!(
                matches!(
                    Config::from_json(&json.to_string()),
                    Err(Error::InvalidConfig(_))
                ),
                "accepted a bad {field}"
            );
        }

        let duplicate = serde_json::json!({
            "index": 0,
            "addresses": [
                "88d7d8b32a9105d228100e72dffe2fae0705d31c",
                "88d7d8b32a9105d228100e72dffe2fae0705d31c"
            ]
        });
        let mut json: serde_json::Value = serde_json::from_str(CONFIG).unwrap();
        json["initial_guardian_set"] = duplicate;
        assert!(Config::from_json(&json.to_string()).is_err());

        assert!(matches!(
            Config::from_json("{}"),
            Err(Error::InvalidConfig(_))
        ));
    }
}
