//! Typed views of the ticketing contract's view-call results.
//!
//! Drops carry their ticket configuration as an independently JSON-encoded
//! `extra` string inside the NFT token metadata, and funders carry their
//! events as a JSON-encoded map. Both are decoded here into strong types so
//! the verifier never inspects raw JSON.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::error::MetadataError;
use crate::keys::PublicKey;
use crate::window::{ValidityWindow, WindowCheck};

pub const DEFAULT_TICKET_TITLE: &str = "General Admission";

/// Uses granted per key at mint: one for the door claim, one so the key and
/// its metadata survive admission.
pub const USES_PER_TICKET: u32 = 2;

/// Gas attached to `claim` when the contract does not say how much it needs.
pub const DEFAULT_CLAIM_GAS: Gas = Gas(30_000_000_000_000);

// ============== GAS ==============

/// Gas amount; the contract reports it as a JSON string (`U64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Gas(pub u64);

impl<'de> Deserialize<'de> for Gas {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Gas(n)),
            Raw::Text(text) => text
                .parse()
                .map(Gas)
                .map_err(|e| de::Error::custom(format!("invalid gas `{text}`: {e}"))),
        }
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} TGas", self.0 as f64 / 1e12)
    }
}

// ============== KEY / DROP ==============

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeyInfo {
    pub drop_id: String,
    #[serde(default)]
    pub uses_remaining: u32,
    #[serde(default)]
    pub required_gas: Option<Gas>,
}

impl KeyInfo {
    /// Fewer than two uses left means the door claim already happened.
    pub fn has_been_used(&self) -> bool {
        self.uses_remaining < USES_PER_TICKET
    }

    /// Gas for this key's claim; a missing or zero value falls back to
    /// [`DEFAULT_CLAIM_GAS`].
    pub fn claim_gas(&self) -> Gas {
        self.required_gas
            .filter(|gas| gas.0 > 0)
            .unwrap_or(DEFAULT_CLAIM_GAS)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DropInfo {
    pub drop_id: String,
    pub funder_id: String,
    pub drop_config: DropConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DropConfig {
    pub nft_keys_config: NftKeysConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NftKeysConfig {
    pub token_metadata: TokenMetadata,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// IPFS CID of the ticket artwork.
    #[serde(default)]
    pub artwork: Option<String>,
    #[serde(default)]
    pub extra: Option<String>,
}

impl DropInfo {
    pub fn token_metadata(&self) -> &TokenMetadata {
        &self.drop_config.nft_keys_config.token_metadata
    }

    pub fn ticket_extra(&self) -> Result<TicketExtra, MetadataError> {
        let raw = self
            .token_metadata()
            .extra
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .ok_or(MetadataError::MissingExtra)?;
        serde_json::from_str(raw).map_err(MetadataError::Extra)
    }
}

// ============== TICKET EXTRA ==============

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketExtra {
    pub event_id: String,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub limit_per_user: Option<u32>,
    #[serde(default)]
    pub price_near: Option<String>,
    #[serde(default)]
    pub price_fiat: Option<String>,
    #[serde(default)]
    pub max_supply: Option<u64>,
    #[serde(default)]
    pub sales_valid_through: Option<ValidityWindow>,
    #[serde(default)]
    pub pass_valid_through: Option<ValidityWindow>,
}

impl TicketExtra {
    /// On sale only while the sales window is open; no window means always.
    pub fn is_purchasable(&self, now: DateTime<FixedOffset>) -> bool {
        self.sales_valid_through
            .as_ref()
            .map_or(true, |w| w.evaluate(now, WindowCheck::Admission).is_open())
    }
}

/// Everything known about one purchased ticket.
#[derive(Debug, Clone)]
pub struct TicketDetails {
    pub public_key: PublicKey,
    pub key: KeyInfo,
    pub drop: DropInfo,
    pub extra: TicketExtra,
}

impl TicketDetails {
    pub fn title(&self) -> &str {
        self.drop
            .token_metadata()
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TICKET_TITLE)
    }

    pub fn uses_remaining(&self) -> u32 {
        self.key.uses_remaining
    }
}

// ============== FUNDER / EVENTS ==============

#[derive(Debug, Clone, Deserialize)]
pub struct FunderInfo {
    /// JSON map of event id to event metadata.
    pub metadata: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunderEventMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    pub date: ValidityWindow,
    #[serde(default)]
    pub artwork: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sellable: Option<bool>,
    #[serde(default)]
    pub date_created: Option<String>,
}

impl FunderInfo {
    pub fn events(&self) -> Result<Vec<FunderEventMetadata>, MetadataError> {
        let events: HashMap<String, FunderEventMetadata> =
            serde_json::from_str(&self.metadata).map_err(MetadataError::Funder)?;
        Ok(events.into_values().collect())
    }

    pub fn find_event(&self, event_id: &str) -> Result<Option<FunderEventMetadata>, MetadataError> {
        Ok(self.events()?.into_iter().find(|event| event.id == event_id))
    }
}

// ============== EVENT REF ==============

/// `<publisher>:<eventId>` reference used to bind a scanning session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRef {
    pub publisher_account_id: String,
    pub event_id: String,
}

impl EventRef {
    /// A bare id (no `:`) is treated as an event id with no known publisher.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((publisher, event)) => Self {
                publisher_account_id: publisher.to_string(),
                event_id: event.to_string(),
            },
            None => Self {
                publisher_account_id: String::new(),
                event_id: raw.to_string(),
            },
        }
    }

    pub fn publisher(&self) -> Option<&str> {
        Some(self.publisher_account_id.as_str()).filter(|p| !p.is_empty())
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.publisher_account_id, self.event_id)
    }
}
