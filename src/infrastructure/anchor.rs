//! Ledger anchor sources
//!
//! `digest` is a local stand-in for an external ledger: a SHA-256 over the
//! record, a process-wide increasing block number, and the configured
//! endorsing organisations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::application::ports::{AnchorSource, NoAnchor, SharedAnchorSource};
use crate::domain::LedgerAnchor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    #[default]
    None,
    Digest,
}

/// `[ledger]` config section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub anchor: AnchorMode,
    pub endorsing_orgs: Vec<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            anchor: AnchorMode::None,
            endorsing_orgs: vec!["Org1MSP".into(), "Org2MSP".into()],
        }
    }
}

pub struct DigestAnchor {
    endorsing_orgs: Vec<String>,
    next_block: AtomicU64,
}

impl DigestAnchor {
    pub fn new(endorsing_orgs: Vec<String>) -> Self {
        Self {
            endorsing_orgs,
            next_block: AtomicU64::new(1),
        }
    }
}

impl AnchorSource for DigestAnchor {
    fn anchor(&self, kind: &str, record_id: &str, payload: &str) -> Option<LedgerAnchor> {
        let block_number = self.next_block.fetch_add(1, Ordering::SeqCst);

        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b":");
        hasher.update(record_id.as_bytes());
        hasher.update(b":");
        hasher.update(payload.as_bytes());
        hasher.update(block_number.to_be_bytes());

        Some(LedgerAnchor {
            blockchain_tx_hash: hex::encode(hasher.finalize()),
            block_number,
            endorsing_orgs: self.endorsing_orgs.clone(),
        })
    }
}

pub fn create_anchor_source(config: &LedgerConfig) -> SharedAnchorSource {
    match config.anchor {
        AnchorMode::None => Arc::new(NoAnchor),
        AnchorMode::Digest => Arc::new(DigestAnchor::new(config.endorsing_orgs.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_anchor_increments_blocks() {
        let source = DigestAnchor::new(vec!["Org1MSP".into()]);
        let a = source.anchor("payment", "p1", "100").unwrap();
        let b = source.anchor("payment", "p1", "100").unwrap();
        assert_eq!(a.block_number + 1, b.block_number);
        assert_ne!(a.blockchain_tx_hash, b.blockchain_tx_hash);
        assert_eq!(a.blockchain_tx_hash.len(), 64);
        assert_eq!(a.endorsing_orgs, vec!["Org1MSP".to_string()]);
    }

    #[test]
    fn none_mode_produces_nothing() {
        let source = create_anchor_source(&LedgerConfig::default());
        assert!(source.anchor("payment", "p1", "100").is_none());
    }
}
