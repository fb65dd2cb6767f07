//! Provenance metadata from an external immutable ledger.
//!
//! Opaque to every lifecycle rule: stored and returned as given, never
//! consulted for consistency decisions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAnchor {
    pub blockchain_tx_hash: String,
    pub block_number: u64,
    pub endorsing_orgs: Vec<String>,
}

impl LedgerAnchor {
    /// Organisations are persisted as a comma separated column.
    pub fn orgs_to_column(&self) -> String {
        self.endorsing_orgs.join(",")
    }

    /// Rebuild from the three nullable columns; all must be present.
    pub fn from_columns(
        tx_hash: Option<String>,
        block_number: Option<i64>,
        orgs: Option<String>,
    ) -> Option<Self> {
        let blockchain_tx_hash = tx_hash?;
        let block_number = u64::try_from(block_number?).ok()?;
        let endorsing_orgs = orgs
            .map(|s| {
                s.split(',')
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            blockchain_tx_hash,
            block_number,
            endorsing_orgs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_round_trip() {
        let anchor = LedgerAnchor {
            blockchain_tx_hash: "ab12".into(),
            block_number: 42,
            endorsing_orgs: vec!["Org1MSP".into(), "Org2MSP".into()],
        };
        let back = LedgerAnchor::from_columns(
            Some(anchor.blockchain_tx_hash.clone()),
            Some(42),
            Some(anchor.orgs_to_column()),
        );
        assert_eq!(back, Some(anchor));
    }

    #[test]
    fn missing_hash_means_no_anchor() {
        assert_eq!(LedgerAnchor::from_columns(None, Some(1), None), None);
    }
}
