//! Ledger anchoring port
//!
//! An [`AnchorSource`] attaches provenance metadata to a record as it is
//! written. The result is stored verbatim; no lifecycle rule reads it.

use std::sync::Arc;

use crate::domain::LedgerAnchor;

pub trait AnchorSource: Send + Sync {
    /// Anchor for the record `kind`/`record_id` whose canonical content is
    /// `payload`. `None` when anchoring is disabled or unavailable.
    fn anchor(&self, kind: &str, record_id: &str, payload: &str) -> Option<LedgerAnchor>;
}

pub type SharedAnchorSource = Arc<dyn AnchorSource>;

/// Anchoring disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnchor;

impl AnchorSource for NoAnchor {
    fn anchor(&self, _kind: &str, _record_id: &str, _payload: &str) -> Option<LedgerAnchor> {
        None
    }
}
