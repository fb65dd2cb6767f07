//! Outbound ports of the application layer

pub mod anchor;

pub use anchor::{AnchorSource, NoAnchor, SharedAnchorSource};
