//! SimpleStorageService: minimal stand-in for the external disk-backed
//! file store used by the head node and every compute node. Scoped to
//! exactly what the head controller needs: the duration of a transfer
//! into the store, and carving a fresh per-invocation scratch buffer.
//! Residency and byte-budget bookkeeping stay with `ImageResidency` and
//! `NodeBudgets`; this service owns no state of its own.

use crate::function::{Image, Scratch};
use crate::platform::Link;

#[derive(Debug, Clone)]
pub struct SimpleStorageService {
    pub node: String,
}

impl SimpleStorageService {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }

    /// Seconds to transfer `image` into this store over `link`.
    pub fn transfer_seconds(&self, image: &Image, link: &Link) -> f64 {
        link.transfer_seconds(image.size_bytes)
    }

    /// Carve a fresh scratch store of `capacity_bytes` for one invocation.
    pub fn allocate_scratch(&self, capacity_bytes: u64) -> Scratch {
        Scratch::new(capacity_bytes)
    }
}
