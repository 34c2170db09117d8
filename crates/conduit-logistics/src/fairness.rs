//! Round-robin rotation state per item network.
//!
//! Networks are identified by their anchor (see
//! [`network_anchor`](conduit_core::discovery::network_anchor)). Entries are
//! created on first use and never removed; an entry for a network that no
//! longer exists is simply never read again.

use conduit_core::coord::Location;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct FairnessIndex {
    offsets: HashMap<Location, usize>,
}

impl FairnessIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where to start in a group of `len` sources. Zero for an unknown network.
    pub fn offset(&self, anchor: Location, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.offsets.get(&anchor).copied().unwrap_or(0) % len
    }

    /// Move past the source at `acted` so the next cycle starts with its successor.
    pub fn advance(&mut self, anchor: Location, acted: usize, len: usize) {
        if len == 0 {
            return;
        }
        self.offsets.insert(anchor, (acted + 1) % len);
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Indices `0..len` starting at `offset` and wrapping.
pub fn rotation(offset: usize, len: usize) -> impl Iterator<Item = usize> {
    (0..len).map(move |i| (offset + i) % len)
}
