//! The authoritative local cart state.
//!
//! Insertion order is presentation order: first added, first shown. The
//! ledger owns two invariants: at most one line per identity, and no
//! zero-quantity residents.

use crate::{CartSnapshot, ItemIdentity, LineItem, Money, Quantity};
use serde::{Deserialize, Serialize};

/// Ordered collection of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartLedger {
    items: Vec<LineItem>,
}

impl CartLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Insert or replace a line.
    ///
    /// An existing line with the same identity is replaced in place, keeping
    /// its position and original `added_at`. A zero-quantity item removes the
    /// line instead of storing it.
    pub fn upsert(&mut self, item: LineItem) {
        let identity = item.identity();
        if item.quantity == 0 {
            self.remove_by_identity(&identity);
            return;
        }
        match self
            .items
            .iter_mut()
            .find(|existing| existing.identity() == identity)
        {
            Some(existing) => {
                let added_at = existing.added_at;
                *existing = item;
                existing.added_at = added_at;
            }
            None => self.items.push(item),
        }
    }

    /// Remove the line with this identity, returning it if present.
    pub fn remove_by_identity(&mut self, identity: &ItemIdentity) -> Option<LineItem> {
        let index = self
            .items
            .iter()
            .position(|item| &item.identity() == identity)?;
        Some(self.items.remove(index))
    }

    /// Find a line by identity.
    pub fn find_by_identity(&self, identity: &ItemIdentity) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.identity() == identity)
    }

    /// Find a line by identity for mutation.
    pub fn find_by_identity_mut(&mut self, identity: &ItemIdentity) -> Option<&mut LineItem> {
        self.items
            .iter_mut()
            .find(|item| &item.identity() == identity)
    }

    /// All lines in insertion order.
    pub fn all(&self) -> &[LineItem] {
        &self.items
    }

    /// Number of lines (not units).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines.
    pub fn items_count(&self) -> Quantity {
        self.items
            .iter()
            .map(|item| item.quantity)
            .fold(0, u64::saturating_add)
    }

    /// Sum of line totals.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Drain every line, returning them in insertion order.
    pub fn clear(&mut self) -> Vec<LineItem> {
        std::mem::take(&mut self.items)
    }

    /// Replace the whole ledger with a new set of lines.
    ///
    /// Lines fold through [`CartLedger::upsert`], so duplicate identities in
    /// the input collapse to the last occurrence and zero quantities drop.
    pub fn replace_all(&mut self, items: Vec<LineItem>) {
        self.items.clear();
        for item in items {
            self.upsert(item);
        }
    }

    /// Capture an immutable view with derived totals.
    pub fn snapshot(&self, revision: u64) -> CartSnapshot {
        CartSnapshot::capture(revision, self)
    }
}
