//! Immutable cart views for subscribers.
//!
//! Every mutation publishes a fresh snapshot; subscribers compare values
//! instead of observing mutation. Totals are computed once at capture so
//! readers never recount.

use crate::{identity_of, CartLedger, LineItem, Money, Quantity};
use serde::{Deserialize, Serialize};

/// A point-in-time view of the cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// Increases with every published snapshot
    pub revision: u64,
    /// Lines in insertion order
    pub items: Vec<LineItem>,
    /// Sum of quantities
    pub items_count: Quantity,
    /// Sum of line totals
    pub subtotal: Money,
}

impl CartSnapshot {
    /// The empty view at revision zero.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the ledger's current state.
    pub fn capture(revision: u64, ledger: &CartLedger) -> Self {
        Self {
            revision,
            items: ledger.all().to_vec(),
            items_count: ledger.items_count(),
            subtotal: ledger.subtotal(),
        }
    }

    /// Number of lines (not units).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the view holds no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line matching a (product, size, variant) selection.
    pub fn find_item(
        &self,
        product_id: &str,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Option<&LineItem> {
        let identity = identity_of(product_id, size, variant);
        self.items.iter().find(|item| item.identity() == identity)
    }

    /// Quantity for a selection, zero when absent.
    pub fn quantity_of(
        &self,
        product_id: &str,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Quantity {
        self.find_item(product_id, size, variant)
            .map_or(0, |item| item.quantity)
    }

    /// Check if any line carries this product, regardless of selections.
    pub fn contains_product(&self, product_id: &str) -> bool {
        self.items.iter().any(|item| item.product.id == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProductRef;

    fn test_ledger() -> CartLedger {
        let mut ledger = CartLedger::new();
        let tote = ProductRef::new("prod_tote", "Canvas Tote", Money::from_minor(2_500), None);
        let mug = ProductRef::new("prod_mug", "Camp Mug", Money::from_minor(1_200), None);
        ledger.upsert(LineItem::new("l1", tote, 2, Some("M"), None, 10));
        ledger.upsert(LineItem::new("l2", mug, 1, None, None, 20));
        ledger
    }

    #[test]
    fn test_capture_computes_totals() {
        let snapshot = CartSnapshot::capture(7, &test_ledger());

        assert_eq!(snapshot.revision, 7);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.items_count, 3);
        assert_eq!(snapshot.subtotal, Money::from_minor(6_200));
    }

    #[test]
    fn test_empty_view() {
        let snapshot = CartSnapshot::empty();

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.revision, 0);
        assert_eq!(snapshot.subtotal, Money::ZERO);
    }

    #[test]
    fn test_selection_lookups() {
        let snapshot = CartSnapshot::capture(1, &test_ledger());

        assert_eq!(snapshot.quantity_of("prod_tote", Some("M"), None), 2);
        assert_eq!(snapshot.quantity_of("prod_tote", Some("L"), None), 0);
        assert!(snapshot.find_item("prod_mug", None, None).is_some());
        assert!(snapshot.contains_product("prod_tote"));
        assert!(!snapshot.contains_product("prod_socks"));
    }

    #[test]
    fn test_equal_states_compare_equal() {
        let ledger = test_ledger();
        // Captures of the same state at the same revision are interchangeable
        assert_eq!(CartSnapshot::capture(3, &ledger), CartSnapshot::capture(3, &ledger));
        assert_ne!(CartSnapshot::capture(3, &ledger), CartSnapshot::capture(4, &ledger));
    }

    #[test]
    fn test_capture_is_detached_from_ledger() {
        let mut ledger = test_ledger();
        let snapshot = ledger.snapshot(1);

        ledger.clear();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.items_count, 3);
    }

    #[test]
    fn test_serializes_camel_case() {
        let snapshot = CartSnapshot::capture(2, &test_ledger());
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["revision"], 2);
        assert_eq!(json["itemsCount"], 3);
        assert_eq!(json["subtotal"], 6_200);
        assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
    }
}
