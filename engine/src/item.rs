//! Cart line items.
//!
//! A [`LineItem`] is one row of the cart: an owned product snapshot, the
//! chosen options, a quantity, and the confirmation state of its last sync.

use crate::{identity_of, ItemIdentity, LineId, Money, ProductId, Quantity, RemoteId, Timestamp};
use serde::{Deserialize, Serialize};

/// Owned copy of the catalog fields a cart line displays.
///
/// The catalog domain owns the live product; the cart stores a copy so a
/// line keeps rendering even if the catalog entry changes or disappears.
/// Server responses refresh these fields during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    /// Catalog identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Price per unit in minor units
    pub unit_price: Money,
    /// Cover image reference, if the product has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductRef {
    /// Create a product snapshot.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        image_url: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            image_url: image_url.map(Into::into),
        }
    }
}

/// Whether the last local change to a line has been confirmed remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SyncState {
    /// No local change is awaiting confirmation
    Idle,
    /// A local change is scheduled or in flight
    Pending,
    /// The last sync attempt failed
    Error { message: String },
}

impl SyncState {
    /// Build the error state from any message source.
    pub fn error(message: impl Into<String>) -> Self {
        SyncState::Error {
            message: message.into(),
        }
    }

    /// Check if no change is awaiting confirmation.
    pub fn is_idle(&self) -> bool {
        matches!(self, SyncState::Idle)
    }

    /// Check if a change is scheduled or in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, SyncState::Pending)
    }

    /// Check if the last sync attempt failed.
    pub fn is_error(&self) -> bool {
        matches!(self, SyncState::Error { .. })
    }
}

/// One row of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Client-generated identifier, stable for the life of the line
    pub local_id: LineId,
    /// Server identifier, adopted once the first add is confirmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    /// Snapshot of the product this line sells
    pub product: ProductRef,
    /// Units in the cart, at least 1 while the line exists
    pub quantity: Quantity,
    /// Chosen size, if the product has sizes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
    /// Chosen variant, if the product has variants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_variant: Option<String>,
    /// When the line entered the cart, in milliseconds since the epoch.
    /// Never changes once set, even when the line is replaced in place.
    pub added_at: Timestamp,
    /// Confirmation state of the last local change
    pub sync_state: SyncState,
}

impl LineItem {
    /// Create a line for a locally initiated add.
    ///
    /// Starts out [`SyncState::Pending`] with no server id; both settle when
    /// the first add is confirmed.
    pub fn new(
        local_id: impl Into<LineId>,
        product: ProductRef,
        quantity: Quantity,
        selected_size: Option<&str>,
        selected_variant: Option<&str>,
        added_at: Timestamp,
    ) -> Self {
        Self {
            local_id: local_id.into(),
            remote_id: None,
            product,
            quantity,
            selected_size: selected_size.map(Into::into),
            selected_variant: selected_variant.map(Into::into),
            added_at,
            sync_state: SyncState::Pending,
        }
    }

    /// Create a line from the server's copy. Starts out [`SyncState::Idle`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_remote(
        local_id: impl Into<LineId>,
        remote_id: impl Into<RemoteId>,
        product: ProductRef,
        quantity: Quantity,
        selected_size: Option<&str>,
        selected_variant: Option<&str>,
        added_at: Timestamp,
    ) -> Self {
        Self {
            local_id: local_id.into(),
            remote_id: Some(remote_id.into()),
            product,
            quantity,
            selected_size: selected_size.map(Into::into),
            selected_variant: selected_variant.map(Into::into),
            added_at,
            sync_state: SyncState::Idle,
        }
    }

    /// The key this line merges and debounces under.
    pub fn identity(&self) -> ItemIdentity {
        identity_of(
            &self.product.id,
            self.selected_size.as_deref(),
            self.selected_variant.as_deref(),
        )
    }

    /// Line total: unit price times quantity.
    pub fn line_total(&self) -> Money {
        self.product.unit_price.times(self.quantity)
    }

    /// Mark a change as scheduled or in flight.
    pub fn mark_pending(&mut self) {
        self.sync_state = SyncState::Pending;
    }

    /// Mark the line as confirmed.
    pub fn mark_idle(&mut self) {
        self.sync_state = SyncState::Idle;
    }

    /// Mark the last sync attempt as failed.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.sync_state = SyncState::error(message);
    }

    /// Merge server-authoritative fields after a confirmed add.
    ///
    /// Adopts the server id and refreshes the product snapshot. Quantity and
    /// the identity-defining selections are never touched here.
    pub fn adopt_remote(
        &mut self,
        remote_id: impl Into<RemoteId>,
        unit_price: Money,
        name: impl Into<String>,
        image_url: Option<&str>,
    ) {
        self.remote_id = Some(remote_id.into());
        self.product.unit_price = unit_price;
        self.product.name = name.into();
        self.product.image_url = image_url.map(Into::into);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product() -> ProductRef {
        ProductRef::new("prod_1", "Canvas Tote", Money::from_minor(2_500), None)
    }

    #[test]
    fn test_local_line_starts_pending() {
        let item = LineItem::new("line_1", test_product(), 2, Some("M"), None, 1_706_745_600_000);

        assert_eq!(item.remote_id, None);
        assert!(item.sync_state.is_pending());
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_remote_line_starts_idle() {
        let item = LineItem::from_remote(
            "line_1",
            "srv_9",
            test_product(),
            1,
            None,
            Some("green"),
            1_706_745_600_000,
        );

        assert_eq!(item.remote_id.as_deref(), Some("srv_9"));
        assert!(item.sync_state.is_idle());
    }

    #[test]
    fn test_identity_uses_selections() {
        let sized = LineItem::new("line_1", test_product(), 1, Some("M"), None, 0);
        let no_size = LineItem::new("line_2", test_product(), 1, None, None, 0);

        assert_eq!(sized.identity(), identity_of("prod_1", Some("M"), None));
        assert_ne!(sized.identity(), no_size.identity());
    }

    #[test]
    fn test_adopt_remote_preserves_identity_fields() {
        let mut item = LineItem::new("line_1", test_product(), 3, Some("M"), Some("green"), 0);
        let identity_before = item.identity();

        item.adopt_remote("srv_1", Money::from_minor(2_750), "Canvas Tote v2", Some("img.jpg"));

        assert_eq!(item.remote_id.as_deref(), Some("srv_1"));
        assert_eq!(item.product.unit_price, Money::from_minor(2_750));
        assert_eq!(item.product.name, "Canvas Tote v2");
        assert_eq!(item.product.image_url.as_deref(), Some("img.jpg"));
        // What makes the line "this line" is untouched
        assert_eq!(item.quantity, 3);
        assert_eq!(item.selected_size.as_deref(), Some("M"));
        assert_eq!(item.selected_variant.as_deref(), Some("green"));
        assert_eq!(item.identity(), identity_before);
    }

    #[test]
    fn test_line_total() {
        let item = LineItem::new("line_1", test_product(), 4, None, None, 0);
        assert_eq!(item.line_total(), Money::from_minor(10_000));
    }

    #[test]
    fn test_state_transitions() {
        let mut item = LineItem::new("line_1", test_product(), 1, None, None, 0);

        item.mark_idle();
        assert!(item.sync_state.is_idle());

        item.mark_pending();
        assert!(item.sync_state.is_pending());

        item.mark_error("network failure");
        assert!(item.sync_state.is_error());
        assert_eq!(item.sync_state, SyncState::error("network failure"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let item = LineItem::new("line_1", test_product(), 2, Some("M"), None, 42);
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["localId"], "line_1");
        assert_eq!(json["selectedSize"], "M");
        assert_eq!(json["addedAt"], 42);
        assert_eq!(json["syncState"]["state"], "pending");
        // Absent optionals are omitted entirely
        assert!(json.get("remoteId").is_none());
        assert!(json.get("selectedVariant").is_none());
    }

    #[test]
    fn test_error_state_carries_message() {
        let state = SyncState::error("timed out");
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["state"], "error");
        assert_eq!(json["message"], "timed out");

        let parsed: SyncState = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, state);
    }
}
