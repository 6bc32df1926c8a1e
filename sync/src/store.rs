//! The public cart surface.
//!
//! Commands mutate optimistically and return immediately; reads are pure
//! projections of the current ledger; [`CartStore::subscribe`] hands out
//! snapshot receivers for reactive consumers. Clones share one cart.

use std::sync::Arc;

use tokio::sync::watch;
use trolley_engine::{CartSnapshot, LineItem, Money, ProductRef, Quantity};

use crate::config::SyncConfig;
use crate::coordinator::SyncCoordinator;
use crate::error::{CartError, Result};
use crate::remote::RemoteCartService;
use crate::session::SessionProvider;

/// Handle to a synchronized cart.
#[derive(Clone)]
pub struct CartStore {
    coordinator: Arc<SyncCoordinator>,
}

impl CartStore {
    /// Build a store around its collaborators.
    ///
    /// Must be called within a Tokio runtime; commands spawn debounce
    /// timers and remote calls.
    pub fn new(
        remote: Arc<dyn RemoteCartService>,
        session: Arc<dyn SessionProvider>,
        config: SyncConfig,
    ) -> Self {
        Self {
            coordinator: SyncCoordinator::new_shared(remote, session, config),
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Add units of a product. The same (product, size, variant) selection
    /// merges into its existing line instead of duplicating it.
    pub fn add_to_cart(
        &self,
        product: ProductRef,
        quantity: Quantity,
        size: Option<&str>,
        variant: Option<&str>,
    ) {
        self.coordinator.add(product, quantity, size, variant);
    }

    /// Set a line's quantity outright. Zero removes the line.
    pub fn update_quantity(
        &self,
        product_id: &str,
        quantity: Quantity,
        size: Option<&str>,
        variant: Option<&str>,
    ) {
        self.coordinator
            .update_quantity(product_id, quantity, size, variant);
    }

    /// Raise a line's quantity by one.
    pub fn increment_quantity(&self, product_id: &str, size: Option<&str>, variant: Option<&str>) {
        self.coordinator.increment(product_id, size, variant);
    }

    /// Lower a line's quantity by one; reaching zero removes the line.
    pub fn decrement_quantity(&self, product_id: &str, size: Option<&str>, variant: Option<&str>) {
        self.coordinator.decrement(product_id, size, variant);
    }

    /// Drop a line. The remote removal fires immediately, never debounced.
    pub fn remove_from_cart(&self, product_id: &str, size: Option<&str>, variant: Option<&str>) {
        self.coordinator.remove(product_id, size, variant);
    }

    /// Empty the cart and remove every synced line remotely, in parallel.
    pub fn clear_cart(&self) {
        self.coordinator.clear();
    }

    /// Replace local state with the server's cart.
    ///
    /// Lines with a debounced change still outstanding keep their pending
    /// mark, and the eventual dispatch sends the fetched state.
    pub async fn fetch_cart(&self) -> Result<()> {
        self.coordinator.fetch().await
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// All lines in insertion order.
    pub fn items(&self) -> Vec<LineItem> {
        self.coordinator.items()
    }

    /// Sum of quantities across lines.
    pub fn items_count(&self) -> Quantity {
        self.coordinator.items_count()
    }

    /// Sum of quantity times unit price across lines.
    pub fn total(&self) -> Money {
        self.coordinator.subtotal()
    }

    /// Quantity for a selection, zero when absent.
    pub fn get_quantity(
        &self,
        product_id: &str,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Quantity {
        self.coordinator.quantity_of(product_id, size, variant)
    }

    /// The line matching a selection, if present.
    pub fn find_item(
        &self,
        product_id: &str,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Option<LineItem> {
        self.coordinator.find_item(product_id, size, variant)
    }

    /// Check if any line carries this product, regardless of selections.
    pub fn is_in_cart(&self, product_id: &str) -> bool {
        self.coordinator.contains_product(product_id)
    }

    // ------------------------------------------------------------------
    // Reactivity
    // ------------------------------------------------------------------

    /// Snapshot receiver; the current value is the latest published view.
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.coordinator.subscribe()
    }

    /// Store-level errors from remove and clear, which have no line left
    /// to carry an error state.
    pub fn errors(&self) -> watch::Receiver<Option<CartError>> {
        self.coordinator.subscribe_errors()
    }

    /// Latest store-level error, if any.
    pub fn last_error(&self) -> Option<CartError> {
        self.coordinator.last_error()
    }
}
