//! # Trolley Sync
//!
//! Optimistic cart synchronization: a local mirror of the server cart that
//! stays responsive under rapid input, coalesces network traffic per cart
//! line, and reconciles server responses without clobbering newer local
//! edits.
//!
//! ## How a mutation travels
//!
//! 1. A [`CartStore`] command mutates the ledger synchronously and publishes
//!    a fresh [`CartSnapshot`](trolley_engine::CartSnapshot), so the UI
//!    updates before any network round trip.
//! 2. The change is keyed by its line identity and handed to the
//!    [`Debouncer`]; repeated changes inside the quiet period restart the
//!    timer, so one call carries the final quantity.
//! 3. When the timer fires, the coordinator reads the line at fire time and
//!    issues an add or an update through [`RemoteCartService`], depending on
//!    whether the line has a server id yet.
//! 4. The response merges back: server id, price, name, and image are
//!    adopted; quantity is never overwritten by a late response.
//!
//! Removal and clearing bypass the debounce entirely and fire immediately.
//! Guest sessions skip the network; the cart behaves as purely local state.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use trolley_engine::{Money, ProductRef};
//! use trolley_sync::{CartStore, InMemoryRemoteCart, StaticSession, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let remote = InMemoryRemoteCart::new_shared();
//!     remote.insert_product(ProductRef::new(
//!         "prod_1",
//!         "Canvas Tote",
//!         Money::from_minor(2_500),
//!         None,
//!     ));
//!
//!     let session = Arc::new(StaticSession::signed_in("customer_1"));
//!     let store = CartStore::new(remote, session, SyncConfig::default());
//!
//!     // Optimistic: totals update before the debounced call fires
//!     store.add_to_cart(
//!         ProductRef::new("prod_1", "Canvas Tote", Money::from_minor(2_500), None),
//!         2,
//!         Some("M"),
//!         None,
//!     );
//!     assert_eq!(store.items_count(), 2);
//!     assert_eq!(store.total(), Money::from_minor(5_000));
//! }
//! ```

pub mod config;
mod coordinator;
pub mod debounce;
pub mod error;
pub mod remote;
pub mod session;
pub mod store;

// Re-export main types at crate root
pub use config::{SyncConfig, DEFAULT_DEBOUNCE_DELAY};
pub use debounce::Debouncer;
pub use error::{CartError, Result};
pub use remote::{
    AddItemRequest, AddItemResponse, InMemoryRemoteCart, ProductSnapshot, RemoteCartItem,
    RemoteCartService, RemoveItemRequest, UpdateItemRequest,
};
pub use session::{SessionProvider, StaticSession};
pub use store::CartStore;

/// Type aliases for clarity
pub type CustomerId = String;
