//! # Trolley Engine
//!
//! The deterministic cart model behind Trolley's optimistic cart sync.
//!
//! This crate holds the pure state: line items, the ordered ledger, derived
//! totals, and identity derivation. There is no IO and no clock here. The
//! async layer owns timers and the network, and feeds timestamps in.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about network, timers, or platform
//! - **Deterministic**: the same mutations always produce the same ledger
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Line items
//!
//! A cart row is a [`LineItem`]: a [`ProductRef`] snapshot (id, name, unit
//! price, image), a quantity, the chosen size and variant, and a
//! [`SyncState`] recording whether the last local change has been confirmed
//! remotely.
//!
//! ### Identity
//!
//! [`identity_of`] derives the composite key (product, size, variant) that
//! defines "the same cart line". Lines with equal identity merge; they are
//! never duplicated.
//!
//! ### The ledger
//!
//! [`CartLedger`] is the authoritative local state: insertion ordered, at
//! most one line per identity, no zero-quantity residents.
//!
//! ### Snapshots
//!
//! [`CartSnapshot`] is an immutable view with precomputed totals, captured
//! after every mutation and handed to subscribers.
//!
//! ## Quick Start
//!
//! ```rust
//! use trolley_engine::{identity_of, CartLedger, LineItem, Money, ProductRef};
//!
//! let product = ProductRef::new("prod_1", "Canvas Tote", Money::from_minor(2_500), None);
//!
//! let mut ledger = CartLedger::new();
//! ledger.upsert(LineItem::new("line_1", product, 2, Some("M"), None, 1_706_745_600_000));
//!
//! let identity = identity_of("prod_1", Some("M"), None);
//! assert_eq!(ledger.find_by_identity(&identity).map(|item| item.quantity), Some(2));
//!
//! let snapshot = ledger.snapshot(1);
//! assert_eq!(snapshot.items_count, 2);
//! assert_eq!(snapshot.subtotal, Money::from_minor(5_000));
//! ```

pub mod identity;
pub mod item;
pub mod ledger;
pub mod money;
pub mod snapshot;

// Re-export main types at crate root
pub use identity::{identity_of, ItemIdentity};
pub use item::{LineItem, ProductRef, SyncState};
pub use ledger::CartLedger;
pub use money::Money;
pub use snapshot::CartSnapshot;

/// Type aliases for clarity
pub type ProductId = String;
pub type LineId = String;
pub type RemoteId = String;
pub type Quantity = u64;
pub type Timestamp = u64;
