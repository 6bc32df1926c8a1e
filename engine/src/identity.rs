//! Identity derivation for cart lines.
//!
//! Two cart rows are "the same line" exactly when product, size, and variant
//! all match. The derived key is what merge lookups and per-line debounce
//! timers hang off.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between identity components.
///
/// An ASCII unit separator cannot appear in product ids or option labels,
/// so distinct (product, size, variant) triples never share a key.
const COMPONENT_SEPARATOR: char = '\u{1F}';

/// Composite key identifying a unique cart line.
///
/// Opaque outside this module; compare, hash, or display it, but never parse
/// it back into components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIdentity(String);

impl ItemIdentity {
    /// The raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Readable form for logs; only the raw key keeps the control separator.
        write!(f, "{}", self.0.replace(COMPONENT_SEPARATOR, ":"))
    }
}

/// Derive the identity key for a (product, size, variant) selection.
///
/// A missing size or variant normalizes to the empty string, so `None` and
/// `Some("")` produce the same key: both mean "no selection".
pub fn identity_of(product_id: &str, size: Option<&str>, variant: Option<&str>) -> ItemIdentity {
    let size = size.unwrap_or("");
    let variant = variant.unwrap_or("");
    ItemIdentity(format!(
        "{product_id}{COMPONENT_SEPARATOR}{size}{COMPONENT_SEPARATOR}{variant}"
    ))
}
