//! Session identity seam.
//!
//! The storefront's auth layer owns sign-in state; the cart asks one
//! question at decision points: who is the customer right now?

use crate::CustomerId;

/// Supplies the current customer identity.
///
/// Checked at every remote decision point rather than cached, so sign-out
/// between scheduling and dispatch is honored.
pub trait SessionProvider: Send + Sync {
    /// The signed-in customer, or `None` for a guest session.
    fn current_customer_id(&self) -> Option<CustomerId>;
}

/// Session with a fixed identity.
///
/// Suits embeddings where sign-in state does not change over the store's
/// lifetime, and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    customer_id: Option<CustomerId>,
}

impl StaticSession {
    /// Session for a signed-in customer.
    pub fn signed_in(customer_id: impl Into<CustomerId>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
        }
    }

    /// Guest session; every cart change stays local.
    pub fn anonymous() -> Self {
        Self { customer_id: None }
    }
}

impl SessionProvider for StaticSession {
    fn current_customer_id(&self) -> Option<CustomerId> {
        self.customer_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_in_session() {
        let session = StaticSession::signed_in("customer_1");
        assert_eq!(session.current_customer_id().as_deref(), Some("customer_1"));
    }

    #[test]
    fn test_anonymous_session() {
        let session = StaticSession::anonymous();
        assert_eq!(session.current_customer_id(), None);
    }
}
