//! Orchestration of optimistic mutation and debounced reconciliation.
//!
//! Every cart command mutates the ledger synchronously, publishes a fresh
//! snapshot, then schedules or fires remote work. Responses merge back
//! without ever clobbering a newer local edit: each mutation takes a
//! sequence number, and a settling response only owns the line's state if
//! no newer mutation replaced its number. At most one call per identity is
//! on the wire at a time; a quiet period that elapses behind an in-flight
//! call parks and re-fires when that call settles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use trolley_engine::{
    identity_of, CartLedger, CartSnapshot, ItemIdentity, LineItem, Money, ProductId, ProductRef,
    Quantity, RemoteId,
};

use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::error::{CartError, Result};
use crate::remote::{
    AddItemRequest, AddItemResponse, RemoteCartItem, RemoteCartService, RemoveItemRequest,
    UpdateItemRequest,
};
use crate::session::SessionProvider;

/// What a successful dispatch carried back.
enum ReconcileOutcome {
    Added(AddItemResponse),
    Updated,
}

/// Bookkeeping for an identity with remote work outstanding.
///
/// Lives in the pending map from the first scheduled mutation until the
/// response for the newest sequence settles.
struct PendingSync {
    /// Sequence number of the newest local mutation.
    seq: u64,
    /// A remote call for this identity is currently on the wire.
    in_flight: bool,
    /// A quiet period elapsed behind the in-flight call; the settling
    /// response re-fires the dispatch.
    deferred: bool,
}

impl PendingSync {
    fn new(seq: u64) -> Self {
        Self {
            seq,
            in_flight: false,
            deferred: false,
        }
    }
}

/// Shared cart state plus the machinery that keeps it synchronized.
pub(crate) struct SyncCoordinator {
    ledger: Mutex<CartLedger>,
    /// Sync bookkeeping per identity with remote work outstanding.
    pending: DashMap<ItemIdentity, PendingSync>,
    debouncer: Debouncer,
    remote: Arc<dyn RemoteCartService>,
    session: Arc<dyn SessionProvider>,
    config: SyncConfig,
    snapshot_tx: watch::Sender<CartSnapshot>,
    error_tx: watch::Sender<Option<CartError>>,
    revision: AtomicU64,
    seq: AtomicU64,
}

impl SyncCoordinator {
    pub fn new_shared(
        remote: Arc<dyn RemoteCartService>,
        session: Arc<dyn SessionProvider>,
        config: SyncConfig,
    ) -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(CartSnapshot::empty());
        let (error_tx, _) = watch::channel(None);
        Arc::new(Self {
            ledger: Mutex::new(CartLedger::new()),
            pending: DashMap::new(),
            debouncer: Debouncer::new(),
            remote,
            session,
            config,
            snapshot_tx,
            error_tx,
            revision: AtomicU64::new(0),
            seq: AtomicU64::new(0),
        })
    }

    fn lock_ledger(&self) -> MutexGuard<'_, CartLedger> {
        // Mutations keep the ledger valid even if a holder panicked.
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capture and publish the current ledger state.
    fn publish_snapshot(&self) {
        // Revision and publish stay under the ledger lock so receivers
        // never observe revisions out of order.
        let ledger = self.lock_ledger();
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.snapshot_tx.send_replace(ledger.snapshot(revision));
    }

    fn publish_error(&self, error: CartError) {
        self.error_tx.send_replace(Some(error));
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<CartError>> {
        self.error_tx.subscribe()
    }

    pub fn last_error(&self) -> Option<CartError> {
        self.error_tx.borrow().clone()
    }

    fn authenticated(&self) -> bool {
        self.session.current_customer_id().is_some()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Add units of a product to the cart.
    ///
    /// Merges into an existing line when the (product, size, variant)
    /// identity matches. Guest sessions keep the change local and settle
    /// the line as idle immediately.
    pub fn add(
        self: &Arc<Self>,
        product: ProductRef,
        quantity: Quantity,
        size: Option<&str>,
        variant: Option<&str>,
    ) {
        if quantity == 0 {
            tracing::debug!(product_id = %product.id, "add of zero units ignored");
            return;
        }
        if product.id.is_empty() {
            tracing::warn!("add rejected, product id is empty");
            self.publish_error(CartError::Validation("product id is required".to_string()));
            return;
        }

        let identity = identity_of(&product.id, size, variant);
        let authenticated = self.authenticated();
        {
            let mut ledger = self.lock_ledger();
            match ledger.find_by_identity_mut(&identity) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(quantity);
                    if authenticated {
                        existing.mark_pending();
                    } else {
                        existing.mark_idle();
                    }
                }
                None => {
                    let mut item = LineItem::new(
                        uuid::Uuid::new_v4().to_string(),
                        product,
                        quantity,
                        size,
                        variant,
                        now_millis(),
                    );
                    if !authenticated {
                        item.mark_idle();
                    }
                    ledger.upsert(item);
                }
            }
        }
        self.publish_snapshot();

        if authenticated {
            self.schedule_sync(&identity);
        } else {
            tracing::debug!(identity = %identity, "guest session, cart change stays local");
        }
    }

    /// Set a line's quantity outright. Zero removes the line; an unknown
    /// identity is ignored.
    pub fn update_quantity(
        self: &Arc<Self>,
        product_id: &str,
        quantity: Quantity,
        size: Option<&str>,
        variant: Option<&str>,
    ) {
        if quantity == 0 {
            self.remove(product_id, size, variant);
            return;
        }

        let identity = identity_of(product_id, size, variant);
        let authenticated = self.authenticated();
        let found = {
            let mut ledger = self.lock_ledger();
            match ledger.find_by_identity_mut(&identity) {
                Some(item) => {
                    item.quantity = quantity;
                    if authenticated {
                        item.mark_pending();
                    } else {
                        item.mark_idle();
                    }
                    true
                }
                None => false,
            }
        };
        if !found {
            tracing::debug!(identity = %identity, "update for a line not in the cart, ignored");
            return;
        }
        self.publish_snapshot();

        if authenticated {
            self.schedule_sync(&identity);
        }
    }

    /// Raise a line's quantity by one.
    pub fn increment(
        self: &Arc<Self>,
        product_id: &str,
        size: Option<&str>,
        variant: Option<&str>,
    ) {
        let identity = identity_of(product_id, size, variant);
        let current = {
            let ledger = self.lock_ledger();
            ledger.find_by_identity(&identity).map(|item| item.quantity)
        };
        let Some(current) = current else {
            tracing::debug!(identity = %identity, "increment for a line not in the cart, ignored");
            return;
        };
        self.update_quantity(product_id, current.saturating_add(1), size, variant);
    }

    /// Lower a line's quantity by one; reaching zero removes the line.
    pub fn decrement(
        self: &Arc<Self>,
        product_id: &str,
        size: Option<&str>,
        variant: Option<&str>,
    ) {
        let identity = identity_of(product_id, size, variant);
        let current = {
            let ledger = self.lock_ledger();
            ledger.find_by_identity(&identity).map(|item| item.quantity)
        };
        let Some(current) = current else {
            tracing::debug!(identity = %identity, "decrement for a line not in the cart, ignored");
            return;
        };
        self.update_quantity(product_id, current.saturating_sub(1), size, variant);
    }

    /// Drop a line locally and, for synced lines, remotely.
    ///
    /// The remote removal is terminal and low frequency, so it fires
    /// immediately instead of debouncing. Any scheduled add or update for
    /// the identity is discarded first.
    pub fn remove(self: &Arc<Self>, product_id: &str, size: Option<&str>, variant: Option<&str>) {
        let identity = identity_of(product_id, size, variant);
        // A scheduled add or update must never fire after removal.
        self.debouncer.cancel(identity.as_str());
        self.pending.remove(&identity);

        let removed = {
            let mut ledger = self.lock_ledger();
            ledger.remove_by_identity(&identity)
        };
        let Some(item) = removed else {
            tracing::debug!(identity = %identity, "remove for a line not in the cart, ignored");
            return;
        };
        self.publish_snapshot();

        if !self.authenticated() {
            return;
        }
        let Some(cart_item_id) = item.remote_id else {
            tracing::debug!(identity = %identity, "removed line never reached the server, no remote call");
            return;
        };

        let coordinator = Arc::clone(self);
        let product_id = item.product.id;
        tokio::spawn(async move {
            let request = RemoveItemRequest {
                cart_item_id,
                product_id,
            };
            if let Err(error) = coordinator.remote.remove_item(request).await {
                // The line is already gone locally; surface the failure on
                // the store-level channel instead of resurrecting it.
                tracing::error!(identity = %identity, error = %error, "remote remove failed");
                coordinator.publish_error(error);
            }
        });
    }

    /// Empty the cart locally and remove every synced line remotely.
    pub fn clear(self: &Arc<Self>) {
        self.debouncer.cancel_all();
        self.pending.clear();

        let drained = {
            let mut ledger = self.lock_ledger();
            ledger.clear()
        };
        if drained.is_empty() {
            tracing::debug!("clear of an empty cart, nothing to do");
            return;
        }
        self.publish_snapshot();

        if !self.authenticated() {
            return;
        }
        let targets: Vec<(RemoteId, ProductId)> = drained
            .into_iter()
            .filter_map(|item| {
                let product_id = item.product.id;
                item.remote_id.map(|cart_item_id| (cart_item_id, product_id))
            })
            .collect();
        if targets.is_empty() {
            return;
        }

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let attempted = targets.len();
            let removals = targets.into_iter().map(|(cart_item_id, product_id)| {
                let remote = Arc::clone(&coordinator.remote);
                async move {
                    remote
                        .remove_item(RemoveItemRequest {
                            cart_item_id,
                            product_id,
                        })
                        .await
                }
            });
            let results = futures::future::join_all(removals).await;

            let failed = results.iter().filter(|result| result.is_err()).count();
            if failed > 0 {
                tracing::error!(failed, attempted, "cart clear left lines on the server");
                coordinator.publish_error(CartError::ClearPartial { failed, attempted });
            } else {
                tracing::debug!(attempted, "cart cleared remotely");
            }
        });
    }

    /// Replace local state with the server's cart.
    ///
    /// Guest sessions are a no-op. Identities with remote work outstanding
    /// keep their pending mark on the fetched copy, and the eventual
    /// dispatch reads the fetched state.
    pub async fn fetch(self: &Arc<Self>) -> Result<()> {
        if !self.authenticated() {
            tracing::debug!("guest session, fetch skipped");
            return Ok(());
        }

        let mut remote_items = self.remote.list_items().await?;
        remote_items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let count = remote_items.len();

        {
            let mut ledger = self.lock_ledger();
            let items: Vec<LineItem> = remote_items
                .into_iter()
                .map(RemoteCartItem::into_line_item)
                .collect();
            ledger.replace_all(items);
            // A fetched copy must not erase the fact that a local change
            // is still outstanding for its identity.
            for entry in self.pending.iter() {
                if let Some(item) = ledger.find_by_identity_mut(entry.key()) {
                    item.mark_pending();
                }
            }
        }
        self.publish_snapshot();
        tracing::debug!(count, "cart rehydrated from server");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scheduling and reconciliation
    // ------------------------------------------------------------------

    /// Record a mutation and restart the identity's quiet period.
    fn schedule_sync(self: &Arc<Self>, identity: &ItemIdentity) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        match self.pending.entry(identity.clone()) {
            Entry::Occupied(mut entry) => {
                // Only the sequence moves forward; an in-flight mark stays
                // until its call settles, and the fresh timer owns the
                // re-fire from here.
                let record = entry.get_mut();
                record.seq = seq;
                record.deferred = false;
            }
            Entry::Vacant(entry) => {
                entry.insert(PendingSync::new(seq));
            }
        }

        let coordinator = Arc::clone(self);
        let dispatch_identity = identity.clone();
        self.debouncer
            .schedule(identity.as_str(), self.config.debounce_delay, async move {
                coordinator.dispatch(dispatch_identity).await;
            });
        tracing::debug!(identity = %identity, seq, "debounced sync scheduled");
    }

    /// Claim the identity for a remote call.
    ///
    /// Returns the sequence number to send, or `None` when nothing is
    /// pending or a call for this identity is already on the wire. A parked
    /// dispatch is re-fired by the settling response; issuing it now could
    /// send the same unconfirmed line as two adds.
    fn claim_dispatch(&self, identity: &ItemIdentity) -> Option<u64> {
        let mut record = self.pending.get_mut(identity)?;
        if record.in_flight {
            record.deferred = true;
            tracing::debug!(identity = %identity, "dispatch parked behind an in-flight call");
            return None;
        }
        record.in_flight = true;
        record.deferred = false;
        Some(record.seq)
    }

    /// Release a claim once its call settled or its dispatch bailed out.
    ///
    /// Returns `true` when `seq` was still the newest mutation; its record
    /// is removed. Otherwise the record stays for the newer mutation and a
    /// dispatch parked behind this call is re-fired.
    fn settle_claim(self: &Arc<Self>, identity: &ItemIdentity, seq: u64) -> bool {
        if self
            .pending
            .remove_if(identity, |_, record| record.seq == seq)
            .is_some()
        {
            return true;
        }
        let refire = {
            let Some(mut record) = self.pending.get_mut(identity) else {
                return false;
            };
            record.in_flight = false;
            std::mem::take(&mut record.deferred)
        };
        if refire {
            let coordinator = Arc::clone(self);
            let identity = identity.clone();
            tokio::spawn(async move {
                coordinator.dispatch(identity).await;
            });
        }
        false
    }

    /// Fire the remote call for an identity whose quiet period elapsed.
    ///
    /// Reads the line at fire time, so rapid taps inside the window collapse
    /// into one call carrying the final quantity. Whether this is an add or
    /// an update depends on whether the line has a server id yet.
    async fn dispatch(self: Arc<Self>, identity: ItemIdentity) {
        let Some(seq) = self.claim_dispatch(&identity) else {
            return;
        };

        if !self.authenticated() {
            // Signed out inside the window: the cart falls back to guest
            // behavior and the line settles locally.
            tracing::warn!(identity = %identity, "session ended before dispatch, keeping change local");
            self.settle_claim(&identity, seq);
            let mut ledger = self.lock_ledger();
            if let Some(item) = ledger.find_by_identity_mut(&identity) {
                item.mark_idle();
            }
            drop(ledger);
            self.publish_snapshot();
            return;
        }

        let current = {
            let ledger = self.lock_ledger();
            ledger.find_by_identity(&identity).cloned()
        };
        let Some(item) = current else {
            // The line left the ledger while the timer slept
            tracing::debug!(identity = %identity, "line vanished before dispatch, dropping sync");
            self.settle_claim(&identity, seq);
            return;
        };

        let quantity_sent = item.quantity;
        tracing::debug!(identity = %identity, quantity = quantity_sent, seq, "dispatching cart sync");

        let result = match item.remote_id {
            None => {
                let request = AddItemRequest {
                    product_id: item.product.id,
                    variant_id: item.selected_variant,
                    size: item.selected_size,
                    quantity: item.quantity,
                    unit_price: item.product.unit_price,
                };
                self.remote
                    .add_item(request)
                    .await
                    .map(ReconcileOutcome::Added)
            }
            Some(cart_item_id) => {
                let request = UpdateItemRequest {
                    cart_item_id,
                    product_id: item.product.id,
                    variant_id: item.selected_variant,
                    quantity: item.quantity,
                    unit_price: item.product.unit_price,
                };
                self.remote
                    .update_item(request)
                    .await
                    .map(|_| ReconcileOutcome::Updated)
            }
        };

        match result {
            Ok(outcome) => self.reconcile_success(&identity, seq, quantity_sent, outcome),
            Err(error) => self.reconcile_failure(&identity, seq, error),
        }
    }

    /// Merge a settled add or update back into the ledger.
    ///
    /// Server fields always merge. Idle is only reached when this response
    /// is the newest mutation and its quantity still matches the line; a
    /// newer local edit keeps the line pending for the dispatch behind it.
    fn reconcile_success(
        self: &Arc<Self>,
        identity: &ItemIdentity,
        seq: u64,
        quantity_sent: Quantity,
        outcome: ReconcileOutcome,
    ) {
        {
            let mut ledger = self.lock_ledger();
            let Some(item) = ledger.find_by_identity_mut(identity) else {
                drop(ledger);
                self.settle_claim(identity, seq);
                tracing::warn!(identity = %identity, "response for a line no longer in the cart, discarded");
                return;
            };

            if let ReconcileOutcome::Added(response) = outcome {
                item.adopt_remote(
                    response.server_id,
                    response.price,
                    response.name,
                    response.cover_image_url.as_deref(),
                );
            }

            // The claim settles under the ledger lock: a dispatch re-fired
            // here must see the adopted server id, never issue a second add.
            if self.settle_claim(identity, seq) && item.quantity == quantity_sent {
                item.mark_idle();
                tracing::debug!(identity = %identity, "cart line confirmed");
            } else {
                tracing::debug!(
                    identity = %identity,
                    quantity_sent,
                    quantity_now = item.quantity,
                    "newer local edit outstanding, line stays pending"
                );
            }
        }
        self.publish_snapshot();
    }

    /// Record a failed add or update.
    ///
    /// The optimistic quantity is kept; the error state is surfaced instead
    /// of rolling the line back. A later mutation reschedules and retries.
    fn reconcile_failure(self: &Arc<Self>, identity: &ItemIdentity, seq: u64, error: CartError) {
        let settled = self.settle_claim(identity, seq);
        tracing::error!(identity = %identity, error = %error, "cart sync failed");
        if !settled {
            // A newer mutation owns the line's state now; if its window
            // already elapsed, settle_claim re-fired its dispatch.
            return;
        }

        {
            let mut ledger = self.lock_ledger();
            if let Some(item) = ledger.find_by_identity_mut(identity) {
                item.mark_error(error.to_string());
            }
        }
        self.publish_snapshot();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn items(&self) -> Vec<LineItem> {
        self.lock_ledger().all().to_vec()
    }

    pub fn items_count(&self) -> Quantity {
        self.lock_ledger().items_count()
    }

    pub fn subtotal(&self) -> Money {
        self.lock_ledger().subtotal()
    }

    pub fn quantity_of(
        &self,
        product_id: &str,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Quantity {
        let identity = identity_of(product_id, size, variant);
        self.lock_ledger()
            .find_by_identity(&identity)
            .map_or(0, |item| item.quantity)
    }

    pub fn find_item(
        &self,
        product_id: &str,
        size: Option<&str>,
        variant: Option<&str>,
    ) -> Option<LineItem> {
        let identity = identity_of(product_id, size, variant);
        self.lock_ledger().find_by_identity(&identity).cloned()
    }

    pub fn contains_product(&self, product_id: &str) -> bool {
        self.lock_ledger()
            .all()
            .iter()
            .any(|item| item.product.id == product_id)
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
