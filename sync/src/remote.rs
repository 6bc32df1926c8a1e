//! Remote cart service seam and wire types.
//!
//! One request/response pair per operation keeps reconciliation code
//! exhaustively typed; nothing downstream touches loose payloads.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use trolley_engine::{LineItem, Money, ProductId, ProductRef, Quantity, RemoteId};

use crate::error::{CartError, Result};

/// Request to create a cart line on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub quantity: Quantity,
    pub unit_price: Money,
}

/// Server reply to a confirmed add.
///
/// Carries the authoritative identifier plus refreshed catalog fields; the
/// coordinator merges these into the optimistic line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemResponse {
    pub server_id: RemoteId,
    pub price: Money,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
}

/// Request to set an existing line's quantity on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub cart_item_id: RemoteId,
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub quantity: Quantity,
    pub unit_price: Money,
}

/// Request to delete a cart line on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub cart_item_id: RemoteId,
    pub product_id: ProductId,
}

/// One line of the server's cart view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartItem {
    pub server_id: RemoteId,
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub quantity: Quantity,
    pub price: Money,
    pub product_snapshot: ProductSnapshot,
    pub created_at: DateTime<Utc>,
}

/// Catalog fields the server attaches to a cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
}

impl RemoteCartItem {
    /// Convert to a ledger line under a fresh local id.
    pub fn into_line_item(self) -> LineItem {
        let product = ProductRef::new(
            self.product_id,
            self.product_snapshot.name,
            self.price,
            self.product_snapshot.cover_image_url.as_deref(),
        );
        LineItem::from_remote(
            uuid::Uuid::new_v4().to_string(),
            self.server_id,
            product,
            self.quantity,
            self.size.as_deref(),
            self.variant_id.as_deref(),
            self.created_at.timestamp_millis().max(0) as u64,
        )
    }
}

/// Network operations the cart sync layer invokes.
///
/// Implementations own transport, auth headers, and timeouts; failures
/// surface as [`CartError`] values.
#[async_trait]
pub trait RemoteCartService: Send + Sync {
    /// Create a cart line. Returns the server id and refreshed catalog fields.
    async fn add_item(&self, request: AddItemRequest) -> Result<AddItemResponse>;

    /// Set the quantity of an existing line.
    async fn update_item(&self, request: UpdateItemRequest) -> Result<()>;

    /// Delete a line.
    async fn remove_item(&self, request: RemoveItemRequest) -> Result<()>;

    /// The server's authoritative cart contents.
    async fn list_items(&self) -> Result<Vec<RemoteCartItem>>;
}

/// In-memory [`RemoteCartService`] backed by a product catalog.
///
/// Behaves like the real service for demos and tests: server ids are minted
/// per line, and price and display fields come from the catalog rather than
/// the caller, so reconciliation has something real to merge.
#[derive(Debug, Default)]
pub struct InMemoryRemoteCart {
    catalog: DashMap<ProductId, ProductRef>,
    items: DashMap<RemoteId, RemoteCartItem>,
}

impl InMemoryRemoteCart {
    /// Create an empty service with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// New instance wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a product the service can sell.
    pub fn insert_product(&self, product: ProductRef) {
        self.catalog.insert(product.id.clone(), product);
    }

    /// Number of lines currently stored.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Stored lines ordered by creation time.
    pub fn stored_items(&self) -> Vec<RemoteCartItem> {
        let mut items: Vec<RemoteCartItem> =
            self.items.iter().map(|entry| entry.value().clone()).collect();
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.server_id.cmp(&b.server_id))
        });
        items
    }
}

#[async_trait]
impl RemoteCartService for InMemoryRemoteCart {
    async fn add_item(&self, request: AddItemRequest) -> Result<AddItemResponse> {
        if request.product_id.is_empty() {
            return Err(CartError::Validation("productId is required".to_string()));
        }
        let product = self
            .catalog
            .get(&request.product_id)
            .ok_or_else(|| CartError::NotFound(request.product_id.clone()))?;

        let server_id = uuid::Uuid::new_v4().to_string();
        let item = RemoteCartItem {
            server_id: server_id.clone(),
            product_id: request.product_id.clone(),
            variant_id: request.variant_id,
            size: request.size,
            quantity: request.quantity,
            price: product.unit_price,
            product_snapshot: ProductSnapshot {
                name: product.name.clone(),
                cover_image_url: product.image_url.clone(),
            },
            created_at: Utc::now(),
        };
        let response = AddItemResponse {
            server_id: server_id.clone(),
            price: product.unit_price,
            name: product.name.clone(),
            cover_image_url: product.image_url.clone(),
        };
        drop(product);

        self.items.insert(server_id, item);
        Ok(response)
    }

    async fn update_item(&self, request: UpdateItemRequest) -> Result<()> {
        if request.cart_item_id.is_empty() {
            return Err(CartError::Validation("cartItemId is required".to_string()));
        }
        let mut item = self
            .items
            .get_mut(&request.cart_item_id)
            .ok_or_else(|| CartError::NotFound(request.cart_item_id.clone()))?;
        item.quantity = request.quantity;
        Ok(())
    }

    async fn remove_item(&self, request: RemoveItemRequest) -> Result<()> {
        self.items
            .remove(&request.cart_item_id)
            .map(|_| ())
            .ok_or_else(|| CartError::NotFound(request.cart_item_id.clone()))
    }

    async fn list_items(&self) -> Result<Vec<RemoteCartItem>> {
        Ok(self.stored_items())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_tote() -> InMemoryRemoteCart {
        let service = InMemoryRemoteCart::new();
        service.insert_product(ProductRef::new(
            "prod_tote",
            "Canvas Tote",
            Money::from_minor(2_500),
            Some("https://cdn.example.com/tote.jpg"),
        ));
        service
    }

    fn add_request(product_id: &str, quantity: Quantity) -> AddItemRequest {
        AddItemRequest {
            product_id: product_id.to_string(),
            variant_id: None,
            size: Some("M".to_string()),
            quantity,
            unit_price: Money::from_minor(1),
        }
    }

    #[tokio::test]
    async fn test_add_answers_with_catalog_fields() {
        let service = service_with_tote();

        // The request's stale price is ignored; the catalog wins
        let response = service.add_item(add_request("prod_tote", 2)).await.unwrap();

        assert!(!response.server_id.is_empty());
        assert_eq!(response.price, Money::from_minor(2_500));
        assert_eq!(response.name, "Canvas Tote");
        assert_eq!(
            response.cover_image_url.as_deref(),
            Some("https://cdn.example.com/tote.jpg")
        );
        assert_eq!(service.item_count(), 1);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let service = service_with_tote();

        let err = service.add_item(add_request("prod_ghost", 1)).await.unwrap_err();
        assert_eq!(err, CartError::NotFound("prod_ghost".to_string()));
    }

    #[tokio::test]
    async fn test_add_without_product_id_is_rejected() {
        let service = service_with_tote();

        let err = service.add_item(add_request("", 1)).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        assert_eq!(service.item_count(), 0);
    }

    #[tokio::test]
    async fn test_update_sets_quantity() {
        let service = service_with_tote();
        let added = service.add_item(add_request("prod_tote", 2)).await.unwrap();

        service
            .update_item(UpdateItemRequest {
                cart_item_id: added.server_id.clone(),
                product_id: "prod_tote".to_string(),
                variant_id: None,
                quantity: 7,
                unit_price: Money::from_minor(2_500),
            })
            .await
            .unwrap();

        let items = service.list_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 7);
    }

    #[tokio::test]
    async fn test_update_unknown_line_is_not_found() {
        let service = service_with_tote();

        let err = service
            .update_item(UpdateItemRequest {
                cart_item_id: "srv_ghost".to_string(),
                product_id: "prod_tote".to_string(),
                variant_id: None,
                quantity: 1,
                unit_price: Money::ZERO,
            })
            .await
            .unwrap_err();
        assert_eq!(err, CartError::NotFound("srv_ghost".to_string()));
    }

    #[tokio::test]
    async fn test_remove_deletes_line() {
        let service = service_with_tote();
        let added = service.add_item(add_request("prod_tote", 1)).await.unwrap();

        service
            .remove_item(RemoveItemRequest {
                cart_item_id: added.server_id.clone(),
                product_id: "prod_tote".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(service.item_count(), 0);

        let err = service
            .remove_item(RemoveItemRequest {
                cart_item_id: added.server_id,
                product_id: "prod_tote".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_orders_by_creation() {
        let service = service_with_tote();
        service.insert_product(ProductRef::new(
            "prod_mug",
            "Camp Mug",
            Money::from_minor(1_200),
            None,
        ));

        service.add_item(add_request("prod_tote", 1)).await.unwrap();
        service.add_item(add_request("prod_mug", 2)).await.unwrap();

        let items = service.list_items().await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].created_at <= items[1].created_at);
    }

    #[test]
    fn test_into_line_item_maps_fields() {
        let remote = RemoteCartItem {
            server_id: "srv_9".to_string(),
            product_id: "prod_tote".to_string(),
            variant_id: Some("green".to_string()),
            size: Some("M".to_string()),
            quantity: 3,
            price: Money::from_minor(2_500),
            product_snapshot: ProductSnapshot {
                name: "Canvas Tote".to_string(),
                cover_image_url: None,
            },
            created_at: DateTime::from_timestamp_millis(1_706_745_600_000).unwrap(),
        };

        let item = remote.into_line_item();

        assert_eq!(item.remote_id.as_deref(), Some("srv_9"));
        assert_eq!(item.product.id, "prod_tote");
        assert_eq!(item.product.name, "Canvas Tote");
        assert_eq!(item.quantity, 3);
        assert_eq!(item.selected_size.as_deref(), Some("M"));
        assert_eq!(item.selected_variant.as_deref(), Some("green"));
        assert_eq!(item.added_at, 1_706_745_600_000);
        assert!(item.sync_state.is_idle());
        assert!(!item.local_id.is_empty());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let request = AddItemRequest {
            product_id: "prod_1".to_string(),
            variant_id: None,
            size: Some("M".to_string()),
            quantity: 2,
            unit_price: Money::from_minor(2_500),
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["productId"], "prod_1");
        assert_eq!(json["unitPrice"], 2_500);
        // Absent optionals are omitted, not null
        assert!(json.get("variantId").is_none());

        let response: AddItemResponse = serde_json::from_str(
            r#"{"serverId":"srv_1","price":2500,"name":"Canvas Tote"}"#,
        )
        .unwrap();
        assert_eq!(response.server_id, "srv_1");
        assert_eq!(response.cover_image_url, None);
    }
}
