use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    cart::{CartChange, CartError, LineItemOutcome},
    models::{CartId, CartProductDetail, Product, ProductId},
    money::Money,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: i32,
    pub size: String,
}

/// Target of a plus/minus button.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItemRequest {
    pub product_id: ProductId,
    pub size: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemDto {
    pub product: Product,
    pub quantity: i32,
    pub size: String,
    pub line_total: Money,
}

impl TryFrom<CartProductDetail> for CartItemDto {
    type Error = CartError;

    fn try_from(detail: CartProductDetail) -> Result<Self, Self::Error> {
        let line_total = detail.line_total().ok_or(CartError::AmountOverflow)?;
        Ok(Self {
            product: detail.product,
            quantity: detail.quantity,
            size: detail.size,
            line_total,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItemDto>,
    pub total: Money,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartTotal {
    pub total: Money,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CartItemStatus {
    Inserted,
    Updated,
    Deleted,
    Unchanged,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemChange {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub size: String,
    pub status: CartItemStatus,
    /// Quantity after the change; 0 when the row is gone.
    pub quantity: i32,
}

impl CartItemChange {
    pub fn new(product_id: ProductId, size: String, change: CartChange) -> Self {
        let (status, quantity) = match change.outcome {
            LineItemOutcome::Inserted { quantity } => (CartItemStatus::Inserted, quantity),
            LineItemOutcome::Updated { quantity } => (CartItemStatus::Updated, quantity),
            LineItemOutcome::Deleted => (CartItemStatus::Deleted, 0),
            LineItemOutcome::Unchanged => (CartItemStatus::Unchanged, 0),
        };
        Self {
            cart_id: change.cart_id,
            product_id,
            size,
            status,
            quantity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearedCart {
    pub removed: u64,
}
