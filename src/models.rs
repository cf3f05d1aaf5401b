use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::money::Money;

pub type CartId = i64;
pub type OrderId = i64;
pub type ProductId = i64;

/// Initial status of every order created by checkout.
pub const ORDER_STATUS_PENDING: &str = "Pendiente";
pub const ORDER_STATUS_IN_TRANSIT: &str = "en_camino";
pub const ORDER_STATUS_DELIVERED: &str = "entregado";

pub const ORDER_STATUSES: [&str; 3] = [
    ORDER_STATUS_PENDING,
    ORDER_STATUS_IN_TRANSIT,
    ORDER_STATUS_DELIVERED,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    Active,
    Completed,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(CartStatus::Active),
            "completed" => Some(CartStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: CartId,
    pub user_id: String,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
}

/// One (product, size) selection inside a cart.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLineItem {
    pub id: i64,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// Catalog price at the time of the last mutation.
    pub unit_price: Money,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: ProductId,
    pub title: Option<String>,
    pub description: String,
    pub pic_url: Vec<String>,
    pub brand: i64,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub rating: Option<f64>,
    pub size: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub pic_url: Option<String>,
}

/// A cart line joined with its live catalog row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartProductDetail {
    pub product_id: ProductId,
    pub quantity: i32,
    pub size: String,
    pub product: Product,
}

impl CartProductDetail {
    /// Live price times quantity; `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        Money::from_decimal(self.product.price).checked_times(self.quantity)
    }
}

/// A line handed to checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
    pub size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    pub total_amount: Money,
    pub status: String,
    pub address_shipping: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    /// `None` once the product has been deleted from the catalog.
    pub product_id: Option<ProductId>,
    pub quantity: i32,
    pub unit_price: Money,
    pub selected_size: Option<String>,
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchHistoryEntry {
    pub id: i64,
    pub user_id: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
}
