//! Ports onto the remote data backend.
//!
//! Each trait covers one family of tables and names its filters explicitly,
//! so callers never decode ad hoc rows. [`postgres::PgGateway`] talks to the
//! real database; [`memory::MemoryGateway`] keeps everything in process.
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    models::{
        Cart, CartId, CartLineItem, CartProductDetail, CartStatus, Category, Order, OrderId,
        OrderItem, Product, ProductId, SearchHistoryEntry, UserProfile,
    },
    money::Money,
};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("ORM error: {0}")]
    Orm(#[from] sea_orm::DbErr),

    #[error("Database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("expected a row back from {table}")]
    Missing { table: &'static str },

    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Conflict(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

fn category_in_use(id: i64) -> GatewayError {
    GatewayError::Conflict(format!("category {id} still has products"))
}

#[derive(Debug, Clone)]
pub struct NewCart {
    pub user_id: String,
    pub status: CartStatus,
}

/// Identity of a line item: one row per (cart, product, size).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineItemKey {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub size: String,
}

#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
    pub size: String,
}

/// The mutable part of a line item. Identity columns are never rewritten.
#[derive(Debug, Clone, Copy)]
pub struct LineItemPatch {
    pub quantity: i32,
    pub unit_price: Money,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub total_amount: Money,
    pub status: String,
    pub address_shipping: String,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
    pub selected_size: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub oldest_first: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Products are always returned best rated first.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub title_contains: Option<String>,
    pub brand: Option<i64>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub pic_url: Vec<String>,
    pub brand: i64,
    pub price: Decimal,
    pub rating: Option<f64>,
    pub size: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub pic_url: Option<Vec<String>>,
    pub brand: Option<i64>,
    pub price: Option<Decimal>,
    pub rating: Option<f64>,
    pub size: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub pic_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub pic_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
}

#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Newest cart with status `active` for the user.
    async fn find_active_cart(&self, user_id: &str) -> GatewayResult<Option<Cart>>;

    async fn insert_cart(&self, cart: NewCart) -> GatewayResult<Cart>;

    async fn set_cart_status(&self, cart_id: CartId, status: CartStatus) -> GatewayResult<()>;

    async fn find_line_item(&self, key: &LineItemKey) -> GatewayResult<Option<CartLineItem>>;

    async fn insert_line_item(&self, item: NewLineItem) -> GatewayResult<CartLineItem>;

    async fn update_line_item(&self, id: i64, patch: LineItemPatch) -> GatewayResult<()>;

    async fn delete_line_item(&self, id: i64) -> GatewayResult<()>;

    /// Removes every line of the cart and returns how many went.
    async fn delete_cart_items(&self, cart_id: CartId) -> GatewayResult<u64>;

    /// Line items joined with their product row, in one round trip.
    async fn list_cart_details(&self, cart_id: CartId) -> GatewayResult<Vec<CartProductDetail>>;
}

#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn insert_order(&self, order: NewOrder) -> GatewayResult<Order>;

    async fn insert_order_items(&self, items: Vec<NewOrderItem>) -> GatewayResult<()>;

    /// Deletes the order's items, then the order itself.
    async fn delete_order(&self, id: OrderId) -> GatewayResult<u64>;

    async fn list_orders(&self, filter: &OrderFilter) -> GatewayResult<Vec<Order>>;

    async fn count_orders(&self, filter: &OrderFilter) -> GatewayResult<u64>;

    async fn find_order(&self, id: OrderId) -> GatewayResult<Option<Order>>;

    async fn list_order_items(&self, order_id: OrderId) -> GatewayResult<Vec<OrderItem>>;

    async fn update_order_status(&self, id: OrderId, status: &str) -> GatewayResult<Option<Order>>;
}

#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn list_products(&self, filter: &ProductFilter) -> GatewayResult<Vec<Product>>;

    async fn count_products(&self, filter: &ProductFilter) -> GatewayResult<u64>;

    async fn find_product(&self, id: ProductId) -> GatewayResult<Option<Product>>;

    async fn insert_product(&self, product: NewProduct) -> GatewayResult<Product>;

    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> GatewayResult<Option<Product>>;

    async fn delete_product(&self, id: ProductId) -> GatewayResult<u64>;

    async fn list_categories(&self) -> GatewayResult<Vec<Category>>;

    async fn find_category(&self, id: i64) -> GatewayResult<Option<Category>>;

    async fn insert_category(&self, category: NewCategory) -> GatewayResult<Category>;

    async fn update_category(
        &self,
        id: i64,
        patch: CategoryPatch,
    ) -> GatewayResult<Option<Category>>;

    async fn delete_category(&self, id: i64) -> GatewayResult<u64>;

    async fn insert_search_history(
        &self,
        user_id: &str,
        query: &str,
    ) -> GatewayResult<SearchHistoryEntry>;

    /// Most recent searches first.
    async fn list_search_history(
        &self,
        user_id: &str,
        limit: u64,
    ) -> GatewayResult<Vec<SearchHistoryEntry>>;
}

#[async_trait]
pub trait ProfileGateway: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> GatewayResult<Option<UserProfile>>;

    async fn list_profiles(&self) -> GatewayResult<Vec<UserProfile>>;

    async fn insert_profile(&self, profile: NewProfile) -> GatewayResult<UserProfile>;

    async fn update_profile(
        &self,
        user_id: &str,
        patch: ProfilePatch,
    ) -> GatewayResult<Option<UserProfile>>;

    async fn delete_profile(&self, user_id: &str) -> GatewayResult<u64>;
}

/// Everything the HTTP surface needs from one backend.
pub trait Gateway: CartGateway + OrderGateway + CatalogGateway + ProfileGateway {}

impl<T> Gateway for T where T: CartGateway + OrderGateway + CatalogGateway + ProfileGateway {}
