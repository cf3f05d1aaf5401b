use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    CartGateway, CatalogGateway, CategoryPatch, GatewayError, GatewayResult, LineItemKey,
    LineItemPatch, NewCart, NewCategory, NewLineItem, NewOrder, NewOrderItem, NewProduct,
    NewProfile, OrderFilter, OrderGateway, ProductFilter, ProductPatch, ProfileGateway,
    ProfilePatch, category_in_use,
};
use crate::models::{
    Cart, CartId, CartLineItem, CartProductDetail, CartStatus, Category, Order, OrderId,
    OrderItem, Product, ProductId, SearchHistoryEntry, UserProfile,
};

/// Cart and order operations that can be counted or made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    FindActiveCart,
    InsertCart,
    SetCartStatus,
    FindLineItem,
    InsertLineItem,
    UpdateLineItem,
    DeleteLineItem,
    DeleteCartItems,
    ListCartDetails,
    InsertOrder,
    InsertOrderItems,
    DeleteOrder,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    carts: Vec<Cart>,
    cart_items: Vec<CartLineItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    products: Vec<Product>,
    categories: Vec<Category>,
    profiles: Vec<UserProfile>,
    search_history: Vec<SearchHistoryEntry>,
    calls: HashMap<GatewayOp, usize>,
    faults: HashMap<GatewayOp, String>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process backend with the same uniqueness rules as the SQL schema.
///
/// Faults are one-shot: `fail_next(op, ..)` makes the next call of `op`
/// return [`GatewayError::Unavailable`]. With interleaving enabled every
/// call yields to the scheduler first, so concurrent callers really do
/// interleave between a read and the following write.
#[derive(Default)]
pub struct MemoryGateway {
    tables: Mutex<Tables>,
    interleave: bool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interleaving() -> Self {
        Self {
            tables: Mutex::default(),
            interleave: true,
        }
    }

    pub fn fail_next(&self, op: GatewayOp, message: impl Into<String>) {
        self.lock().faults.insert(op, message.into());
    }

    pub fn calls(&self, op: GatewayOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn seed_product(&self, product: NewProduct) -> Product {
        insert_product_row(&mut self.lock(), product)
    }

    pub fn seed_category(&self, category: NewCategory) -> Category {
        insert_category_row(&mut self.lock(), category)
    }

    pub fn seed_profile(&self, profile: NewProfile) -> UserProfile {
        insert_profile_row(&mut self.lock(), profile)
    }

    pub fn set_product_price(&self, id: ProductId, price: rust_decimal::Decimal) {
        if let Some(product) = self.lock().products.iter_mut().find(|p| p.id == id) {
            product.price = price;
        }
    }

    pub fn carts(&self) -> Vec<Cart> {
        self.lock().carts.clone()
    }

    pub fn cart_items(&self) -> Vec<CartLineItem> {
        self.lock().cart_items.clone()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    pub fn order_items(&self) -> Vec<OrderItem> {
        self.lock().order_items.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, op: GatewayOp) -> GatewayResult<MutexGuard<'_, Tables>> {
        if self.interleave {
            tokio::task::yield_now().await;
        }
        let mut tables = self.lock();
        *tables.calls.entry(op).or_default() += 1;
        if let Some(message) = tables.faults.remove(&op) {
            return Err(GatewayError::Unavailable(message));
        }
        Ok(tables)
    }

    async fn tables(&self) -> MutexGuard<'_, Tables> {
        if self.interleave {
            tokio::task::yield_now().await;
        }
        self.lock()
    }
}

#[async_trait]
impl CartGateway for MemoryGateway {
    async fn find_active_cart(&self, user_id: &str) -> GatewayResult<Option<Cart>> {
        let tables = self.enter(GatewayOp::FindActiveCart).await?;
        let cart = tables
            .carts
            .iter()
            .filter(|c| c.user_id == user_id && c.status == CartStatus::Active)
            .max_by_key(|c| (c.created_at, c.id))
            .cloned();
        Ok(cart)
    }

    async fn insert_cart(&self, cart: NewCart) -> GatewayResult<Cart> {
        let mut tables = self.enter(GatewayOp::InsertCart).await?;
        if cart.status == CartStatus::Active
            && tables
                .carts
                .iter()
                .any(|c| c.user_id == cart.user_id && c.status == CartStatus::Active)
        {
            return Err(GatewayError::Unavailable(format!(
                "duplicate active cart for user {}",
                cart.user_id
            )));
        }
        let row = Cart {
            id: tables.next_id(),
            user_id: cart.user_id,
            status: cart.status,
            created_at: Utc::now(),
        };
        tables.carts.push(row.clone());
        Ok(row)
    }

    async fn set_cart_status(&self, cart_id: CartId, status: CartStatus) -> GatewayResult<()> {
        let mut tables = self.enter(GatewayOp::SetCartStatus).await?;
        if let Some(cart) = tables.carts.iter_mut().find(|c| c.id == cart_id) {
            cart.status = status;
        }
        Ok(())
    }

    async fn find_line_item(&self, key: &LineItemKey) -> GatewayResult<Option<CartLineItem>> {
        let tables = self.enter(GatewayOp::FindLineItem).await?;
        let item = tables
            .cart_items
            .iter()
            .find(|i| {
                i.cart_id == key.cart_id && i.product_id == key.product_id && i.size == key.size
            })
            .cloned();
        Ok(item)
    }

    async fn insert_line_item(&self, item: NewLineItem) -> GatewayResult<CartLineItem> {
        let mut tables = self.enter(GatewayOp::InsertLineItem).await?;
        if tables.cart_items.iter().any(|i| {
            i.cart_id == item.cart_id && i.product_id == item.product_id && i.size == item.size
        }) {
            return Err(GatewayError::Unavailable(
                "duplicate key on cart_items (cart_id, product_id, size)".to_string(),
            ));
        }
        let row = CartLineItem {
            id: tables.next_id(),
            cart_id: item.cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            size: item.size,
        };
        tables.cart_items.push(row.clone());
        Ok(row)
    }

    async fn update_line_item(&self, id: i64, patch: LineItemPatch) -> GatewayResult<()> {
        let mut tables = self.enter(GatewayOp::UpdateLineItem).await?;
        if let Some(item) = tables.cart_items.iter_mut().find(|i| i.id == id) {
            item.quantity = patch.quantity;
            item.unit_price = patch.unit_price;
        }
        Ok(())
    }

    async fn delete_line_item(&self, id: i64) -> GatewayResult<()> {
        let mut tables = self.enter(GatewayOp::DeleteLineItem).await?;
        tables.cart_items.retain(|i| i.id != id);
        Ok(())
    }

    async fn delete_cart_items(&self, cart_id: CartId) -> GatewayResult<u64> {
        let mut tables = self.enter(GatewayOp::DeleteCartItems).await?;
        let before = tables.cart_items.len();
        tables.cart_items.retain(|i| i.cart_id != cart_id);
        Ok((before - tables.cart_items.len()) as u64)
    }

    async fn list_cart_details(&self, cart_id: CartId) -> GatewayResult<Vec<CartProductDetail>> {
        let tables = self.enter(GatewayOp::ListCartDetails).await?;
        let details = tables
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .filter_map(|i| {
                let product = tables.products.iter().find(|p| p.id == i.product_id)?;
                Some(CartProductDetail {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    size: i.size.clone(),
                    product: product.clone(),
                })
            })
            .collect();
        Ok(details)
    }
}

#[async_trait]
impl OrderGateway for MemoryGateway {
    async fn insert_order(&self, order: NewOrder) -> GatewayResult<Order> {
        let mut tables = self.enter(GatewayOp::InsertOrder).await?;
        let row = Order {
            id: tables.next_id(),
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: order.status,
            address_shipping: order.address_shipping,
            created_at: Utc::now(),
        };
        tables.orders.push(row.clone());
        Ok(row)
    }

    async fn insert_order_items(&self, items: Vec<NewOrderItem>) -> GatewayResult<()> {
        let mut tables = self.enter(GatewayOp::InsertOrderItems).await?;
        for item in items {
            let id = tables.next_id();
            tables.order_items.push(OrderItem {
                id,
                order_id: item.order_id,
                product_id: Some(item.product_id),
                quantity: item.quantity,
                unit_price: item.unit_price,
                selected_size: item.selected_size,
                product: None,
            });
        }
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> GatewayResult<u64> {
        let mut tables = self.enter(GatewayOp::DeleteOrder).await?;
        tables.order_items.retain(|i| i.order_id != id);
        let before = tables.orders.len();
        tables.orders.retain(|o| o.id != id);
        Ok((before - tables.orders.len()) as u64)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> GatewayResult<Vec<Order>> {
        let tables = self.tables().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| order_matches(o, filter))
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.created_at, o.id));
        if !filter.oldest_first {
            orders.reverse();
        }
        Ok(paginate(orders, filter.limit, filter.offset))
    }

    async fn count_orders(&self, filter: &OrderFilter) -> GatewayResult<u64> {
        let tables = self.tables().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| order_matches(o, filter))
            .count() as u64)
    }

    async fn find_order(&self, id: OrderId) -> GatewayResult<Option<Order>> {
        let tables = self.tables().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_order_items(&self, order_id: OrderId) -> GatewayResult<Vec<OrderItem>> {
        let tables = self.tables().await;
        let items = tables
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .map(|i| OrderItem {
                product: i
                    .product_id
                    .and_then(|id| tables.products.iter().find(|p| p.id == id))
                    .cloned(),
                ..i.clone()
            })
            .collect();
        Ok(items)
    }

    async fn update_order_status(&self, id: OrderId, status: &str) -> GatewayResult<Option<Order>> {
        let mut tables = self.tables().await;
        let order = tables.orders.iter_mut().find(|o| o.id == id).map(|o| {
            o.status = status.to_string();
            o.clone()
        });
        Ok(order)
    }
}

#[async_trait]
impl CatalogGateway for MemoryGateway {
    async fn list_products(&self, filter: &ProductFilter) -> GatewayResult<Vec<Product>> {
        let tables = self.tables().await;
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| product_matches(p, filter))
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            b.rating
                .unwrap_or(f64::MIN)
                .total_cmp(&a.rating.unwrap_or(f64::MIN))
                .then(a.id.cmp(&b.id))
        });
        Ok(paginate(products, filter.limit, filter.offset))
    }

    async fn count_products(&self, filter: &ProductFilter) -> GatewayResult<u64> {
        let tables = self.tables().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| product_matches(p, filter))
            .count() as u64)
    }

    async fn find_product(&self, id: ProductId) -> GatewayResult<Option<Product>> {
        let tables = self.tables().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> GatewayResult<Product> {
        let mut tables = self.tables().await;
        Ok(insert_product_row(&mut tables, product))
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> GatewayResult<Option<Product>> {
        let mut tables = self.tables().await;
        let product = tables.products.iter_mut().find(|p| p.id == id).map(|p| {
            if let Some(title) = patch.title {
                p.title = Some(title);
            }
            if let Some(description) = patch.description {
                p.description = description;
            }
            if let Some(pic_url) = patch.pic_url {
                p.pic_url = pic_url;
            }
            if let Some(brand) = patch.brand {
                p.brand = brand;
            }
            if let Some(price) = patch.price {
                p.price = price;
            }
            if let Some(rating) = patch.rating {
                p.rating = Some(rating);
            }
            if let Some(size) = patch.size {
                p.size = size;
            }
            p.clone()
        });
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> GatewayResult<u64> {
        let mut tables = self.tables().await;
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        let removed = (before - tables.products.len()) as u64;
        if removed > 0 {
            tables.cart_items.retain(|i| i.product_id != id);
            for item in tables.order_items.iter_mut() {
                if item.product_id == Some(id) {
                    item.product_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn list_categories(&self) -> GatewayResult<Vec<Category>> {
        let tables = self.tables().await;
        Ok(tables.categories.clone())
    }

    async fn find_category(&self, id: i64) -> GatewayResult<Option<Category>> {
        let tables = self.tables().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_category(&self, category: NewCategory) -> GatewayResult<Category> {
        let mut tables = self.tables().await;
        Ok(insert_category_row(&mut tables, category))
    }

    async fn update_category(
        &self,
        id: i64,
        patch: CategoryPatch,
    ) -> GatewayResult<Option<Category>> {
        let mut tables = self.tables().await;
        let category = tables.categories.iter_mut().find(|c| c.id == id).map(|c| {
            if let Some(name) = patch.name {
                c.name = name;
            }
            if let Some(pic_url) = patch.pic_url {
                c.pic_url = Some(pic_url);
            }
            c.clone()
        });
        Ok(category)
    }

    async fn delete_category(&self, id: i64) -> GatewayResult<u64> {
        let mut tables = self.tables().await;
        if tables.products.iter().any(|p| p.brand == id) {
            return Err(category_in_use(id));
        }
        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        Ok((before - tables.categories.len()) as u64)
    }

    async fn insert_search_history(
        &self,
        user_id: &str,
        query: &str,
    ) -> GatewayResult<SearchHistoryEntry> {
        let mut tables = self.tables().await;
        let row = SearchHistoryEntry {
            id: tables.next_id(),
            user_id: user_id.to_string(),
            query: query.to_string(),
            created_at: Utc::now(),
        };
        tables.search_history.push(row.clone());
        Ok(row)
    }

    async fn list_search_history(
        &self,
        user_id: &str,
        limit: u64,
    ) -> GatewayResult<Vec<SearchHistoryEntry>> {
        let tables = self.tables().await;
        let mut entries: Vec<SearchHistoryEntry> = tables
            .search_history
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse((e.created_at, e.id)));
        Ok(paginate(entries, Some(limit), None))
    }
}

#[async_trait]
impl ProfileGateway for MemoryGateway {
    async fn find_profile(&self, user_id: &str) -> GatewayResult<Option<UserProfile>> {
        let tables = self.tables().await;
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn list_profiles(&self) -> GatewayResult<Vec<UserProfile>> {
        let tables = self.tables().await;
        Ok(tables.profiles.clone())
    }

    async fn insert_profile(&self, profile: NewProfile) -> GatewayResult<UserProfile> {
        let mut tables = self.tables().await;
        if tables.profiles.iter().any(|p| p.user_id == profile.user_id) {
            return Err(GatewayError::Unavailable(format!(
                "duplicate profile {}",
                profile.user_id
            )));
        }
        Ok(insert_profile_row(&mut tables, profile))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        patch: ProfilePatch,
    ) -> GatewayResult<Option<UserProfile>> {
        let mut tables = self.tables().await;
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .map(|p| {
                if let Some(first_name) = patch.first_name {
                    p.first_name = first_name;
                }
                if let Some(last_name) = patch.last_name {
                    p.last_name = last_name;
                }
                if let Some(phone) = patch.phone {
                    p.phone = Some(phone);
                }
                if let Some(address) = patch.address {
                    p.address = Some(address);
                }
                if let Some(email) = patch.email {
                    p.email = Some(email);
                }
                if let Some(is_admin) = patch.is_admin {
                    p.is_admin = is_admin;
                }
                p.clone()
            });
        Ok(profile)
    }

    async fn delete_profile(&self, user_id: &str) -> GatewayResult<u64> {
        let mut tables = self.tables().await;
        let before = tables.profiles.len();
        tables.profiles.retain(|p| p.user_id != user_id);
        Ok((before - tables.profiles.len()) as u64)
    }
}

fn insert_product_row(tables: &mut Tables, product: NewProduct) -> Product {
    let row = Product {
        id: tables.next_id(),
        title: Some(product.title),
        description: product.description,
        pic_url: product.pic_url,
        brand: product.brand,
        price: product.price,
        rating: product.rating,
        size: product.size,
    };
    tables.products.push(row.clone());
    row
}

fn insert_category_row(tables: &mut Tables, category: NewCategory) -> Category {
    let row = Category {
        id: tables.next_id(),
        name: category.name,
        pic_url: category.pic_url,
    };
    tables.categories.push(row.clone());
    row
}

fn insert_profile_row(tables: &mut Tables, profile: NewProfile) -> UserProfile {
    let row = UserProfile {
        user_id: profile.user_id,
        first_name: profile.first_name,
        last_name: profile.last_name,
        phone: profile.phone,
        address: profile.address,
        email: profile.email,
        is_admin: profile.is_admin,
        created_at: Utc::now(),
    };
    tables.profiles.push(row.clone());
    row
}

fn order_matches(order: &Order, filter: &OrderFilter) -> bool {
    filter.user_id.as_ref().is_none_or(|u| &order.user_id == u)
        && filter
            .status
            .as_ref()
            .filter(|s| !s.is_empty())
            .is_none_or(|s| &order.status == s)
}

fn product_matches(product: &Product, filter: &ProductFilter) -> bool {
    let title_ok = match filter.title_contains.as_ref().filter(|s| !s.is_empty()) {
        Some(needle) => product
            .title
            .as_ref()
            .is_some_and(|t| t.to_lowercase().contains(&needle.to_lowercase())),
        None => true,
    };
    title_ok && filter.brand.is_none_or(|b| product.brand == b)
}

fn paginate<T>(rows: Vec<T>, limit: Option<u64>, offset: Option<u64>) -> Vec<T> {
    let offset = offset.unwrap_or(0) as usize;
    let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}
