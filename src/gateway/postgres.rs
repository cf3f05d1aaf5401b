use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use sqlx::{FromRow, PgPool};

use super::{
    CartGateway, CatalogGateway, CategoryPatch, GatewayError, GatewayResult, LineItemKey,
    LineItemPatch, NewCart, NewCategory, NewLineItem, NewOrder, NewOrderItem, NewProduct,
    NewProfile, OrderFilter, OrderGateway, ProductFilter, ProductPatch, ProfileGateway,
    ProfilePatch, category_in_use,
};
use crate::{
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        categories::{
            ActiveModel as CategoryActive, Entity as Categories, Model as CategoryModel,
        },
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
        profiles::{ActiveModel as ProfileActive, Entity as Profiles, Model as ProfileModel},
        search_history::{
            ActiveModel as SearchActive, Column as SearchCol, Entity as SearchHistory,
            Model as SearchModel,
        },
    },
    models::{
        Cart, CartId, CartLineItem, CartProductDetail, CartStatus, Category, Order, OrderId,
        OrderItem, Product, ProductId, SearchHistoryEntry, UserProfile,
    },
    money::Money,
};

/// Gateway backed by Postgres: sea-orm for single-table work, raw sqlx for joins.
#[derive(Clone)]
pub struct PgGateway {
    orm: DatabaseConnection,
}

impl PgGateway {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }

    pub fn orm(&self) -> &DatabaseConnection {
        &self.orm
    }

    fn pool(&self) -> &PgPool {
        self.orm.get_postgres_connection_pool()
    }
}

#[derive(FromRow)]
struct CartDetailRow {
    product_id: i64,
    quantity: i32,
    size: String,
    title: Option<String>,
    description: String,
    pic_url: Vec<String>,
    brand: i64,
    price: Decimal,
    rating: Option<f64>,
    product_sizes: Vec<String>,
}

#[derive(FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: Option<i64>,
    quantity: i32,
    unit_price_cents: i64,
    selected_size: Option<String>,
    title: Option<String>,
    description: Option<String>,
    pic_url: Option<Vec<String>>,
    brand: Option<i64>,
    price: Option<Decimal>,
    rating: Option<f64>,
    product_sizes: Option<Vec<String>>,
}

#[async_trait]
impl CartGateway for PgGateway {
    async fn find_active_cart(&self, user_id: &str) -> GatewayResult<Option<Cart>> {
        let cart = Carts::find()
            .filter(
                Condition::all()
                    .add(CartCol::UserId.eq(user_id))
                    .add(CartCol::Status.eq(CartStatus::Active.as_str())),
            )
            .order_by_desc(CartCol::CreatedAt)
            .one(&self.orm)
            .await?;
        Ok(cart.map(cart_from_entity))
    }

    async fn insert_cart(&self, cart: NewCart) -> GatewayResult<Cart> {
        let model = CartActive {
            id: NotSet,
            user_id: Set(cart.user_id),
            status: Set(cart.status.as_str().to_string()),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(cart_from_entity(model))
    }

    async fn set_cart_status(&self, cart_id: CartId, status: CartStatus) -> GatewayResult<()> {
        Carts::update_many()
            .col_expr(CartCol::Status, Expr::value(status.as_str()))
            .filter(CartCol::Id.eq(cart_id))
            .exec(&self.orm)
            .await?;
        Ok(())
    }

    async fn find_line_item(&self, key: &LineItemKey) -> GatewayResult<Option<CartLineItem>> {
        let item = CartItems::find()
            .filter(
                Condition::all()
                    .add(CartItemCol::CartId.eq(key.cart_id))
                    .add(CartItemCol::ProductId.eq(key.product_id))
                    .add(CartItemCol::Size.eq(key.size.as_str())),
            )
            .one(&self.orm)
            .await?;
        Ok(item.map(line_item_from_entity))
    }

    async fn insert_line_item(&self, item: NewLineItem) -> GatewayResult<CartLineItem> {
        let model = CartItemActive {
            id: NotSet,
            cart_id: Set(item.cart_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price_cents: Set(item.unit_price.cents()),
            size: Set(item.size),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(line_item_from_entity(model))
    }

    async fn update_line_item(&self, id: i64, patch: LineItemPatch) -> GatewayResult<()> {
        CartItems::update_many()
            .col_expr(CartItemCol::Quantity, Expr::value(patch.quantity))
            .col_expr(
                CartItemCol::UnitPriceCents,
                Expr::value(patch.unit_price.cents()),
            )
            .filter(CartItemCol::Id.eq(id))
            .exec(&self.orm)
            .await?;
        Ok(())
    }

    async fn delete_line_item(&self, id: i64) -> GatewayResult<()> {
        CartItems::delete_by_id(id).exec(&self.orm).await?;
        Ok(())
    }

    async fn delete_cart_items(&self, cart_id: CartId) -> GatewayResult<u64> {
        let result = CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart_id))
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected)
    }

    async fn list_cart_details(&self, cart_id: CartId) -> GatewayResult<Vec<CartProductDetail>> {
        let rows = sqlx::query_as::<_, CartDetailRow>(
            r#"
            SELECT ci.product_id, ci.quantity, ci.size,
                   p.title, p.description, p.pic_url, p.brand, p.price, p.rating,
                   p.size AS product_sizes
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.created_at, ci.id
            "#,
        )
        .bind(cart_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CartProductDetail {
                product_id: row.product_id,
                quantity: row.quantity,
                size: row.size,
                product: Product {
                    id: row.product_id,
                    title: row.title,
                    description: row.description,
                    pic_url: row.pic_url,
                    brand: row.brand,
                    price: row.price,
                    rating: row.rating,
                    size: row.product_sizes,
                },
            })
            .collect())
    }
}

#[async_trait]
impl OrderGateway for PgGateway {
    async fn insert_order(&self, order: NewOrder) -> GatewayResult<Order> {
        let model = OrderActive {
            id: NotSet,
            user_id: Set(order.user_id),
            total_amount_cents: Set(order.total_amount.cents()),
            status: Set(order.status),
            address_shipping: Set(order.address_shipping),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(order_from_entity(model))
    }

    async fn insert_order_items(&self, items: Vec<NewOrderItem>) -> GatewayResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let models = items.into_iter().map(|item| OrderItemActive {
            id: NotSet,
            order_id: Set(item.order_id),
            product_id: Set(Some(item.product_id)),
            quantity: Set(item.quantity),
            unit_price_cents: Set(item.unit_price.cents()),
            selected_size: Set(item.selected_size),
        });
        OrderItems::insert_many(models).exec(&self.orm).await?;
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> GatewayResult<u64> {
        let txn = self.orm.begin().await?;
        OrderItems::delete_many()
            .filter(OrderItemCol::OrderId.eq(id))
            .exec(&txn)
            .await?;
        let result = Orders::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> GatewayResult<Vec<Order>> {
        let mut finder = Orders::find().filter(order_condition(filter));
        finder = if filter.oldest_first {
            finder.order_by_asc(OrderCol::CreatedAt)
        } else {
            finder.order_by_desc(OrderCol::CreatedAt)
        };

        let orders = finder
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect();
        Ok(orders)
    }

    async fn count_orders(&self, filter: &OrderFilter) -> GatewayResult<u64> {
        let total = Orders::find()
            .filter(order_condition(filter))
            .count(&self.orm)
            .await?;
        Ok(total)
    }

    async fn find_order(&self, id: OrderId) -> GatewayResult<Option<Order>> {
        let order = Orders::find_by_id(id).one(&self.orm).await?;
        Ok(order.map(order_from_entity))
    }

    async fn list_order_items(&self, order_id: OrderId) -> GatewayResult<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.unit_price_cents,
                   oi.selected_size,
                   p.title, p.description, p.pic_url, p.brand, p.price, p.rating,
                   p.size AS product_sizes
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            "#,
        )
        .bind(order_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(order_item_from_row).collect())
    }

    async fn update_order_status(&self, id: OrderId, status: &str) -> GatewayResult<Option<Order>> {
        let existing = Orders::find_by_id(id).one(&self.orm).await?;
        let existing = match existing {
            Some(o) => o,
            None => return Ok(None),
        };

        let mut active: OrderActive = existing.into();
        active.status = Set(status.to_string());
        let order = active.update(&self.orm).await?;
        Ok(Some(order_from_entity(order)))
    }
}

#[async_trait]
impl CatalogGateway for PgGateway {
    async fn list_products(&self, filter: &ProductFilter) -> GatewayResult<Vec<Product>> {
        let items = Products::find()
            .filter(product_condition(filter))
            .order_by_desc(ProdCol::Rating)
            .order_by_asc(ProdCol::Id)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();
        Ok(items)
    }

    async fn count_products(&self, filter: &ProductFilter) -> GatewayResult<u64> {
        let total = Products::find()
            .filter(product_condition(filter))
            .count(&self.orm)
            .await?;
        Ok(total)
    }

    async fn find_product(&self, id: ProductId) -> GatewayResult<Option<Product>> {
        let product = Products::find_by_id(id).one(&self.orm).await?;
        Ok(product.map(product_from_entity))
    }

    async fn insert_product(&self, product: NewProduct) -> GatewayResult<Product> {
        let model = ProductActive {
            id: NotSet,
            title: Set(Some(product.title)),
            description: Set(product.description),
            pic_url: Set(product.pic_url),
            brand: Set(product.brand),
            price: Set(product.price),
            rating: Set(product.rating),
            size: Set(product.size),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(product_from_entity(model))
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> GatewayResult<Option<Product>> {
        let existing = Products::find_by_id(id).one(&self.orm).await?;
        let existing = match existing {
            Some(p) => p,
            None => return Ok(None),
        };

        let mut active: ProductActive = existing.into();
        if let Some(title) = patch.title {
            active.title = Set(Some(title));
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(pic_url) = patch.pic_url {
            active.pic_url = Set(pic_url);
        }
        if let Some(brand) = patch.brand {
            active.brand = Set(brand);
        }
        if let Some(price) = patch.price {
            active.price = Set(price);
        }
        if let Some(rating) = patch.rating {
            active.rating = Set(Some(rating));
        }
        if let Some(size) = patch.size {
            active.size = Set(size);
        }

        let product = active.update(&self.orm).await?;
        Ok(Some(product_from_entity(product)))
    }

    async fn delete_product(&self, id: ProductId) -> GatewayResult<u64> {
        let result = Products::delete_by_id(id).exec(&self.orm).await?;
        Ok(result.rows_affected)
    }

    async fn list_categories(&self) -> GatewayResult<Vec<Category>> {
        let items = Categories::find()
            .all(&self.orm)
            .await?
            .into_iter()
            .map(category_from_entity)
            .collect();
        Ok(items)
    }

    async fn find_category(&self, id: i64) -> GatewayResult<Option<Category>> {
        let category = Categories::find_by_id(id).one(&self.orm).await?;
        Ok(category.map(category_from_entity))
    }

    async fn insert_category(&self, category: NewCategory) -> GatewayResult<Category> {
        let model = CategoryActive {
            id: NotSet,
            name: Set(category.name),
            pic_url: Set(category.pic_url),
        }
        .insert(&self.orm)
        .await?;
        Ok(category_from_entity(model))
    }

    async fn update_category(
        &self,
        id: i64,
        patch: CategoryPatch,
    ) -> GatewayResult<Option<Category>> {
        let existing = Categories::find_by_id(id).one(&self.orm).await?;
        let existing = match existing {
            Some(c) => c,
            None => return Ok(None),
        };

        let mut active: CategoryActive = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(pic_url) = patch.pic_url {
            active.pic_url = Set(Some(pic_url));
        }
        let category = active.update(&self.orm).await?;
        Ok(Some(category_from_entity(category)))
    }

    async fn delete_category(&self, id: i64) -> GatewayResult<u64> {
        let result = Categories::delete_by_id(id)
            .exec(&self.orm)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => category_in_use(id),
                _ => GatewayError::Orm(err),
            })?;
        Ok(result.rows_affected)
    }

    async fn insert_search_history(
        &self,
        user_id: &str,
        query: &str,
    ) -> GatewayResult<SearchHistoryEntry> {
        let model = SearchActive {
            id: NotSet,
            user_id: Set(user_id.to_string()),
            query: Set(query.to_string()),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(search_from_entity(model))
    }

    async fn list_search_history(
        &self,
        user_id: &str,
        limit: u64,
    ) -> GatewayResult<Vec<SearchHistoryEntry>> {
        let items = SearchHistory::find()
            .filter(SearchCol::UserId.eq(user_id))
            .order_by_desc(SearchCol::CreatedAt)
            .order_by_desc(SearchCol::Id)
            .limit(limit)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(search_from_entity)
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl ProfileGateway for PgGateway {
    async fn find_profile(&self, user_id: &str) -> GatewayResult<Option<UserProfile>> {
        let profile = Profiles::find_by_id(user_id.to_string())
            .one(&self.orm)
            .await?;
        Ok(profile.map(profile_from_entity))
    }

    async fn list_profiles(&self) -> GatewayResult<Vec<UserProfile>> {
        let items = Profiles::find()
            .all(&self.orm)
            .await?
            .into_iter()
            .map(profile_from_entity)
            .collect();
        Ok(items)
    }

    async fn insert_profile(&self, profile: NewProfile) -> GatewayResult<UserProfile> {
        let model = ProfileActive {
            user_id: Set(profile.user_id),
            first_name: Set(profile.first_name),
            last_name: Set(profile.last_name),
            phone: Set(profile.phone),
            address: Set(profile.address),
            email: Set(profile.email),
            is_admin: Set(profile.is_admin),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(profile_from_entity(model))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        patch: ProfilePatch,
    ) -> GatewayResult<Option<UserProfile>> {
        let existing = Profiles::find_by_id(user_id.to_string())
            .one(&self.orm)
            .await?;
        let existing = match existing {
            Some(p) => p,
            None => return Ok(None),
        };

        let mut active: ProfileActive = existing.into();
        if let Some(first_name) = patch.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = patch.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = patch.address {
            active.address = Set(Some(address));
        }
        if let Some(email) = patch.email {
            active.email = Set(Some(email));
        }
        if let Some(is_admin) = patch.is_admin {
            active.is_admin = Set(is_admin);
        }
        active.updated_at = Set(Utc::now().into());

        let profile = active.update(&self.orm).await?;
        Ok(Some(profile_from_entity(profile)))
    }

    async fn delete_profile(&self, user_id: &str) -> GatewayResult<u64> {
        let result = Profiles::delete_by_id(user_id.to_string())
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected)
    }
}

fn order_condition(filter: &OrderFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(user_id) = filter.user_id.as_ref() {
        condition = condition.add(OrderCol::UserId.eq(user_id.clone()));
    }
    if let Some(status) = filter.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }
    condition
}

fn product_condition(filter: &ProductFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(search) = filter.title_contains.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(ProdCol::Title).ilike(format!("%{}%", search)));
    }
    if let Some(brand) = filter.brand {
        condition = condition.add(ProdCol::Brand.eq(brand));
    }
    condition
}

fn cart_from_entity(model: CartModel) -> Cart {
    Cart {
        id: model.id,
        user_id: model.user_id,
        // anything that is not `active` is terminal for the cart manager
        status: CartStatus::parse(&model.status).unwrap_or(CartStatus::Completed),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn line_item_from_entity(model: CartItemModel) -> CartLineItem {
    CartLineItem {
        id: model.id,
        cart_id: model.cart_id,
        product_id: model.product_id,
        quantity: model.quantity,
        unit_price: Money::from_cents(model.unit_price_cents),
        size: model.size,
    }
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: Money::from_cents(model.total_amount_cents),
        status: model.status,
        address_shipping: model.address_shipping,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_item_from_row(row: OrderItemRow) -> OrderItem {
    let product = match (row.product_id, row.description, row.brand, row.price) {
        (Some(id), Some(description), Some(brand), Some(price)) => Some(Product {
            id,
            title: row.title,
            description,
            pic_url: row.pic_url.unwrap_or_default(),
            brand,
            price,
            rating: row.rating,
            size: row.product_sizes.unwrap_or_default(),
        }),
        _ => None,
    };

    OrderItem {
        id: row.id,
        order_id: row.order_id,
        product_id: row.product_id,
        quantity: row.quantity,
        unit_price: Money::from_cents(row.unit_price_cents),
        selected_size: row.selected_size,
        product,
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        title: model.title,
        description: model.description,
        pic_url: model.pic_url,
        brand: model.brand,
        price: model.price,
        rating: model.rating,
        size: model.size,
    }
}

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        pic_url: model.pic_url,
    }
}

fn search_from_entity(model: SearchModel) -> SearchHistoryEntry {
    SearchHistoryEntry {
        id: model.id,
        user_id: model.user_id,
        query: model.query,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn profile_from_entity(model: ProfileModel) -> UserProfile {
    UserProfile {
        user_id: model.user_id,
        first_name: model.first_name,
        last_name: model.last_name,
        phone: model.phone,
        address: model.address,
        email: model.email,
        is_admin: model.is_admin,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
