use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{
            AddToCartRequest, CartItemChange, CartItemDto, CartItemRequest, CartItemStatus,
            CartTotal, CartView, ClearedCart,
        },
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        orders::{CheckoutRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{
            Banner, CreateProductRequest, ProductList, SearchHistoryList, UpdateProductRequest,
            UploadedImage,
        },
        users::{CreateUserRequest, UpdateProfileRequest, UpdateUserRequest, UserList},
    },
    models::{Category, Order, OrderItem, Product, SearchHistoryEntry, UserProfile},
    money::Money,
    response::{ApiResponse, Meta},
    routes::{admin, cart, catalog, health, orders, params, profile},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::get_cart,
        cart::cart_total,
        cart::add_to_cart,
        cart::plus_item,
        cart::minus_item,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        catalog::list_products,
        catalog::popular_products,
        catalog::search_products,
        catalog::get_product,
        catalog::search_history,
        catalog::list_categories,
        catalog::list_banners,
        profile::get_profile,
        profile::update_profile,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::upload_product_image,
        admin::create_category,
        admin::update_category,
        admin::delete_category,
        admin::list_users,
        admin::create_user,
        admin::update_user,
        admin::delete_user,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::delete_order
    ),
    components(
        schemas(
            Money,
            Product,
            Category,
            Order,
            OrderItem,
            UserProfile,
            SearchHistoryEntry,
            AddToCartRequest,
            CartItemRequest,
            CartItemDto,
            CartItemChange,
            CartItemStatus,
            CartTotal,
            CartView,
            ClearedCart,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            SearchHistoryList,
            Banner,
            UploadedImage,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            CreateUserRequest,
            UpdateUserRequest,
            UpdateProfileRequest,
            UserList,
            params::Pagination,
            params::SortOrder,
            Meta,
            ApiResponse<Product>,
            ApiResponse<CartView>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Profile", description = "Current user's profile"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
