use crate::{
    dto::{
        categories::{CreateCategoryRequest, UpdateCategoryRequest},
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{CreateProductRequest, UpdateProductRequest, UploadedImage},
        users::{CreateUserRequest, UpdateUserRequest, UserList},
    },
    error::{AppError, AppResult},
    gateway::{
        CatalogGateway, CategoryPatch, NewCategory, NewProduct, NewProfile, OrderGateway,
        ProductPatch, ProfileGateway, ProfilePatch,
    },
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, ORDER_STATUSES, Order, OrderId, Product, ProductId, UserProfile},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
    storage::PRODUCTS_BUCKET,
};

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(state, user).await?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    let pic_url = clean_list(payload.pic_url);
    if pic_url.is_empty() {
        return Err(AppError::BadRequest(
            "at least one product image is required".into(),
        ));
    }
    if payload.price.is_sign_negative() {
        return Err(AppError::BadRequest("price cannot be negative".into()));
    }
    ensure_category(state, payload.brand).await?;

    let product = state
        .gateway
        .insert_product(NewProduct {
            title,
            description: payload.description,
            pic_url,
            brand: payload.brand,
            price: payload.price,
            rating: payload.rating,
            size: clean_list(payload.size),
        })
        .await?;
    tracing::info!(product_id = product.id, admin = %user.user_id, "product created");

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: ProductId,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(state, user).await?;

    if payload.price.is_some_and(|p| p.is_sign_negative()) {
        return Err(AppError::BadRequest("price cannot be negative".into()));
    }
    let pic_url = payload.pic_url.map(clean_list);
    if pic_url.as_ref().is_some_and(Vec::is_empty) {
        return Err(AppError::BadRequest(
            "at least one product image is required".into(),
        ));
    }
    if let Some(brand) = payload.brand {
        ensure_category(state, brand).await?;
    }

    let patch = ProductPatch {
        title: payload.title,
        description: payload.description,
        pic_url,
        brand: payload.brand,
        price: payload.price,
        rating: payload.rating,
        size: payload.size.map(clean_list),
    };
    let product = state
        .gateway
        .update_product(id, patch)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product updated", product, None))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: ProductId,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(state, user).await?;
    if state.gateway.delete_product(id).await? == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(product_id = id, admin = %user.user_id, "product deleted");
    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

/// Stores an image in the products bucket and returns its public URL.
pub async fn upload_product_image(
    state: &AppState,
    user: &AuthUser,
    name: &str,
    bytes: &[u8],
) -> AppResult<ApiResponse<UploadedImage>> {
    ensure_admin(state, user).await?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("image body is empty".into()));
    }

    state.storage.upload(PRODUCTS_BUCKET, name, bytes).await?;
    let url = state.storage.public_url(PRODUCTS_BUCKET, name);
    Ok(ApiResponse::success(
        "Image uploaded",
        UploadedImage {
            bucket: PRODUCTS_BUCKET.to_string(),
            name: name.to_string(),
            url,
        },
        None,
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(state, user).await?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    let category = state
        .gateway
        .insert_category(NewCategory {
            name,
            pic_url: payload.pic_url,
        })
        .await?;
    Ok(ApiResponse::success("Category created", category, None))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(state, user).await?;
    if payload.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name cannot be blank".into()));
    }
    let patch = CategoryPatch {
        name: payload.name.map(|n| n.trim().to_string()),
        pic_url: payload.pic_url,
    };
    let category = state
        .gateway
        .update_category(id, patch)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Category updated", category, None))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(state, user).await?;
    if state.gateway.delete_category(id).await? == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Category deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(state, user).await?;
    let items = state.gateway.list_profiles().await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_user(
    state: &AppState,
    user: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_admin(state, user).await?;
    let user_id = payload.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::BadRequest("user_id is required".into()));
    }
    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err(AppError::BadRequest("first and last name are required".into()));
    }
    if state.gateway.find_profile(&user_id).await?.is_some() {
        return Err(AppError::BadRequest(format!("user {user_id} already exists")));
    }

    let profile = state
        .gateway
        .insert_profile(NewProfile {
            user_id,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            address: payload.address,
            email: payload.email,
            is_admin: payload.is_admin,
        })
        .await?;
    Ok(ApiResponse::success("User created", profile, None))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    user_id: &str,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_admin(state, user).await?;
    let patch = ProfilePatch {
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone: payload.phone,
        address: payload.address,
        email: payload.email,
        is_admin: payload.is_admin,
    };
    let profile = state
        .gateway
        .update_profile(user_id, patch)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("User updated", profile, None))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    user_id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(state, user).await?;
    if user_id == user.user_id {
        return Err(AppError::BadRequest("admins cannot delete themselves".into()));
    }
    if state.gateway.delete_profile(user_id).await? == 0 {
        return Err(AppError::NotFound);
    }
    state.carts.forget_user(user_id);
    Ok(ApiResponse::success(
        "User deleted",
        serde_json::json!({ "user_id": user_id }),
        Some(Meta::empty()),
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(state, user).await?;
    let filter = order_service::order_filter(None, &query);
    order_service::list_with_filter(state, filter, &query).await
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: OrderId,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(state, user).await?;
    let order = state
        .gateway
        .find_order(id)
        .await?
        .ok_or(AppError::NotFound)?;
    order_service::with_items(state, order).await
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: OrderId,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(state, user).await?;
    let status = payload.status.trim();
    if !ORDER_STATUSES.contains(&status) {
        return Err(AppError::BadRequest(format!(
            "unknown order status {status}, expected one of {}",
            ORDER_STATUSES.join(", ")
        )));
    }

    let order = state
        .gateway
        .update_order_status(id, status)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(order_id = id, status, admin = %user.user_id, "order status updated");
    Ok(ApiResponse::success("Order status updated", order, None))
}

/// Removes the order's items, then the order.
pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: OrderId,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(state, user).await?;
    if state.gateway.delete_order(id).await? == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(order_id = id, admin = %user.user_id, "order deleted");
    Ok(ApiResponse::success(
        "Order deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

async fn ensure_category(state: &AppState, id: i64) -> AppResult<()> {
    if state.gateway.find_category(id).await?.is_none() {
        return Err(AppError::BadRequest(format!("category {id} does not exist")));
    }
    Ok(())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
