use crate::{
    cart::{CartChange, CartError, MAX_LINE_QUANTITY},
    dto::cart::{
        AddToCartRequest, CartItemChange, CartItemDto, CartItemRequest, CartTotal, CartView,
        ClearedCart,
    },
    error::{AppError, AppResult},
    gateway::CatalogGateway,
    middleware::auth::AuthUser,
    models::{Product, ProductId},
    money::Money,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart_id = state.carts.find_active_cart(&user.user_id).await?;
    let items: Vec<CartItemDto> = state
        .carts
        .list_cart_details(&user.user_id)
        .await?
        .into_iter()
        .map(CartItemDto::try_from)
        .collect::<Result<_, _>>()?;
    let total = Money::checked_sum(items.iter().map(|item| item.line_total))
        .ok_or(CartError::AmountOverflow)?;

    let meta = Meta::new(1, items.len() as i64, items.len() as i64);
    Ok(ApiResponse::success(
        "OK",
        CartView {
            cart_id,
            items,
            total,
        },
        Some(meta),
    ))
}

pub async fn cart_total(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartTotal>> {
    let total: Money = state.carts.get_total(&user.user_id).await?;
    Ok(ApiResponse::success("OK", CartTotal { total }, None))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItemChange>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    if payload.quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "quantity cannot exceed {MAX_LINE_QUANTITY}"
        )));
    }
    let size = payload.size.trim().to_string();
    let product = load_product(state, payload.product_id, &size).await?;
    check_size(&product, &size)?;
    let change = state
        .carts
        .add_product(&user.user_id, &product, payload.quantity, &size)
        .await?;
    Ok(change_response(product.id, size, change))
}

pub async fn plus_item(
    state: &AppState,
    user: &AuthUser,
    payload: CartItemRequest,
) -> AppResult<ApiResponse<CartItemChange>> {
    let size = payload.size.trim().to_string();
    let product = load_product(state, payload.product_id, &size).await?;
    check_size(&product, &size)?;
    let change = state
        .carts
        .plus_item(&user.user_id, &product, &size)
        .await?;
    Ok(change_response(product.id, size, change))
}

pub async fn minus_item(
    state: &AppState,
    user: &AuthUser,
    payload: CartItemRequest,
) -> AppResult<ApiResponse<CartItemChange>> {
    let size = payload.size.trim().to_string();
    let product = load_product(state, payload.product_id, &size).await?;
    let change = state
        .carts
        .minus_item(&user.user_id, &product, &size)
        .await?;
    Ok(change_response(product.id, size, change))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ClearedCart>> {
    let removed = match state.carts.find_active_cart(&user.user_id).await? {
        Some(cart_id) => state.carts.clear_cart(cart_id).await?,
        None => 0,
    };
    Ok(ApiResponse::success(
        "Cart cleared",
        ClearedCart { removed },
        Some(Meta::empty()),
    ))
}

async fn load_product(state: &AppState, id: ProductId, size: &str) -> AppResult<Product> {
    if size.is_empty() {
        return Err(AppError::BadRequest("size is required".to_string()));
    }
    state
        .gateway
        .find_product(id)
        .await?
        .ok_or_else(|| AppError::BadRequest("product not found".to_string()))
}

// Decrements skip this so a size dropped from the catalog can still be
// removed from a cart.
fn check_size(product: &Product, size: &str) -> AppResult<()> {
    if !product.size.is_empty() && !product.size.iter().any(|s| s == size) {
        return Err(AppError::BadRequest(format!(
            "size {size} is not available for this product"
        )));
    }
    Ok(())
}

fn change_response(
    product_id: ProductId,
    size: String,
    change: CartChange,
) -> ApiResponse<CartItemChange> {
    ApiResponse::success("OK", CartItemChange::new(product_id, size, change), None)
}
