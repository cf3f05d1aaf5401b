use crate::{
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    error::{AppError, AppResult},
    gateway::{OrderFilter, OrderGateway},
    middleware::auth::AuthUser,
    models::{Order, OrderId},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = state
        .carts
        .checkout_cart(&user.user_id, &payload.shipping_address)
        .await?;
    let items = state.gateway.list_order_items(order.id).await?;

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let filter = order_filter(Some(user.user_id.clone()), &query);
    list_with_filter(state, filter, &query).await
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: OrderId,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = match state.gateway.find_order(id).await? {
        Some(order) if order.user_id == user.user_id => order,
        _ => return Err(AppError::NotFound),
    };
    with_items(state, order).await
}

/// Shared with the admin listing, which passes no user.
pub(crate) fn order_filter(user_id: Option<String>, query: &OrderListQuery) -> OrderFilter {
    let (_, limit, offset) = query.pagination().normalize();
    OrderFilter {
        user_id,
        status: query
            .status
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        oldest_first: matches!(query.sort_order, Some(SortOrder::Asc)),
        limit: Some(limit as u64),
        offset: Some(offset as u64),
    }
}

pub(crate) async fn list_with_filter(
    state: &AppState,
    filter: OrderFilter,
    query: &OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, _) = query.pagination().normalize();
    let total = state.gateway.count_orders(&filter).await? as i64;
    let items = state.gateway.list_orders(&filter).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

pub(crate) async fn with_items(
    state: &AppState,
    order: Order,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let items = state.gateway.list_order_items(order.id).await?;
    Ok(ApiResponse::success(
        "OK",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}
