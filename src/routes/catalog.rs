use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::{
        categories::CategoryList,
        products::{Banner, ProductList, SearchHistoryList},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Product, ProductId},
    response::ApiResponse,
    routes::params::{ProductQuery, SearchQuery},
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/popular", get(popular_products))
        .route("/products/search", get(search_products))
        .route("/products/{id}", get(get_product))
        .route("/search-history", get(search_history))
        .route("/categories", get(list_categories))
        .route("/banners", get(list_banners))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Products, best rated first", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = catalog_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/popular",
    responses(
        (status = 200, description = "Top rated products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn popular_products(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = catalog_service::popular_products(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Title search; the query is saved to the caller's history", body = ApiResponse<ProductList>),
        (status = 400, description = "Empty query"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = catalog_service::search_products(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = catalog_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/search-history",
    responses(
        (status = 200, description = "Recent searches of the current user", body = ApiResponse<SearchHistoryList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn search_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SearchHistoryList>>> {
    let resp = catalog_service::search_history(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "All categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Products"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = catalog_service::list_categories(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/banners",
    responses(
        (status = 200, description = "Home slider images", body = ApiResponse<Vec<Banner>>)
    ),
    tag = "Products"
)]
pub async fn list_banners(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Banner>>>> {
    let resp = catalog_service::list_banners(&state).await?;
    Ok(Json(resp))
}
