use crate::{
    dto::{
        categories::CategoryList,
        products::{Banner, ProductList, SearchHistoryList},
    },
    error::{AppError, AppResult},
    gateway::{CatalogGateway, ProductFilter},
    middleware::auth::AuthUser,
    models::{Product, ProductId},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, SearchQuery},
    state::AppState,
    storage::BANNERS_BUCKET,
};

const POPULAR_LIMIT: u64 = 10;
const SEARCH_HISTORY_LIMIT: u64 = 20;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let filter = ProductFilter {
        title_contains: query
            .q
            .as_ref()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty()),
        brand: query.brand,
        ..ProductFilter::default()
    };
    paged_products(state, filter, query.pagination(), "Products").await
}

/// Best rated products.
pub async fn popular_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let filter = ProductFilter {
        limit: Some(POPULAR_LIMIT),
        ..ProductFilter::default()
    };
    let items = state.gateway.list_products(&filter).await?;
    Ok(ApiResponse::success(
        "Popular products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_product(state: &AppState, id: ProductId) -> AppResult<ApiResponse<Product>> {
    let product = state
        .gateway
        .find_product(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", product, None))
}

/// Title search that also records the query in the caller's history.
pub async fn search_products(
    state: &AppState,
    user: &AuthUser,
    query: SearchQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let term = query.q.trim();
    if term.is_empty() {
        return Err(AppError::BadRequest("search query is required".into()));
    }

    if let Err(err) = state
        .gateway
        .insert_search_history(&user.user_id, term)
        .await
    {
        tracing::warn!(user_id = %user.user_id, error = %err, "search history not recorded");
    }

    let filter = ProductFilter {
        title_contains: Some(term.to_string()),
        ..ProductFilter::default()
    };
    paged_products(state, filter, query.pagination(), "Search results").await
}

pub async fn search_history(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SearchHistoryList>> {
    let items = state
        .gateway
        .list_search_history(&user.user_id, SEARCH_HISTORY_LIMIT)
        .await?;
    Ok(ApiResponse::success(
        "Search history",
        SearchHistoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = state.gateway.list_categories().await?;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

/// Home slider images, one per object in the banners bucket.
pub async fn list_banners(state: &AppState) -> AppResult<ApiResponse<Vec<Banner>>> {
    let banners = state
        .storage
        .list(BANNERS_BUCKET)
        .await?
        .into_iter()
        .map(|name| Banner {
            url: state.storage.public_url(BANNERS_BUCKET, &name),
            name,
        })
        .collect();
    Ok(ApiResponse::success("Banners", banners, Some(Meta::empty())))
}

async fn paged_products(
    state: &AppState,
    mut filter: ProductFilter,
    pagination: Pagination,
    message: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let total = state.gateway.count_products(&filter).await? as i64;

    filter.limit = Some(limit as u64);
    filter.offset = Some(offset as u64);
    let items = state.gateway.list_products(&filter).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(message, ProductList { items }, Some(meta)))
}
