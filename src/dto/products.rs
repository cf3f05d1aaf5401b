use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, SearchHistoryEntry};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub pic_url: Vec<String>,
    pub brand: i64,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub rating: Option<f64>,
    #[serde(default)]
    pub size: Vec<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub pic_url: Option<Vec<String>>,
    pub brand: Option<i64>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub rating: Option<f64>,
    pub size: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SearchHistoryList {
    #[schema(value_type = Vec<SearchHistoryEntry>)]
    pub items: Vec<SearchHistoryEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Banner {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedImage {
    pub bucket: String,
    pub name: String,
    pub url: String,
}
