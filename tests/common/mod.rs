#![allow(dead_code)]

use std::{str::FromStr, sync::Arc};

use rust_decimal::Decimal;
use storefront::{
    cart::CartManager,
    gateway::{
        NewCategory, NewProduct, NewProfile,
        memory::MemoryGateway,
    },
    models::{Category, Product, UserProfile},
};

pub fn category(gateway: &MemoryGateway, name: &str) -> Category {
    gateway.seed_category(NewCategory {
        name: name.to_string(),
        pic_url: None,
    })
}

pub fn product(gateway: &MemoryGateway, brand: i64, title: &str, price: &str, sizes: &[&str]) -> Product {
    gateway.seed_product(NewProduct {
        title: title.to_string(),
        description: String::new(),
        pic_url: vec![format!("https://img.test/{title}.png")],
        brand,
        price: Decimal::from_str(price).expect("valid price"),
        rating: None,
        size: sizes.iter().map(|s| s.to_string()).collect(),
    })
}

pub fn profile(gateway: &MemoryGateway, user_id: &str, is_admin: bool) -> UserProfile {
    gateway.seed_profile(NewProfile {
        user_id: user_id.to_string(),
        first_name: "Ana".to_string(),
        last_name: "Lopez".to_string(),
        phone: None,
        address: Some("Av. Siempre Viva 742".to_string()),
        email: Some(format!("{user_id}@example.com")),
        is_admin,
    })
}

pub fn manager(gateway: &Arc<MemoryGateway>) -> CartManager<MemoryGateway> {
    CartManager::new(gateway.clone())
}
