pub mod admin_service;
pub mod cart_service;
pub mod catalog_service;
pub mod order_service;
pub mod profile_service;
