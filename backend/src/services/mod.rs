//! Business logic services for the HomeStock platform

pub mod auth;
pub mod expiry;
pub mod notification;
pub mod product;
pub mod shopping;
pub mod stock;

pub use auth::AuthService;
pub use expiry::ExpiryService;
pub use notification::NotificationService;
pub use product::ProductService;
pub use shopping::ShoppingService;
pub use stock::StockService;
