//! HTTP handlers for the HomeStock API

mod auth;
mod expiry;
mod health;
mod product;
mod shopping;
mod stock;
mod tasks;

pub use auth::*;
pub use expiry::*;
pub use health::*;
pub use product::*;
pub use shopping::*;
pub use stock::*;
pub use tasks::*;
