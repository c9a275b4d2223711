//! Domain models for storefront.
//!
//! These types represent validated domain objects separate from database row
//! types and from the JSON request/response shapes in `routes`.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod user;

pub use cart::{Cart, CartLine};
pub use catalog::{Category, Product};
pub use order::{Order, OrderLine};
pub use user::User;
