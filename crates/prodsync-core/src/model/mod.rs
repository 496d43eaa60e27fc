//! Domain model: products and their prices

pub mod price;
pub mod product;

pub use price::{ParsePriceError, Price};
pub use product::{NewProduct, Product, ProductId};
