pub mod store;

pub use store::{CartItem, CartLine, CartStore};
