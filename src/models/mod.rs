pub mod cart;
pub mod catalog;
pub mod forms;
pub mod money;
pub mod slug;

pub use cart::{CartEntry, CartLine, SessionCart};
pub use forms::{FormErrors, ReviewForm, ShippingForm};
