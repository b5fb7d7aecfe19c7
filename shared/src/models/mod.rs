//! Data model shared across crates

pub mod coupon;
pub mod order;
pub mod product;
pub mod transition;

pub use coupon::Coupon;
pub use order::{
    Order, OrderItem, OrderStatus, PaymentStatus, RefundRecord, RefundStatus, ShippingAddress,
};
pub use product::CatalogProduct;
pub use transition::TransitionRecord;
