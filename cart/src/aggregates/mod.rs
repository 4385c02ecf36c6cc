//! Aggregates of the checkout flow.
//!
//! The cart is a single aggregate: one `OrderState` root mutated by
//! `CartAction`s through the `CartReducer`.

pub mod cart;

pub use cart::{AttendeeField, CartAction, CartEnvironment, CartReducer};
