//! # Ticketshop Cart
//!
//! The conference ticket cart engine: an order state container with a
//! multi-step checkout flow on top of the ticketshop reducer architecture.
//!
//! ## What lives here
//!
//! - [`types`]: the order aggregate, catalog entries, vouchers, money
//! - [`aggregates`]: the cart reducer - every mutation of the order state
//! - [`sequencer`]: which checkout step is next or reachable
//! - [`catalog`]: the read-only catalog adapter
//! - [`gateway`]: voucher validation and order submission backends
//! - [`storage`]: the durable cart document (load/save/clear)
//! - [`totals`]: derived pricing for the review step
//! - [`session`]: the facade UI layers talk to
//! - [`config`]: environment-driven configuration
//!
//! ## Flow in one paragraph
//!
//! A [`session::CartSession`] starts by fetching the catalog and restoring
//! the persisted cart (corruption falls back to empty, silently). Visitor
//! interactions become [`aggregates::CartAction`]s sent through the Store;
//! each mutation persists a snapshot. Voucher application and order
//! submission are two-phase: the command emits a gateway effect, the
//! backend's verdict returns as an event. On confirmation the cart and its
//! durable document are cleared and the step sequencer reports
//! [`sequencer::CheckoutStep::Complete`].

pub mod aggregates;
pub mod catalog;
pub mod config;
pub mod gateway;
pub mod sequencer;
pub mod session;
pub mod storage;
pub mod totals;
pub mod types;

pub use aggregates::{AttendeeField, CartAction, CartEnvironment, CartReducer};
pub use catalog::{Catalog, CatalogGateway};
pub use config::Config;
pub use sequencer::CheckoutStep;
pub use session::CartSession;
pub use types::OrderState;
