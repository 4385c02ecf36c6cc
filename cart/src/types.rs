//! Domain types for the conference ticket cart.
//!
//! This module contains all value objects, catalog entries, and state types
//! for the checkout flow: the products and hotel rooms offered by the
//! conference, the instances a visitor has selected, invoice information,
//! vouchers, and the `OrderState` aggregate that ties them together.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for one selected unit inside the cart
///
/// Fresh per added unit, so two identical tickets stay distinguishable.
/// Always minted through the injected `IdGenerator`, never derived from a
/// collection index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Create an `InstanceId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! catalog_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        ///
        /// Minted by the catalog backend, so it is an opaque string rather
        /// than a locally generated UUID.
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// View the identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

catalog_id! {
    /// Unique identifier for a product (ticket type or add-on)
    ProductId
}

catalog_id! {
    /// Unique identifier for a product variation
    VariationId
}

catalog_id! {
    /// Unique identifier for a per-ticket question
    QuestionId
}

catalog_id! {
    /// Unique identifier for an option of a choice-type question
    OptionId
}

catalog_id! {
    /// Unique identifier for a hotel room
    HotelRoomId
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// A zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts, saturating at the numeric bound
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts two money amounts, saturating at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplies money by a quantity, saturating at the numeric bound
    #[must_use]
    pub const fn saturating_multiply(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }

    /// A percentage share of this amount, rounded down
    ///
    /// Percentages above 100 are clamped to the full amount.
    #[must_use]
    pub const fn percentage(self, percent: u8) -> Self {
        if percent >= 100 {
            return self;
        }
        Self(self.0.saturating_mul(percent as u64) / 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Catalog entries (owned by the catalog adapter, immutable once fetched)
// ============================================================================

/// One option of a choice-type question
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Option identifier
    pub id: OptionId,
    /// Human-readable option label
    pub name: String,
}

/// A per-ticket question attached to a product
///
/// An empty option list means the answer is free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question identifier
    pub id: QuestionId,
    /// Human-readable question label
    pub label: String,
    /// Whether an answer is required before review
    pub required: bool,
    /// Options for choice-type questions (empty for free text)
    pub options: Vec<QuestionOption>,
}

/// A purchasable variation of a product (e.g. t-shirt size)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariation {
    /// Variation identifier
    pub id: VariationId,
    /// Human-readable variation label
    pub name: String,
    /// Price of this variation (overrides the product price)
    pub price: Money,
}

/// A catalog entry: ticket type or add-on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,
    /// Human-readable product name
    pub name: String,
    /// Base price, used when no variation is selected
    pub price: Money,
    /// Admission products grant venue entry and carry a named attendee
    pub admission: bool,
    /// Purchasable variations (empty when the product has none)
    pub variations: Vec<ProductVariation>,
    /// Per-ticket questions (empty when the product has none)
    pub questions: Vec<Question>,
}

/// A catalog entry for lodging
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelRoom {
    /// Room identifier
    pub id: HotelRoomId,
    /// Human-readable room name
    pub name: String,
    /// Price per night
    pub price_per_night: Money,
    /// Sleeping capacity
    pub capacity: u32,
    /// First bookable night
    pub available_from: NaiveDate,
    /// Last bookable night (checkout day)
    pub available_to: NaiveDate,
}

// ============================================================================
// Selected instances (owned by the cart)
// ============================================================================

/// One unit of a chosen product
///
/// Created when a visitor adds a product, mutated as answers and attendee
/// details come in, destroyed on removal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedProduct {
    /// Instance identifier, unique per added unit
    pub id: InstanceId,
    /// The parent product in the catalog
    pub product_id: ProductId,
    /// Selected variation, if the product has variations
    pub variation: Option<VariationId>,
    /// Attendee name (admission products)
    pub attendee_name: Option<String>,
    /// Attendee email (admission products)
    pub attendee_email: Option<String>,
    /// Answers keyed by question identifier
    pub answers: HashMap<QuestionId, String>,
}

impl SelectedProduct {
    /// A fresh instance of a product with nothing filled in yet
    #[must_use]
    pub fn new(id: InstanceId, product_id: ProductId, variation: Option<VariationId>) -> Self {
        Self {
            id,
            product_id,
            variation,
            attendee_name: None,
            attendee_email: None,
            answers: HashMap::new(),
        }
    }
}

/// One booked unit of a hotel room
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedHotelRoom {
    /// Instance identifier, unique per booked unit
    pub id: InstanceId,
    /// The parent room in the catalog
    pub room_id: HotelRoomId,
    /// Check-in date
    pub check_in: NaiveDate,
    /// Check-out date
    pub check_out: NaiveDate,
}

impl SelectedHotelRoom {
    /// Number of nights booked
    #[must_use]
    pub fn nights(&self) -> u32 {
        u32::try_from((self.check_out - self.check_in).num_days()).unwrap_or(0)
    }
}

// ============================================================================
// Invoice information
// ============================================================================

/// Billing details for the order
///
/// Replaced wholesale by `UpdateInformation`; never partially merged, so a
/// stale field can never survive an edit unnoticed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceInformation {
    /// Recipient name
    pub name: String,
    /// Company name (business orders)
    pub company_name: String,
    /// VAT identifier (business orders)
    pub vat_id: String,
    /// Street address
    pub address: String,
    /// Postal code
    pub zip_code: String,
    /// City
    pub city: String,
    /// ISO country code
    pub country: String,
    /// Fiscal code (required for Italian individuals)
    pub fiscal_code: String,
}

// ============================================================================
// Vouchers
// ============================================================================

/// Discount attached to a validated voucher
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Discount {
    /// Percentage off the order subtotal (0-100)
    Percentage(u8),
    /// Fixed amount off the order subtotal
    Amount(Money),
}

/// A validated discount code
///
/// At most one voucher is active per order; applying a new one replaces it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// The code the visitor entered
    pub code: String,
    /// The discount granted by the backend
    pub discount: Discount,
}

// ============================================================================
// Order submission
// ============================================================================

/// Confirmation returned by the order backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    /// URL where the visitor can manage the order
    pub order_url: String,
    /// URL the visitor is redirected to for payment
    pub payment_url: String,
}

/// Runtime-only submission tracking for the duplicate-submit guard
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// No submission underway
    #[default]
    Idle,
    /// A submission request is in flight; further submits are ignored
    InFlight,
    /// The backend confirmed the order
    Completed {
        /// The confirmation returned by the backend
        confirmation: OrderConfirmation,
        /// When the confirmation arrived
        completed_at: DateTime<Utc>,
    },
}

// ============================================================================
// Order state (aggregate root)
// ============================================================================

/// The cart aggregate: everything a visitor has selected and entered
///
/// Persisted as a single JSON document after every mutation. The
/// `submission` and `last_error` fields are runtime-only and excluded from
/// the persisted document, which therefore round-trips exactly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderState {
    /// Selected product instances, keyed by product, in insertion order
    #[serde(default)]
    pub selected_products: HashMap<ProductId, Vec<SelectedProduct>>,
    /// Booked hotel room instances, keyed by room, in insertion order
    #[serde(default)]
    pub selected_hotel_rooms: HashMap<HotelRoomId, Vec<SelectedHotelRoom>>,
    /// Billing details
    #[serde(default)]
    pub invoice_information: InvoiceInformation,
    /// The active voucher, if any
    #[serde(default)]
    pub voucher: Option<Voucher>,
    /// Whether the order is invoiced to a business
    #[serde(default)]
    pub is_business: bool,
    /// Duplicate-submit guard; never persisted
    #[serde(skip)]
    pub submission: SubmissionStatus,
    /// Most recent user-facing failure; never persisted
    #[serde(skip)]
    pub last_error: Option<String>,
}

impl OrderState {
    /// Whether at least one product or hotel room is selected
    #[must_use]
    pub fn has_selections(&self) -> bool {
        self.selected_products.values().any(|v| !v.is_empty())
            || self.selected_hotel_rooms.values().any(|v| !v.is_empty())
    }

    /// Total number of selected product instances
    #[must_use]
    pub fn product_instance_count(&self) -> usize {
        self.selected_products.values().map(Vec::len).sum()
    }

    /// Iterate over all selected product instances
    pub fn product_instances(&self) -> impl Iterator<Item = &SelectedProduct> {
        self.selected_products.values().flatten()
    }

    /// Find a selected product instance by its instance id
    #[must_use]
    pub fn find_instance(&self, instance_id: InstanceId) -> Option<&SelectedProduct> {
        self.product_instances().find(|i| i.id == instance_id)
    }

    /// Find a selected product instance by its instance id, mutably
    pub fn find_instance_mut(&mut self, instance_id: InstanceId) -> Option<&mut SelectedProduct> {
        self.selected_products
            .values_mut()
            .flatten()
            .find(|i| i.id == instance_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn money_display_renders_cents() {
        assert_eq!(Money::from_cents(12345).to_string(), "123.45");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }

    #[test]
    fn money_percentage_clamps_at_full_amount() {
        let amount = Money::from_cents(200);
        assert_eq!(amount.percentage(10), Money::from_cents(20));
        assert_eq!(amount.percentage(100), amount);
        assert_eq!(amount.percentage(250), amount);
    }

    #[test]
    fn money_saturating_sub_stops_at_zero() {
        let small = Money::from_cents(10);
        let large = Money::from_cents(100);
        assert_eq!(small.saturating_sub(large), Money::ZERO);
        assert_eq!(large.saturating_sub(small), Money::from_cents(90));
    }

    #[test]
    fn hotel_room_nights() {
        let room = SelectedHotelRoom {
            id: InstanceId::from_uuid(Uuid::nil()),
            room_id: HotelRoomId::from("double"),
            check_in: NaiveDate::from_ymd_opt(2025, 5, 28).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
        };
        assert_eq!(room.nights(), 3);
    }

    #[test]
    fn order_state_default_is_empty() {
        let state = OrderState::default();
        assert!(!state.has_selections());
        assert_eq!(state.product_instance_count(), 0);
        assert!(state.voucher.is_none());
        assert!(!state.is_business);
        assert_eq!(state.submission, SubmissionStatus::Idle);
    }

    #[test]
    fn persisted_document_round_trips() {
        let mut state = OrderState::default();
        state.selected_products.insert(
            ProductId::from("ticket-std"),
            vec![SelectedProduct {
                id: InstanceId::from_uuid(Uuid::from_u128(7)),
                product_id: ProductId::from("ticket-std"),
                variation: None,
                attendee_name: Some("Ada".to_string()),
                attendee_email: None,
                answers: HashMap::from([(QuestionId::from("q-diet"), "vegan".to_string())]),
            }],
        );
        state.voucher = Some(Voucher {
            code: "VALID10".to_string(),
            discount: Discount::Percentage(10),
        });
        state.is_business = true;

        let json = serde_json::to_string(&state).unwrap();
        let restored: OrderState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
