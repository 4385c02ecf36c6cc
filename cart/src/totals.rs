//! Derived order pricing.
//!
//! Totals are never stored: they are recomputed from the current order
//! state and catalog every time the review step renders. A selected
//! variation's price wins over the product's base price; hotel rooms are
//! priced per night; the voucher discount comes off the subtotal last.

use crate::catalog::Catalog;
use crate::types::{Discount, Money, OrderState};
use serde::{Deserialize, Serialize};

/// Prices derived from an order state against a catalog
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    /// Sum of all selected products and hotel rooms before discounts
    pub subtotal: Money,
    /// Discount granted by the active voucher
    pub discount: Money,
    /// What the visitor pays
    pub total: Money,
}

/// Compute the totals for an order against the current catalog
///
/// Instances referencing products or rooms missing from the catalog are
/// skipped: stale references are tolerated until the next reconciliation
/// pass drops them, and they must not contribute phantom prices meanwhile.
#[must_use]
pub fn order_totals(state: &OrderState, catalog: &Catalog) -> OrderTotals {
    let mut subtotal = Money::ZERO;

    for instance in state.product_instances() {
        let Some(product) = catalog.product(&instance.product_id) else {
            continue;
        };

        let unit_price = instance
            .variation
            .as_ref()
            .and_then(|variation_id| {
                product
                    .variations
                    .iter()
                    .find(|v| &v.id == variation_id)
                    .map(|v| v.price)
            })
            .unwrap_or(product.price);

        subtotal = subtotal.saturating_add(unit_price);
    }

    for (room_id, bookings) in &state.selected_hotel_rooms {
        let Some(room) = catalog.hotel_room(room_id) else {
            continue;
        };

        for booking in bookings {
            subtotal =
                subtotal.saturating_add(room.price_per_night.saturating_multiply(booking.nights()));
        }
    }

    let discount = match &state.voucher {
        Some(voucher) => match &voucher.discount {
            Discount::Percentage(percent) => subtotal.percentage(*percent),
            Discount::Amount(amount) => (*amount).min(subtotal),
        },
        None => Money::ZERO,
    };

    OrderTotals {
        subtotal,
        discount,
        total: subtotal.saturating_sub(discount),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{
        HotelRoom, HotelRoomId, InstanceId, Product, ProductId, ProductVariation, SelectedHotelRoom,
        SelectedProduct, VariationId, Voucher,
    };
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn catalog() -> Catalog {
        Catalog::new(
            vec![Product {
                id: ProductId::from("ticket-std"),
                name: "Standard ticket".to_string(),
                price: Money::from_cents(20_000),
                admission: true,
                variations: vec![ProductVariation {
                    id: VariationId::from("student"),
                    name: "Student".to_string(),
                    price: Money::from_cents(8_000),
                }],
                questions: Vec::new(),
            }],
            vec![HotelRoom {
                id: HotelRoomId::from("double"),
                name: "Double room".to_string(),
                price_per_night: Money::from_cents(9_000),
                capacity: 2,
                available_from: NaiveDate::from_ymd_opt(2025, 5, 27).unwrap(),
                available_to: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            }],
        )
    }

    fn instance(n: u128, variation: Option<&str>) -> SelectedProduct {
        SelectedProduct::new(
            InstanceId::from_uuid(Uuid::from_u128(n)),
            ProductId::from("ticket-std"),
            variation.map(VariationId::from),
        )
    }

    #[test]
    fn variation_price_overrides_base_price() {
        let mut state = OrderState::default();
        state.selected_products.insert(
            ProductId::from("ticket-std"),
            vec![instance(1, None), instance(2, Some("student"))],
        );

        let totals = order_totals(&state, &catalog());
        assert_eq!(totals.subtotal, Money::from_cents(28_000));
        assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn hotel_rooms_priced_per_night() {
        let mut state = OrderState::default();
        state.selected_hotel_rooms.insert(
            HotelRoomId::from("double"),
            vec![SelectedHotelRoom {
                id: InstanceId::from_uuid(Uuid::from_u128(3)),
                room_id: HotelRoomId::from("double"),
                check_in: NaiveDate::from_ymd_opt(2025, 5, 28).unwrap(),
                check_out: NaiveDate::from_ymd_opt(2025, 5, 30).unwrap(),
            }],
        );

        let totals = order_totals(&state, &catalog());
        assert_eq!(totals.subtotal, Money::from_cents(18_000));
    }

    #[test]
    fn percentage_voucher_discounts_subtotal() {
        let mut state = OrderState::default();
        state
            .selected_products
            .insert(ProductId::from("ticket-std"), vec![instance(1, None)]);
        state.voucher = Some(Voucher {
            code: "VALID10".to_string(),
            discount: Discount::Percentage(10),
        });

        let totals = order_totals(&state, &catalog());
        assert_eq!(totals.discount, Money::from_cents(2_000));
        assert_eq!(totals.total, Money::from_cents(18_000));
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let mut state = OrderState::default();
        state
            .selected_products
            .insert(ProductId::from("ticket-std"), vec![instance(1, None)]);
        state.voucher = Some(Voucher {
            code: "BIG".to_string(),
            discount: Discount::Amount(Money::from_cents(1_000_000)),
        });

        let totals = order_totals(&state, &catalog());
        assert_eq!(totals.discount, totals.subtotal);
        assert_eq!(totals.total, Money::ZERO);
    }

    #[test]
    fn stale_references_contribute_nothing() {
        let mut state = OrderState::default();
        state.selected_products.insert(
            ProductId::from("withdrawn"),
            vec![SelectedProduct::new(
                InstanceId::from_uuid(Uuid::from_u128(9)),
                ProductId::from("withdrawn"),
                None,
            )],
        );

        let totals = order_totals(&state, &catalog());
        assert_eq!(totals, OrderTotals::default());
    }
}
