//! Property tests for the cart mutation API.
//!
//! For any interleaving of add and remove calls across product ids, the
//! final selection contains exactly the instances that were added and not
//! subsequently removed, in insertion order.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use ticketshop_cart::aggregates::{CartAction, CartEnvironment, CartReducer};
use ticketshop_cart::gateway::{MockOrderGateway, MockVoucherGateway};
use ticketshop_cart::storage::InMemoryStorage;
use ticketshop_cart::types::{InstanceId, OrderState, ProductId};
use ticketshop_core::Reducer;
use ticketshop_testing::{SequentialIdGenerator, test_clock};

const PRODUCTS: [&str; 3] = ["ticket-std", "ticket-biz", "tshirt"];

#[derive(Clone, Debug)]
enum Op {
    /// Add one unit of the given product
    Add(usize),
    /// Remove the selector-th live instance of the given product
    Remove(usize, usize),
    /// Remove an instance id that never existed
    RemoveUnknown(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..PRODUCTS.len()).prop_map(Op::Add),
        (0..PRODUCTS.len(), 0..8usize).prop_map(|(p, s)| Op::Remove(p, s)),
        (0..PRODUCTS.len()).prop_map(Op::RemoveUnknown),
    ]
}

fn test_env() -> CartEnvironment {
    CartEnvironment {
        clock: Arc::new(test_clock()),
        ids: Arc::new(SequentialIdGenerator::new()),
        storage: Arc::new(InMemoryStorage::new()),
        vouchers: Arc::new(MockVoucherGateway::new()),
        orders: Arc::new(MockOrderGateway::confirming()),
        conference: "pycon-demo".to_string(),
    }
}

proptest! {
    #[test]
    fn adds_minus_removes_is_what_remains(ops in proptest::collection::vec(op_strategy(), 0..64)) {
        let reducer = CartReducer::new();
        let env = test_env();
        let mut state = OrderState::default();

        // Model: per product, the instance ids we expect to survive
        let mut model: HashMap<ProductId, Vec<InstanceId>> = HashMap::new();

        for op in ops {
            match op {
                Op::Add(p) => {
                    let product_id = ProductId::from(PRODUCTS[p]);
                    reducer.reduce(
                        &mut state,
                        CartAction::AddProduct {
                            product_id: product_id.clone(),
                            variation: None,
                        },
                        &env,
                    );

                    // The id just handed out is the newest instance
                    let added = state.selected_products[&product_id].last().unwrap().id;
                    model.entry(product_id).or_default().push(added);
                },
                Op::Remove(p, selector) => {
                    let product_id = ProductId::from(PRODUCTS[p]);
                    let Some(live) = model.get_mut(&product_id).filter(|v| !v.is_empty()) else {
                        continue;
                    };
                    let victim = live.remove(selector % live.len());
                    if live.is_empty() {
                        model.remove(&product_id);
                    }

                    reducer.reduce(
                        &mut state,
                        CartAction::RemoveProduct {
                            product_id,
                            instance_id: victim,
                        },
                        &env,
                    );
                },
                Op::RemoveUnknown(p) => {
                    // Never handed out by the sequential generator
                    let bogus = InstanceId::from_uuid(uuid::Uuid::from_u128(u128::MAX));
                    reducer.reduce(
                        &mut state,
                        CartAction::RemoveProduct {
                            product_id: ProductId::from(PRODUCTS[p]),
                            instance_id: bogus,
                        },
                        &env,
                    );
                },
            }
        }

        // Exactly the non-removed instances survive, in insertion order
        let survivors: HashMap<ProductId, Vec<InstanceId>> = state
            .selected_products
            .iter()
            .map(|(id, instances)| (id.clone(), instances.iter().map(|i| i.id).collect()))
            .collect();

        prop_assert_eq!(survivors, model);
    }

    #[test]
    fn every_added_instance_gets_a_unique_id(count in 1..32usize) {
        let reducer = CartReducer::new();
        let env = test_env();
        let mut state = OrderState::default();

        for _ in 0..count {
            reducer.reduce(
                &mut state,
                CartAction::AddProduct {
                    product_id: ProductId::from("ticket-std"),
                    variation: None,
                },
                &env,
            );
        }

        let mut ids: Vec<InstanceId> = state.product_instances().map(|i| i.id).collect();
        prop_assert_eq!(ids.len(), count);
        ids.sort_by_key(|id| *id.as_uuid());
        ids.dedup();
        prop_assert_eq!(ids.len(), count);
    }
}
