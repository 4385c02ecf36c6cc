//! Durability of the cart across sessions.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use ticketshop_cart::aggregates::CartEnvironment;
use ticketshop_cart::catalog::{Catalog, StaticCatalogGateway};
use ticketshop_cart::config::Config;
use ticketshop_cart::gateway::{MockOrderGateway, MockVoucherGateway};
use ticketshop_cart::session::CartSession;
use ticketshop_cart::storage::{CartStorage, InMemoryStorage, JsonFileStorage};
use ticketshop_cart::types::{
    Discount, InvoiceInformation, Money, OrderState, Product, ProductId, Voucher,
};
use ticketshop_core::environment::RandomIdGenerator;
use ticketshop_testing::test_clock;

fn catalog() -> Catalog {
    Catalog::new(
        vec![Product {
            id: ProductId::from("ticket-std"),
            name: "Conference ticket".to_string(),
            price: Money::from_cents(20_000),
            admission: false,
            variations: Vec::new(),
            questions: Vec::new(),
        }],
        Vec::new(),
    )
}

fn environment(storage: Arc<dyn CartStorage>) -> CartEnvironment {
    CartEnvironment {
        clock: Arc::new(test_clock()),
        ids: Arc::new(RandomIdGenerator),
        storage,
        vouchers: Arc::new(
            MockVoucherGateway::new().with_code("VALID10", Discount::Percentage(10)),
        ),
        orders: Arc::new(MockOrderGateway::confirming()),
        conference: "pycon-demo".to_string(),
    }
}

async fn begin(storage: Arc<dyn CartStorage>) -> CartSession {
    CartSession::begin(
        &Config::default(),
        Arc::new(StaticCatalogGateway::new(catalog())),
        environment(storage),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn cart_survives_a_reload() {
    let storage = Arc::new(InMemoryStorage::new());

    // First visit: fill the cart
    {
        let session = begin(Arc::clone(&storage) as Arc<dyn CartStorage>).await;
        session
            .add_product(ProductId::from("ticket-std"), None)
            .await
            .unwrap();
        session
            .update_information(InvoiceInformation {
                name: "Ada Lovelace".to_string(),
                address: "1 Analytical Engine Way".to_string(),
                zip_code: "00100".to_string(),
                city: "London".to_string(),
                country: "GB".to_string(),
                ..InvoiceInformation::default()
            })
            .await
            .unwrap();
        session.apply_voucher("VALID10").await.unwrap();
    }

    // Second visit: everything is still there
    let session = begin(Arc::clone(&storage) as Arc<dyn CartStorage>).await;
    let order = session.order().await;

    assert_eq!(order.product_instance_count(), 1);
    assert_eq!(order.invoice_information.name, "Ada Lovelace");
    assert_eq!(
        order.voucher,
        Some(Voucher {
            code: "VALID10".to_string(),
            discount: Discount::Percentage(10),
        })
    );
}

#[tokio::test]
async fn save_of_a_loaded_state_is_identical() {
    let storage = Arc::new(InMemoryStorage::new());

    {
        let session = begin(Arc::clone(&storage) as Arc<dyn CartStorage>).await;
        session
            .add_product(ProductId::from("ticket-std"), None)
            .await
            .unwrap();
    }

    let first = storage.raw_document().unwrap();
    let loaded = storage.load().unwrap().unwrap();
    storage.save(&loaded).unwrap();
    let second = storage.raw_document().unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn file_storage_round_trips_a_full_cart() {
    let path = std::env::temp_dir().join(format!("ticketshop-flow-{}.json", uuid::Uuid::new_v4()));
    let storage = Arc::new(JsonFileStorage::new(path.clone()));

    {
        let session = begin(Arc::clone(&storage) as Arc<dyn CartStorage>).await;
        session
            .add_product(ProductId::from("ticket-std"), None)
            .await
            .unwrap();
    }

    let session = begin(Arc::clone(&storage) as Arc<dyn CartStorage>).await;
    assert_eq!(session.order().await.product_instance_count(), 1);

    let _ = std::fs::remove_file(path);
}

#[test]
fn serialized_state_round_trips_exactly() {
    let mut state = OrderState::default();
    state.voucher = Some(Voucher {
        code: "VALID10".to_string(),
        discount: Discount::Amount(Money::from_cents(500)),
    });
    state.is_business = true;
    state.invoice_information.country = "IT".to_string();

    let document = serde_json::to_string(&state).unwrap();
    let restored: OrderState = serde_json::from_str(&document).unwrap();

    assert_eq!(restored, state);
    // And a second serialization is byte-identical
    assert_eq!(serde_json::to_string(&restored).unwrap(), document);
}
