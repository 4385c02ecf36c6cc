//! Ticketshop demo driver.
//!
//! Wires the cart engine to mock gateways and walks one scripted checkout
//! end to end: select tickets, enter invoice information, answer
//! questions, apply a voucher, review totals, submit.

use chrono::NaiveDate;
use std::sync::Arc;
use ticketshop_cart::{
    aggregates::{AttendeeField, CartEnvironment},
    catalog::{Catalog, StaticCatalogGateway},
    config::Config,
    gateway::{MockOrderGateway, MockVoucherGateway},
    session::CartSession,
    storage::JsonFileStorage,
    types::{
        Discount, HotelRoom, HotelRoomId, InvoiceInformation, Money, Product, ProductId, Question,
        QuestionId, QuestionOption, OptionId, ProductVariation, VariationId,
    },
};
use ticketshop_core::environment::{RandomIdGenerator, SystemClock};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn demo_catalog() -> Catalog {
    Catalog::new(
        vec![
            Product {
                id: ProductId::from("ticket-std"),
                name: "Conference ticket".to_string(),
                price: Money::from_cents(24_000),
                admission: true,
                variations: vec![
                    ProductVariation {
                        id: VariationId::from("ticket-std-student"),
                        name: "Student".to_string(),
                        price: Money::from_cents(9_000),
                    },
                ],
                questions: vec![Question {
                    id: QuestionId::from("q-diet"),
                    label: "Dietary requirements".to_string(),
                    required: true,
                    options: vec![
                        QuestionOption {
                            id: OptionId::from("none"),
                            name: "No preference".to_string(),
                        },
                        QuestionOption {
                            id: OptionId::from("vegetarian"),
                            name: "Vegetarian".to_string(),
                        },
                    ],
                }],
            },
            Product {
                id: ProductId::from("tshirt"),
                name: "Conference t-shirt".to_string(),
                price: Money::from_cents(2_500),
                admission: false,
                variations: Vec::new(),
                questions: Vec::new(),
            },
        ],
        vec![HotelRoom {
            id: HotelRoomId::from("double"),
            name: "Double room".to_string(),
            price_per_night: Money::from_cents(11_000),
            capacity: 2,
            available_from: NaiveDate::from_ymd_opt(2025, 5, 26).unwrap_or_default(),
            available_to: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap_or_default(),
        }],
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("ticketshop={}", config.log_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(conference = %config.conference, "starting ticketshop demo");

    let environment = CartEnvironment {
        clock: Arc::new(SystemClock),
        ids: Arc::new(RandomIdGenerator),
        storage: Arc::new(JsonFileStorage::new(config.storage_path.clone())),
        vouchers: Arc::new(
            MockVoucherGateway::new().with_code("SPEAKER10", Discount::Percentage(10)),
        ),
        orders: Arc::new(MockOrderGateway::confirming()),
        conference: config.conference.clone(),
    };

    let session = CartSession::begin(
        &config,
        Arc::new(StaticCatalogGateway::new(demo_catalog())),
        environment,
    )
    .await?;

    // Tickets step: one full-price ticket, one t-shirt
    session
        .add_product(ProductId::from("ticket-std"), None)
        .await?;
    session.add_product(ProductId::from("tshirt"), None).await?;
    info!(step = %session.step().await, "tickets selected");

    // Information step
    session
        .update_information(InvoiceInformation {
            name: "Ada Lovelace".to_string(),
            address: "1 Analytical Engine Way".to_string(),
            zip_code: "00100".to_string(),
            city: "London".to_string(),
            country: "GB".to_string(),
            ..InvoiceInformation::default()
        })
        .await?;
    info!(step = %session.step().await, "invoice information entered");

    // Questions step: seed choice defaults, then fill attendee details
    session.prepare_questions().await?;
    let order = session.order().await;
    for instance in order.product_instances() {
        if session
            .catalog()
            .product(&instance.product_id)
            .is_some_and(|p| p.admission)
        {
            session
                .update_ticket_info(instance.id, AttendeeField::Name, "Ada Lovelace".to_string())
                .await?;
            session
                .update_ticket_info(
                    instance.id,
                    AttendeeField::Email,
                    "ada@example.com".to_string(),
                )
                .await?;
        }
    }
    info!(step = %session.step().await, "questions answered");

    // Review step: voucher and totals
    match session.apply_voucher("SPEAKER10").await {
        Ok(voucher) => info!(code = %voucher.code, "voucher applied"),
        Err(error) => info!(%error, "voucher not applied"),
    }

    let totals = session.totals().await;
    info!(
        subtotal = %totals.subtotal,
        discount = %totals.discount,
        total = %totals.total,
        "order reviewed"
    );

    // Submission
    let confirmation = session.submit().await?;
    info!(
        order_url = %confirmation.order_url,
        payment_url = %confirmation.payment_url,
        step = %session.step().await,
        "order confirmed"
    );

    Ok(())
}
