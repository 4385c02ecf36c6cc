//! Catalog adapter: the read-only view of what the conference sells.
//!
//! The catalog is fetched from the backend at the start of the checkout
//! flow (per conference and language) and treated as immutable input.
//! Selected instances must reference catalog ids; a refresh triggers a
//! reconciliation pass that drops instances whose ids are gone.

use crate::gateway::GatewayError;
use crate::types::{HotelRoom, HotelRoomId, Product, ProductId, Question};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The catalog of products and hotel rooms offered by a conference
///
/// Immutable once fetched; lookups are by identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    products: Vec<Product>,
    hotel_rooms: Vec<HotelRoom>,
}

impl Catalog {
    /// Build a catalog from fetched entries
    #[must_use]
    pub const fn new(products: Vec<Product>, hotel_rooms: Vec<HotelRoom>) -> Self {
        Self {
            products,
            hotel_rooms,
        }
    }

    /// All products, in backend order
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// All hotel rooms, in backend order
    #[must_use]
    pub fn hotel_rooms(&self) -> &[HotelRoom] {
        &self.hotel_rooms
    }

    /// Look up a product by id
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Look up a hotel room by id
    #[must_use]
    pub fn hotel_room(&self, id: &HotelRoomId) -> Option<&HotelRoom> {
        self.hotel_rooms.iter().find(|r| &r.id == id)
    }

    /// The questions attached to a product, empty if the product is unknown
    #[must_use]
    pub fn questions_for(&self, id: &ProductId) -> &[Question] {
        self.product(id).map_or(&[], |p| p.questions.as_slice())
    }

    /// Ids of every offered product
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.products.iter().map(|p| p.id.clone()).collect()
    }

    /// Ids of every offered hotel room
    #[must_use]
    pub fn hotel_room_ids(&self) -> Vec<HotelRoomId> {
        self.hotel_rooms.iter().map(|r| r.id.clone()).collect()
    }
}

/// Backend query for the catalog (external collaborator)
///
/// Given a conference code and language, returns the products and hotel
/// rooms on offer, each with nested questions and variations.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Fetch the catalog for a conference in the given language
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on transport failures; these are surfaced
    /// to the visitor as retryable and never mutate cart state.
    async fn fetch(&self, conference: &str, language: &str) -> Result<Catalog, GatewayError>;
}

/// Catalog gateway serving a fixed catalog, for tests and the demo binary
#[derive(Clone, Debug, Default)]
pub struct StaticCatalogGateway {
    catalog: Catalog,
    unavailable: bool,
}

impl StaticCatalogGateway {
    /// Serve the given catalog on every fetch
    #[must_use]
    pub const fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            unavailable: false,
        }
    }

    /// Make every fetch fail with a transport error
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            catalog: Catalog::new(Vec::new(), Vec::new()),
            unavailable: true,
        }
    }
}

#[async_trait]
impl CatalogGateway for StaticCatalogGateway {
    async fn fetch(&self, conference: &str, _language: &str) -> Result<Catalog, GatewayError> {
        if self.unavailable {
            return Err(GatewayError::Unavailable(format!(
                "catalog backend unreachable for {conference}"
            )));
        }
        Ok(self.catalog.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Money;

    fn ticket(id: &str) -> Product {
        Product {
            id: ProductId::from(id),
            name: id.to_string(),
            price: Money::from_cents(10_000),
            admission: true,
            variations: Vec::new(),
            questions: Vec::new(),
        }
    }

    #[test]
    fn lookup_by_id() {
        let catalog = Catalog::new(vec![ticket("early-bird"), ticket("regular")], Vec::new());

        assert!(catalog.product(&ProductId::from("early-bird")).is_some());
        assert!(catalog.product(&ProductId::from("unknown")).is_none());
        assert_eq!(catalog.product_ids().len(), 2);
    }

    #[tokio::test]
    async fn static_gateway_serves_catalog() {
        let catalog = Catalog::new(vec![ticket("regular")], Vec::new());
        let gateway = StaticCatalogGateway::new(catalog.clone());

        let fetched = gateway.fetch("pycon-demo", "en").await.unwrap();
        assert_eq!(fetched, catalog);
    }

    #[tokio::test]
    async fn unavailable_gateway_errors() {
        let gateway = StaticCatalogGateway::unavailable();
        assert!(gateway.fetch("pycon-demo", "en").await.is_err());
    }
}
