//! The checkout session: the public face of the cart engine.
//!
//! A session ties together the catalog (fetched once at flow start), the
//! durable cart store (loaded and reconciled on begin), and the Store
//! runtime that owns the order state. UI layers talk to the session; the
//! session turns method calls into actions and, for backend-bound
//! operations, waits for the authoritative outcome event.

use crate::aggregates::{AttendeeField, CartAction, CartEnvironment, CartReducer};
use crate::catalog::{Catalog, CatalogGateway};
use crate::config::Config;
use crate::gateway::{GatewayError, OrderRejection, VoucherRejection};
use crate::sequencer::{self, CheckoutStep};
use crate::totals::{OrderTotals, order_totals};
use crate::types::{
    HotelRoomId, InstanceId, InvoiceInformation, OrderConfirmation, OrderState, ProductId,
    QuestionId, VariationId, Voucher,
};
use chrono::NaiveDate;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use ticketshop_runtime::{Store, StoreError};
use tokio::sync::broadcast;

/// Errors surfaced by the checkout session
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// The catalog could not be fetched; retryable
    #[error("catalog fetch failed: {0}")]
    CatalogFetch(#[from] GatewayError),

    /// The store refused the action (e.g. during shutdown)
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of applying a voucher through the session
#[derive(thiserror::Error, Debug)]
pub enum VoucherApplyError {
    /// The backend refused the code; state is unchanged
    #[error("voucher rejected: {0}")]
    Rejected(#[from] VoucherRejection),

    /// The backend could not be reached; retryable
    #[error("voucher check failed: {0}")]
    Transport(String),

    /// The store refused the action or the wait timed out
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of submitting the order through the session
#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    /// The backend refused the order
    #[error("order rejected: {0}")]
    Rejected(#[from] OrderRejection),

    /// The backend could not be reached; retryable
    #[error("submission failed: {0}")]
    Transport(String),

    /// The store refused the action or the wait timed out
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// A visitor's checkout session for one conference
///
/// Owns the Store and the fetched catalog. All cart operations go through
/// here; the session persists nothing itself - the reducer's persistence
/// effects do.
pub struct CartSession {
    store: Store<OrderState, CartAction, CartEnvironment, CartReducer>,
    catalog: RwLock<Catalog>,
    catalog_gateway: Arc<dyn CatalogGateway>,
    conference: String,
    language: String,
    gateway_timeout: Duration,
}

impl CartSession {
    /// Begin a checkout session: fetch the catalog, restore the persisted
    /// cart (corrupt documents silently fall back to an empty cart), and
    /// reconcile stale references against the fresh catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CatalogFetch`] when the catalog backend is
    /// unreachable - the one failure the flow cannot start without.
    pub async fn begin(
        config: &Config,
        catalog_gateway: Arc<dyn CatalogGateway>,
        environment: CartEnvironment,
    ) -> Result<Self, SessionError> {
        let catalog = catalog_gateway
            .fetch(&config.conference, &config.language)
            .await?;

        tracing::info!(
            conference = %config.conference,
            products = catalog.products().len(),
            hotel_rooms = catalog.hotel_rooms().len(),
            "catalog fetched"
        );

        let restored = environment.storage.load_or_default();
        let store = Store::new(restored, CartReducer::new(), environment);

        let session = Self {
            store,
            catalog: RwLock::new(catalog),
            catalog_gateway,
            conference: config.conference.clone(),
            language: config.language.clone(),
            gateway_timeout: config.gateway_timeout,
        };

        session.reconcile().await?;

        Ok(session)
    }

    fn catalog_snapshot(&self) -> Catalog {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send a mutation and wait for its immediate effects (persistence)
    /// to settle, so the durable document tracks every returned call.
    async fn send_and_settle(&self, action: CartAction) -> Result<(), StoreError> {
        let mut handle = self.store.send(action).await?;
        handle.wait().await;
        Ok(())
    }

    async fn reconcile(&self) -> Result<(), StoreError> {
        let catalog = self.catalog_snapshot();
        self.send_and_settle(CartAction::CatalogRefreshed {
            product_ids: catalog.product_ids(),
            hotel_room_ids: catalog.hotel_room_ids(),
        })
        .await
    }

    /// Re-fetch the catalog and drop instances it no longer offers
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CatalogFetch`] when the backend is
    /// unreachable; the old catalog stays in place in that case.
    pub async fn refresh_catalog(&self) -> Result<(), SessionError> {
        let fresh = self
            .catalog_gateway
            .fetch(&self.conference, &self.language)
            .await?;

        {
            let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
            *catalog = fresh;
        }

        self.reconcile().await?;
        Ok(())
    }

    // ========== Cart mutation API ==========

    /// Add one unit of a product
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn add_product(
        &self,
        product_id: ProductId,
        variation: Option<VariationId>,
    ) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::AddProduct {
            product_id,
            variation,
        })
        .await
    }

    /// Remove one previously added unit (idempotent)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn remove_product(
        &self,
        product_id: ProductId,
        instance_id: InstanceId,
    ) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::RemoveProduct {
            product_id,
            instance_id,
        })
        .await
    }

    /// Book a hotel room for a date range
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn add_hotel_room(
        &self,
        room_id: HotelRoomId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::AddHotelRoom {
            room_id,
            check_in,
            check_out,
        })
        .await
    }

    /// Remove a previously booked room (idempotent)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn remove_hotel_room(
        &self,
        room_id: HotelRoomId,
        instance_id: InstanceId,
    ) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::RemoveHotelRoom {
            room_id,
            instance_id,
        })
        .await
    }

    /// Replace the invoice information wholesale
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn update_information(
        &self,
        information: InvoiceInformation,
    ) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::UpdateInformation { information })
            .await
    }

    /// Flip the business flag, keeping entered invoice fields
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn update_is_business(&self, is_business: bool) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::UpdateIsBusiness { is_business })
            .await
    }

    /// Set an attendee detail on an instance (no-op if it is gone)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn update_ticket_info(
        &self,
        instance_id: InstanceId,
        field: AttendeeField,
        value: String,
    ) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::UpdateTicketInfo {
            instance_id,
            field,
            value,
        })
        .await
    }

    /// Answer a question on an instance (no-op if it is gone)
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn update_question_answer(
        &self,
        instance_id: InstanceId,
        question_id: QuestionId,
        answer: String,
    ) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::UpdateQuestionAnswer {
            instance_id,
            question_id,
            answer,
        })
        .await
    }

    /// Validate a voucher code and, on success, make it the active voucher
    ///
    /// Two-phase: the command emits a validation effect and this method
    /// waits for the outcome event for this code.
    ///
    /// # Errors
    ///
    /// [`VoucherApplyError::Rejected`] when the backend refuses the code
    /// (state unchanged), [`VoucherApplyError::Transport`] when the backend
    /// is unreachable (retryable).
    pub async fn apply_voucher(&self, code: &str) -> Result<Voucher, VoucherApplyError> {
        let requested = code.to_string();

        let outcome = self
            .store
            .send_and_wait_for(
                CartAction::ApplyVoucher {
                    code: requested.clone(),
                },
                move |action| match action {
                    CartAction::VoucherApplied { voucher } => voucher.code == requested,
                    CartAction::VoucherRejected { code, .. }
                    | CartAction::VoucherCheckFailed { code, .. } => *code == requested,
                    _ => false,
                },
                self.gateway_timeout,
            )
            .await?;

        match outcome {
            CartAction::VoucherApplied { voucher } => Ok(voucher),
            CartAction::VoucherRejected { rejection, .. } => Err(rejection.into()),
            CartAction::VoucherCheckFailed { reason, .. } => {
                Err(VoucherApplyError::Transport(reason))
            },
            _ => Err(VoucherApplyError::Store(StoreError::ChannelClosed)),
        }
    }

    /// Drop the active voucher
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn remove_voucher(&self) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::RemoveVoucher).await
    }

    /// Submit the order and wait for the backend's verdict
    ///
    /// Duplicate submissions are guarded at the reducer: while one is in
    /// flight, further submits produce no effects (and this method would
    /// wait for the in-flight outcome).
    ///
    /// # Errors
    ///
    /// [`SubmitError::Rejected`] when the backend refuses the order,
    /// [`SubmitError::Transport`] when it is unreachable (retryable).
    pub async fn submit(&self) -> Result<OrderConfirmation, SubmitError> {
        let outcome = self
            .store
            .send_and_wait_for(
                CartAction::SubmitOrder,
                |action| {
                    matches!(
                        action,
                        CartAction::OrderAccepted { .. }
                            | CartAction::OrderRejected { .. }
                            | CartAction::SubmissionFailed { .. }
                    )
                },
                self.gateway_timeout,
            )
            .await?;

        match outcome {
            CartAction::OrderAccepted { confirmation } => Ok(confirmation),
            CartAction::OrderRejected { rejection } => Err(rejection.into()),
            CartAction::SubmissionFailed { reason } => Err(SubmitError::Transport(reason)),
            _ => Err(SubmitError::Store(StoreError::ChannelClosed)),
        }
    }

    /// Clear the cart and its durable document
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses the action.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.send_and_settle(CartAction::ResetCart).await
    }

    // ========== Reads ==========

    /// Snapshot of the current order state
    pub async fn order(&self) -> OrderState {
        self.store.state(Clone::clone).await
    }

    /// The catalog this session was started with
    #[must_use]
    pub fn catalog(&self) -> Catalog {
        self.catalog_snapshot()
    }

    /// The furthest checkout step the current state justifies
    pub async fn step(&self) -> CheckoutStep {
        let catalog = self.catalog_snapshot();
        self.store
            .state(move |state| sequencer::reachable_step(state, &catalog))
            .await
    }

    /// The step after `current` when the visitor moves forward
    pub async fn next_step(&self, current: CheckoutStep) -> CheckoutStep {
        let catalog = self.catalog_snapshot();
        self.store
            .state(move |state| sequencer::next_step(current, state, &catalog))
            .await
    }

    /// Derived totals for the review step
    pub async fn totals(&self) -> OrderTotals {
        let catalog = self.catalog_snapshot();
        self.store
            .state(move |state| order_totals(state, &catalog))
            .await
    }

    /// Subscribe to actions produced by effects (outcome events)
    ///
    /// The explicit publish/subscribe surface: observers see voucher and
    /// submission outcomes without polling state.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartAction> {
        self.store.subscribe_actions()
    }

    /// Seed default answers for choice questions, as the questions step
    /// does on entry: every unanswered choice question gets its first
    /// option preselected. Free-text questions stay empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store refuses an action.
    pub async fn prepare_questions(&self) -> Result<(), StoreError> {
        let catalog = self.catalog_snapshot();
        let state = self.order().await;

        for instance in state.product_instances() {
            for question in catalog.questions_for(&instance.product_id) {
                let Some(first_option) = question.options.first() else {
                    continue;
                };

                if instance.answers.contains_key(&question.id) {
                    continue;
                }

                self.update_question_answer(
                    instance.id,
                    question.id.clone(),
                    first_option.id.to_string(),
                )
                .await?;
            }
        }

        Ok(())
    }
}
