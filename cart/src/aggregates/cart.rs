//! The cart aggregate for the checkout flow.
//!
//! All ten cart operations plus the submission workflow live here as one
//! reducer over the `OrderState` aggregate root. Mutations are optimistic
//! and synchronous; everything that needs the backend (voucher validation,
//! order submission) is two-phase: the command emits a gateway effect, and
//! the authoritative outcome returns as a distinct event action that
//! reconciles state.
//!
//! Every state-mutating action also emits a persistence effect carrying a
//! snapshot of the post-mutation state, so the durable store tracks the
//! cart across reloads. A failed save only loses durability.

use crate::gateway::{
    OrderGateway, OrderRejection, SubmissionOutcome, VoucherGateway, VoucherOutcome,
    VoucherRejection,
};
use crate::storage::CartStorage;
use crate::types::{
    HotelRoomId, InstanceId, InvoiceInformation, OrderConfirmation, OrderState, ProductId,
    SelectedHotelRoom, SelectedProduct, SubmissionStatus, QuestionId, VariationId, Voucher,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use ticketshop_core::{Clock, Effect, IdGenerator, Reducer, SmallVec, smallvec};

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Which attendee detail a ticket-info update targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendeeField {
    /// The attendee's name
    Name,
    /// The attendee's email address
    Email,
}

/// Actions for the cart aggregate
///
/// Commands come from the visitor; events are produced by gateway effects
/// and carry the authoritative backend outcome back into the reducer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CartAction {
    // Commands
    /// Add one unit of a product to the cart
    AddProduct {
        /// Product to add
        product_id: ProductId,
        /// Selected variation, if any
        variation: Option<VariationId>,
    },

    /// Remove one previously added unit
    ///
    /// No-op if the instance is already gone (idempotent double-clicks).
    RemoveProduct {
        /// Parent product of the instance
        product_id: ProductId,
        /// The unit to remove
        instance_id: InstanceId,
    },

    /// Book a hotel room for a date range
    AddHotelRoom {
        /// Room to book
        room_id: HotelRoomId,
        /// Check-in date
        check_in: NaiveDate,
        /// Check-out date
        check_out: NaiveDate,
    },

    /// Remove a previously booked room
    ///
    /// No-op if the booking is already gone.
    RemoveHotelRoom {
        /// Parent room of the booking
        room_id: HotelRoomId,
        /// The booking to remove
        instance_id: InstanceId,
    },

    /// Replace the invoice information wholesale
    UpdateInformation {
        /// The full new billing details
        information: InvoiceInformation,
    },

    /// Flip the business flag, keeping entered invoice fields
    UpdateIsBusiness {
        /// Whether the order is invoiced to a business
        is_business: bool,
    },

    /// Set an attendee detail on a specific instance
    ///
    /// No-op if the instance is not found.
    UpdateTicketInfo {
        /// The instance to update
        instance_id: InstanceId,
        /// Which detail to set
        field: AttendeeField,
        /// The new value
        value: String,
    },

    /// Answer a question on a specific instance
    ///
    /// Creates the answer entry if absent; no-op if the instance is not
    /// found.
    UpdateQuestionAnswer {
        /// The instance to update
        instance_id: InstanceId,
        /// The question being answered
        question_id: QuestionId,
        /// The answer value
        answer: String,
    },

    /// Ask the backend to validate a voucher code
    ApplyVoucher {
        /// The code the visitor entered
        code: String,
    },

    /// Drop the active voucher, no backend call required
    RemoveVoucher,

    /// Submit the order to the backend
    ///
    /// Ignored while a previous submission is still in flight.
    SubmitOrder,

    /// Clear the cart and its durable document
    ResetCart,

    /// Reconcile the cart against a freshly fetched catalog
    ///
    /// Instances referencing ids that are no longer offered are dropped.
    CatalogRefreshed {
        /// Products currently offered
        product_ids: Vec<ProductId>,
        /// Hotel rooms currently offered
        hotel_room_ids: Vec<HotelRoomId>,
    },

    // Events
    /// The backend accepted the voucher; replaces any active voucher
    VoucherApplied {
        /// The validated voucher
        voucher: Voucher,
    },

    /// The backend refused the voucher; state is unchanged
    VoucherRejected {
        /// The refused code
        code: String,
        /// Why it was refused
        rejection: VoucherRejection,
    },

    /// The voucher backend could not be reached; retryable
    VoucherCheckFailed {
        /// The code that was being checked
        code: String,
        /// Transport failure description
        reason: String,
    },

    /// The backend confirmed the order; the cart is cleared
    OrderAccepted {
        /// Confirmation with manage/payment URLs
        confirmation: OrderConfirmation,
    },

    /// The backend refused the order
    OrderRejected {
        /// Why it was refused
        rejection: OrderRejection,
    },

    /// The order backend could not be reached; retryable
    SubmissionFailed {
        /// Transport failure description
        reason: String,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the cart aggregate
#[derive(Clone)]
pub struct CartEnvironment {
    /// Clock for confirmation timestamps
    pub clock: Arc<dyn Clock>,
    /// Source of fresh instance ids
    pub ids: Arc<dyn IdGenerator>,
    /// Durable cart store
    pub storage: Arc<dyn CartStorage>,
    /// Voucher validation backend
    pub vouchers: Arc<dyn VoucherGateway>,
    /// Order submission backend
    pub orders: Arc<dyn OrderGateway>,
    /// Conference the cart belongs to
    pub conference: String,
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the cart aggregate
///
/// Commands mutate optimistically (capacity limits are the backend's job at
/// submission time); gateway outcomes come back as events.
#[derive(Clone, Debug, Default)]
pub struct CartReducer;

impl CartReducer {
    /// Creates a new `CartReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Persistence effect carrying a snapshot of the post-mutation state
    ///
    /// A failed save is logged and swallowed: the in-memory state stays
    /// authoritative, only durability is lost.
    fn persist(state: &OrderState, env: &CartEnvironment) -> Effect<CartAction> {
        let snapshot = state.clone();
        let storage = Arc::clone(&env.storage);

        Effect::Future(Box::pin(async move {
            if let Err(error) = storage.save(&snapshot) {
                tracing::warn!(%error, "failed to persist cart state");
            }
            None
        }))
    }

    /// Effect clearing the durable document after completion or reset
    fn clear_storage(env: &CartEnvironment) -> Effect<CartAction> {
        let storage = Arc::clone(&env.storage);

        Effect::Future(Box::pin(async move {
            if let Err(error) = storage.clear() {
                tracing::warn!(%error, "failed to clear persisted cart state");
            }
            None
        }))
    }

    /// Effect validating a voucher code against the backend
    fn validate_voucher(code: String, env: &CartEnvironment) -> Effect<CartAction> {
        let vouchers = Arc::clone(&env.vouchers);

        Effect::Future(Box::pin(async move {
            match vouchers.validate(&code).await {
                Ok(VoucherOutcome::Accepted(voucher)) => {
                    Some(CartAction::VoucherApplied { voucher })
                },
                Ok(VoucherOutcome::Rejected(rejection)) => {
                    Some(CartAction::VoucherRejected { code, rejection })
                },
                Err(error) => Some(CartAction::VoucherCheckFailed {
                    code,
                    reason: error.to_string(),
                }),
            }
        }))
    }

    /// Effect submitting a snapshot of the order to the backend
    fn submit_order(state: &OrderState, env: &CartEnvironment) -> Effect<CartAction> {
        let snapshot = state.clone();
        let orders = Arc::clone(&env.orders);
        let conference = env.conference.clone();

        Effect::Future(Box::pin(async move {
            match orders.submit(&conference, &snapshot).await {
                Ok(SubmissionOutcome::Confirmed(confirmation)) => {
                    Some(CartAction::OrderAccepted { confirmation })
                },
                Ok(SubmissionOutcome::Rejected(rejection)) => {
                    Some(CartAction::OrderRejected { rejection })
                },
                Err(error) => Some(CartAction::SubmissionFailed {
                    reason: error.to_string(),
                }),
            }
        }))
    }
}

impl Reducer for CartReducer {
    type State = OrderState;
    type Action = CartAction;
    type Environment = CartEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per cart operation
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Product selection ==========
            CartAction::AddProduct {
                product_id,
                variation,
            } => {
                let instance = SelectedProduct::new(
                    InstanceId::from_uuid(env.ids.generate()),
                    product_id.clone(),
                    variation,
                );

                tracing::debug!(product = %product_id, instance = %instance.id, "product added");

                state
                    .selected_products
                    .entry(product_id)
                    .or_default()
                    .push(instance);
                state.last_error = None;

                smallvec![Self::persist(state, env)]
            },

            CartAction::RemoveProduct {
                product_id,
                instance_id,
            } => {
                let mut removed = false;

                if let Some(instances) = state.selected_products.get_mut(&product_id) {
                    let before = instances.len();
                    instances.retain(|i| i.id != instance_id);
                    removed = instances.len() != before;

                    if instances.is_empty() {
                        state.selected_products.remove(&product_id);
                    }
                }

                if removed {
                    smallvec![Self::persist(state, env)]
                } else {
                    // Idempotent double-click: nothing to do
                    SmallVec::new()
                }
            },

            // ========== Hotel rooms ==========
            CartAction::AddHotelRoom {
                room_id,
                check_in,
                check_out,
            } => {
                if check_out <= check_in {
                    state.last_error =
                        Some("check-out must come after check-in".to_string());
                    return SmallVec::new();
                }

                let booking = SelectedHotelRoom {
                    id: InstanceId::from_uuid(env.ids.generate()),
                    room_id: room_id.clone(),
                    check_in,
                    check_out,
                };

                state
                    .selected_hotel_rooms
                    .entry(room_id)
                    .or_default()
                    .push(booking);
                state.last_error = None;

                smallvec![Self::persist(state, env)]
            },

            CartAction::RemoveHotelRoom {
                room_id,
                instance_id,
            } => {
                let mut removed = false;

                if let Some(bookings) = state.selected_hotel_rooms.get_mut(&room_id) {
                    let before = bookings.len();
                    bookings.retain(|b| b.id != instance_id);
                    removed = bookings.len() != before;

                    if bookings.is_empty() {
                        state.selected_hotel_rooms.remove(&room_id);
                    }
                }

                if removed {
                    smallvec![Self::persist(state, env)]
                } else {
                    SmallVec::new()
                }
            },

            // ========== Invoice information ==========
            CartAction::UpdateInformation { information } => {
                // Wholesale replacement; a partial merge could keep stale
                // fields alive unnoticed.
                state.invoice_information = information;
                smallvec![Self::persist(state, env)]
            },

            CartAction::UpdateIsBusiness { is_business } => {
                // Entered invoice fields survive the flip; dropping them
                // would surprise the visitor.
                state.is_business = is_business;
                smallvec![Self::persist(state, env)]
            },

            // ========== Per-ticket details ==========
            CartAction::UpdateTicketInfo {
                instance_id,
                field,
                value,
            } => match state.find_instance_mut(instance_id) {
                Some(instance) => {
                    match field {
                        AttendeeField::Name => instance.attendee_name = Some(value),
                        AttendeeField::Email => instance.attendee_email = Some(value),
                    }
                    smallvec![Self::persist(state, env)]
                },
                None => SmallVec::new(),
            },

            CartAction::UpdateQuestionAnswer {
                instance_id,
                question_id,
                answer,
            } => match state.find_instance_mut(instance_id) {
                Some(instance) => {
                    instance.answers.insert(question_id, answer);
                    smallvec![Self::persist(state, env)]
                },
                None => SmallVec::new(),
            },

            // ========== Vouchers (two-phase) ==========
            CartAction::ApplyVoucher { code } => {
                // State untouched until the backend answers
                smallvec![Self::validate_voucher(code, env)]
            },

            CartAction::VoucherApplied { voucher } => {
                tracing::info!(code = %voucher.code, "voucher applied");
                // Replaces any previously active voucher
                state.voucher = Some(voucher);
                state.last_error = None;
                smallvec![Self::persist(state, env)]
            },

            CartAction::VoucherRejected { code, rejection } => {
                tracing::info!(%code, %rejection, "voucher rejected");
                state.last_error = Some(rejection.to_string());
                SmallVec::new()
            },

            CartAction::VoucherCheckFailed { code, reason } => {
                tracing::warn!(%code, %reason, "voucher check failed");
                state.last_error = Some(reason);
                SmallVec::new()
            },

            CartAction::RemoveVoucher => {
                state.voucher = None;
                smallvec![Self::persist(state, env)]
            },

            // ========== Submission (two-phase, guarded) ==========
            CartAction::SubmitOrder => match state.submission {
                SubmissionStatus::InFlight => {
                    tracing::debug!("duplicate submit ignored, submission in flight");
                    SmallVec::new()
                },
                SubmissionStatus::Completed { .. } => {
                    tracing::debug!("submit ignored, order already confirmed");
                    SmallVec::new()
                },
                SubmissionStatus::Idle => {
                    state.submission = SubmissionStatus::InFlight;
                    smallvec![Self::submit_order(state, env)]
                },
            },

            CartAction::OrderAccepted { confirmation } => {
                tracing::info!(order_url = %confirmation.order_url, "order confirmed");

                *state = OrderState {
                    submission: SubmissionStatus::Completed {
                        confirmation,
                        completed_at: env.clock.now(),
                    },
                    ..OrderState::default()
                };

                smallvec![Self::clear_storage(env)]
            },

            CartAction::OrderRejected { rejection } => {
                state.submission = SubmissionStatus::Idle;

                match rejection {
                    OrderRejection::SoldOut { product_ids } => {
                        // Drop the offending instances; the sequencer then
                        // routes the visitor back to the tickets step.
                        let gone: HashSet<ProductId> = product_ids.iter().cloned().collect();
                        state.selected_products.retain(|id, _| !gone.contains(id));
                        state.last_error = Some(format!(
                            "no longer available: {}",
                            product_ids
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join(", ")
                        ));
                        smallvec![Self::persist(state, env)]
                    },
                    OrderRejection::PaymentFailed { reason } => {
                        tracing::warn!(%reason, "payment failed");
                        state.last_error = Some(reason);
                        SmallVec::new()
                    },
                }
            },

            CartAction::SubmissionFailed { reason } => {
                tracing::warn!(%reason, "order submission failed");
                state.submission = SubmissionStatus::Idle;
                state.last_error = Some(reason);
                SmallVec::new()
            },

            // ========== Lifecycle ==========
            CartAction::ResetCart => {
                *state = OrderState::default();
                smallvec![Self::clear_storage(env)]
            },

            CartAction::CatalogRefreshed {
                product_ids,
                hotel_room_ids,
            } => {
                let products: HashSet<ProductId> = product_ids.into_iter().collect();
                let rooms: HashSet<HotelRoomId> = hotel_room_ids.into_iter().collect();

                let before = state.product_instance_count()
                    + state.selected_hotel_rooms.values().map(Vec::len).sum::<usize>();

                state
                    .selected_products
                    .retain(|id, _| products.contains(id));
                state
                    .selected_hotel_rooms
                    .retain(|id, _| rooms.contains(id));

                let after = state.product_instance_count()
                    + state.selected_hotel_rooms.values().map(Vec::len).sum::<usize>();

                if after == before {
                    SmallVec::new()
                } else {
                    tracing::info!(dropped = before - after, "dropped stale cart instances");
                    smallvec![Self::persist(state, env)]
                }
            },
        }
    }
}
