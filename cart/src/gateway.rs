//! Backend gateways: voucher validation and order submission.
//!
//! Both are external collaborators. Their responses are explicit tagged
//! unions pattern-matched exhaustively at the reducer - a rejected voucher
//! and an unreachable backend are different things and travel on different
//! paths: rejections are domain outcomes, [`GatewayError`] is transport.
//!
//! Mock implementations with scriptable outcomes live here as well, used by
//! the test suites and the demo binary.

use crate::types::{Discount, OrderConfirmation, OrderState, ProductId, Voucher};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Transport-level gateway failure
///
/// Transient by definition: surfaced to the visitor as a retryable message.
/// No rollback is needed because no mutation happened.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GatewayError {
    /// The backend could not be reached
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something we could not interpret
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Why the backend refused a voucher code
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoucherRejection {
    /// The code does not exist
    #[error("voucher code is not valid")]
    Invalid,
    /// The code exists but its validity window has passed
    #[error("voucher code has expired")]
    Expired,
    /// The code exists but all redemptions are used up
    #[error("voucher code has no redemptions left")]
    Exhausted,
}

/// Result of validating a voucher code
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoucherOutcome {
    /// The code is valid and grants this discount
    Accepted(Voucher),
    /// The code was refused
    Rejected(VoucherRejection),
}

/// Why the backend refused an order
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderRejection {
    /// Some selected products are no longer available
    ///
    /// The cart reconciles by dropping the offending instances and sending
    /// the visitor back to the tickets step.
    #[error("products sold out")]
    SoldOut {
        /// The products that are gone
        product_ids: Vec<ProductId>,
    },
    /// The payment provider refused the payment
    #[error("payment failed: {reason}")]
    PaymentFailed {
        /// Provider-supplied reason
        reason: String,
    },
}

/// Result of submitting an order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    /// The order was created
    Confirmed(OrderConfirmation),
    /// The order was refused
    Rejected(OrderRejection),
}

/// Voucher validation call (external collaborator)
#[async_trait]
pub trait VoucherGateway: Send + Sync {
    /// Validate a voucher code against the backend
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on transport failures. A refused code is
    /// not an error - it comes back as [`VoucherOutcome::Rejected`].
    async fn validate(&self, code: &str) -> Result<VoucherOutcome, GatewayError>;
}

/// Order submission call (external collaborator)
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit the full order state for the given conference
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on transport failures. A refused order is
    /// not an error - it comes back as [`SubmissionOutcome::Rejected`].
    async fn submit(
        &self,
        conference: &str,
        order: &OrderState,
    ) -> Result<SubmissionOutcome, GatewayError>;
}

// ============================================================================
// Mock gateways
// ============================================================================

/// Voucher gateway with a fixed table of known codes
///
/// Unknown codes are rejected as invalid; known codes come back with their
/// configured discount. `unavailable` simulates a transport failure.
#[derive(Debug, Default)]
pub struct MockVoucherGateway {
    known: HashMap<String, Discount>,
    unavailable: bool,
}

impl MockVoucherGateway {
    /// A gateway that rejects every code
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a code with the discount it grants
    #[must_use]
    pub fn with_code(mut self, code: &str, discount: Discount) -> Self {
        self.known.insert(code.to_string(), discount);
        self
    }

    /// Make every validation fail with a transport error
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            known: HashMap::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl VoucherGateway for MockVoucherGateway {
    async fn validate(&self, code: &str) -> Result<VoucherOutcome, GatewayError> {
        if self.unavailable {
            return Err(GatewayError::Unavailable(
                "voucher backend unreachable".to_string(),
            ));
        }

        Ok(self.known.get(code).map_or(
            VoucherOutcome::Rejected(VoucherRejection::Invalid),
            |discount| {
                VoucherOutcome::Accepted(Voucher {
                    code: code.to_string(),
                    discount: discount.clone(),
                })
            },
        ))
    }
}

/// What a [`MockOrderGateway`] does on submit
#[derive(Clone, Debug)]
enum SubmitBehavior {
    Confirm,
    Reject(OrderRejection),
    Unavailable,
}

/// Order gateway with a scriptable outcome
///
/// Counts submissions so tests can assert the duplicate-submit guard, and
/// can delay its answer to keep a submission in flight.
#[derive(Debug)]
pub struct MockOrderGateway {
    behavior: SubmitBehavior,
    delay: Option<Duration>,
    submissions: AtomicUsize,
}

impl MockOrderGateway {
    /// A gateway that confirms every order
    #[must_use]
    pub const fn confirming() -> Self {
        Self {
            behavior: SubmitBehavior::Confirm,
            delay: None,
            submissions: AtomicUsize::new(0),
        }
    }

    /// A gateway that rejects every order with the given rejection
    #[must_use]
    pub const fn rejecting(rejection: OrderRejection) -> Self {
        Self {
            behavior: SubmitBehavior::Reject(rejection),
            delay: None,
            submissions: AtomicUsize::new(0),
        }
    }

    /// A gateway that fails every submit with a transport error
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            behavior: SubmitBehavior::Unavailable,
            delay: None,
            submissions: AtomicUsize::new(0),
        }
    }

    /// Delay every answer, keeping submissions in flight for the duration
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many submit calls reached this gateway
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderGateway for MockOrderGateway {
    async fn submit(
        &self,
        conference: &str,
        _order: &OrderState,
    ) -> Result<SubmissionOutcome, GatewayError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            SubmitBehavior::Confirm => Ok(SubmissionOutcome::Confirmed(OrderConfirmation {
                order_url: format!("https://orders.example/{conference}/manage"),
                payment_url: format!("https://pay.example/{conference}/checkout"),
            })),
            SubmitBehavior::Reject(rejection) => {
                Ok(SubmissionOutcome::Rejected(rejection.clone()))
            },
            SubmitBehavior::Unavailable => Err(GatewayError::Unavailable(
                "order backend unreachable".to_string(),
            )),
        }
    }
}
