//! Checkout step sequencing.
//!
//! The flow walks four ordered steps - Tickets, Information, Questions,
//! Review - with Complete as the terminal state after a confirmed
//! submission. Forward progression is mostly unconditional; the one
//! computed transition is Information → Questions, which is skipped
//! entirely when no selected instance has any questions to answer.
//!
//! Everything here is a pure function over `(&OrderState, &Catalog)`:
//! re-entering a step after a reload or browser-back re-reads current
//! state instead of resetting it.

use crate::catalog::Catalog;
use crate::types::{InstanceId, InvoiceInformation, OrderState, QuestionId, SubmissionStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The ordered steps of the checkout flow
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CheckoutStep {
    /// Selecting products and hotel rooms
    Tickets,
    /// Entering invoice information
    Information,
    /// Answering per-ticket questions
    Questions,
    /// Reviewing the order before submission
    Review,
    /// The order was confirmed by the backend
    Complete,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tickets => "tickets",
            Self::Information => "information",
            Self::Questions => "questions",
            Self::Review => "review",
            Self::Complete => "complete",
        };
        write!(f, "{name}")
    }
}

/// Total number of questions across all selected product instances
///
/// Each instance contributes the question count of its parent product.
/// Instances referencing products missing from the catalog contribute
/// nothing (stale references are dropped at the next reconciliation).
#[must_use]
pub fn total_questions(state: &OrderState, catalog: &Catalog) -> usize {
    state
        .product_instances()
        .map(|instance| catalog.questions_for(&instance.product_id).len())
        .sum()
}

/// The step after `current` once the visitor asks to move forward
///
/// - Tickets → Information is unconditional: an empty cart may proceed
///   (zero-cost and add-on-only registrations are a thing).
/// - Information → Questions is skipped straight to Review when no
///   selected instance has questions.
/// - Review advances only once the submission is confirmed.
#[must_use]
pub fn next_step(current: CheckoutStep, state: &OrderState, catalog: &Catalog) -> CheckoutStep {
    match current {
        CheckoutStep::Tickets => CheckoutStep::Information,
        CheckoutStep::Information => {
            if total_questions(state, catalog) == 0 {
                CheckoutStep::Review
            } else {
                CheckoutStep::Questions
            }
        },
        CheckoutStep::Questions => CheckoutStep::Review,
        CheckoutStep::Review | CheckoutStep::Complete => {
            if matches!(state.submission, SubmissionStatus::Completed { .. }) {
                CheckoutStep::Complete
            } else {
                CheckoutStep::Review
            }
        },
    }
}

/// The furthest step the current state justifies entering directly
///
/// Used when (re)entering the flow - after a reload, browser-back, or a
/// sold-out reconciliation - to route the visitor without corrupting
/// state. Mirrors the review-step guards: review requires at least one
/// selection, complete invoice information, and answered questions.
#[must_use]
pub fn reachable_step(state: &OrderState, catalog: &Catalog) -> CheckoutStep {
    if matches!(state.submission, SubmissionStatus::Completed { .. }) {
        return CheckoutStep::Complete;
    }

    if !state.has_selections() {
        return CheckoutStep::Tickets;
    }

    if !has_order_information(state) {
        return CheckoutStep::Information;
    }

    if !has_answered_ticket_questions(state, catalog) {
        return CheckoutStep::Questions;
    }

    CheckoutStep::Review
}

/// Invoice fields still missing for the current business flag
///
/// Company name and VAT id are only required for business orders; the
/// fiscal code only for Italian invoices.
#[must_use]
pub fn missing_information_fields(
    information: &InvoiceInformation,
    is_business: bool,
) -> Vec<&'static str> {
    let mut missing = Vec::new();

    let mut require = |value: &str, field: &'static str| {
        if value.trim().is_empty() {
            missing.push(field);
        }
    };

    require(&information.name, "name");
    require(&information.address, "address");
    require(&information.zip_code, "zip_code");
    require(&information.city, "city");
    require(&information.country, "country");

    if is_business {
        require(&information.company_name, "company_name");
        require(&information.vat_id, "vat_id");
    }

    if information.country == "IT" && !is_business {
        require(&information.fiscal_code, "fiscal_code");
    }

    missing
}

/// Whether the invoice information is complete enough to leave the
/// information step
#[must_use]
pub fn has_order_information(state: &OrderState) -> bool {
    missing_information_fields(&state.invoice_information, state.is_business).is_empty()
}

/// Required questions that still lack an answer, per instance
#[must_use]
pub fn unanswered_questions(
    state: &OrderState,
    catalog: &Catalog,
) -> Vec<(InstanceId, QuestionId)> {
    let mut unanswered = Vec::new();

    for instance in state.product_instances() {
        for question in catalog.questions_for(&instance.product_id) {
            if !question.required {
                continue;
            }

            let answered = instance
                .answers
                .get(&question.id)
                .is_some_and(|answer| !answer.trim().is_empty());

            if !answered {
                unanswered.push((instance.id, question.id.clone()));
            }
        }
    }

    unanswered
}

/// Whether every required question is answered and every admission
/// instance carries attendee details
#[must_use]
pub fn has_answered_ticket_questions(state: &OrderState, catalog: &Catalog) -> bool {
    if !unanswered_questions(state, catalog).is_empty() {
        return false;
    }

    state.product_instances().all(|instance| {
        let admission = catalog
            .product(&instance.product_id)
            .is_some_and(|p| p.admission);

        if !admission {
            return true;
        }

        let filled = |value: &Option<String>| {
            value
                .as_deref()
                .is_some_and(|v| !v.trim().is_empty())
        };

        filled(&instance.attendee_name) && filled(&instance.attendee_email)
    })
}
