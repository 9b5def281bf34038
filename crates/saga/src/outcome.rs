//! Record of a single compensation attempt.

use std::fmt;

use common::{CartId, ProductId};

/// What failed, what was run to undo it, and whether the undo applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationOutcome {
    pub failed_step: &'static str,
    pub compensating_step: &'static str,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub compensated: bool,
}

impl CompensationOutcome {
    pub(crate) fn new(
        failed_step: &'static str,
        compensating_step: &'static str,
        cart_id: &CartId,
        product_id: &ProductId,
    ) -> Self {
        Self {
            failed_step,
            compensating_step,
            cart_id: cart_id.clone(),
            product_id: product_id.clone(),
            compensated: false,
        }
    }

    pub(crate) fn succeeded(mut self) -> Self {
        self.compensated = true;
        self
    }
}

impl fmt::Display for CompensationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Compensation '{}' after '{}' (cart {}, product {})",
            self.compensating_step, self.failed_step, self.cart_id, self.product_id
        )
    }
}
