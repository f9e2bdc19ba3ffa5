use mercato_core::{CustomerTier, Money};
use serde::{Deserialize, Serialize};

/// Order-level pricing input handed to every discount rule. Rules read from
/// it and never mutate it; a rule's amount depends on this context alone, so
/// the aggregate is invariant to evaluation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingContext {
    /// Sum of unit price times quantity over all lines, before any discount.
    pub subtotal: Money,
    /// Carried opaque; no built-in rule consumes it yet.
    pub coupon_code: Option<String>,
    pub tier: CustomerTier,
}

impl PricingContext {
    pub fn new(subtotal: Money, coupon_code: Option<String>, tier: CustomerTier) -> Self {
        Self {
            subtotal,
            coupon_code,
            tier,
        }
    }
}
