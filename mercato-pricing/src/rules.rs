use mercato_core::{CustomerTier, Money};
use tracing::debug;

use crate::context::PricingContext;

/// One independent discount capability. Rules stack: every supporting rule
/// contributes its amount to the aggregate, and no rule sees another rule's
/// outcome. New discounts are added by registering another implementation,
/// never by branching inside the engine.
pub trait DiscountRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, context: &PricingContext) -> bool;

    /// Rounded to the cent (half-up) by the rule itself; the engine sums
    /// already-rounded amounts and never re-rounds.
    fn amount(&self, context: &PricingContext) -> Money;
}

/// Registry of discount rules, evaluated as a sum over supporting rules.
pub struct DiscountEngine {
    rules: Vec<Box<dyn DiscountRule>>,
}

impl DiscountEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The stock rule set: premium tier 10%, order threshold 5%, and the
    /// zero baseline that keeps the aggregate defined for any context.
    pub fn with_default_rules() -> Self {
        let mut engine = Self::new();
        engine.register(Box::new(PremiumTierRule));
        engine.register(Box::new(OrderThresholdRule));
        engine.register(Box::new(BaselineRule));
        engine
    }

    pub fn register(&mut self, rule: Box<dyn DiscountRule>) {
        self.rules.push(rule);
    }

    /// Aggregate discount for the order, capped at the subtotal so the
    /// grand total can never go negative however many rules stack.
    pub fn compute(&self, context: &PricingContext) -> Money {
        let total: Money = self
            .rules
            .iter()
            .filter(|rule| rule.supports(context))
            .map(|rule| {
                let amount = rule.amount(context);
                debug!(rule = rule.name(), %amount, "discount rule applied");
                amount
            })
            .sum();

        total.min(context.subtotal)
    }
}

impl Default for DiscountEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

/// 10% of the subtotal for premium customers.
pub struct PremiumTierRule;

const PREMIUM_RATE_BP: u32 = 1_000;

impl DiscountRule for PremiumTierRule {
    fn name(&self) -> &'static str {
        "premium_tier"
    }

    fn supports(&self, context: &PricingContext) -> bool {
        context.tier == CustomerTier::Premium
    }

    fn amount(&self, context: &PricingContext) -> Money {
        context.subtotal.apply_rate_bp(PREMIUM_RATE_BP)
    }
}

/// 5% off any order of 500.00 or more.
pub struct OrderThresholdRule;

const THRESHOLD: Money = Money::from_major(500);
const THRESHOLD_RATE_BP: u32 = 500;

impl DiscountRule for OrderThresholdRule {
    fn name(&self) -> &'static str {
        "order_threshold"
    }

    fn supports(&self, context: &PricingContext) -> bool {
        context.subtotal >= THRESHOLD
    }

    fn amount(&self, context: &PricingContext) -> Money {
        context.subtotal.apply_rate_bp(THRESHOLD_RATE_BP)
    }
}

/// Always supports, contributes nothing. Keeps the aggregate well defined
/// even if every other rule is filtered out.
pub struct BaselineRule;

impl DiscountRule for BaselineRule {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn supports(&self, _context: &PricingContext) -> bool {
        true
    }

    fn amount(&self, _context: &PricingContext) -> Money {
        Money::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(subtotal_minor: i64, tier: CustomerTier) -> PricingContext {
        PricingContext::new(Money::from_minor(subtotal_minor), None, tier)
    }

    #[test]
    fn premium_above_threshold_stacks_both_rules() {
        let engine = DiscountEngine::with_default_rules();
        // 600.00 premium: 10% + 5% = 90.00
        let discount = engine.compute(&context(60_000, CustomerTier::Premium));
        assert_eq!(discount, Money::from_major(90));
    }

    #[test]
    fn premium_below_threshold_gets_tier_rule_only() {
        let engine = DiscountEngine::with_default_rules();
        // 300.00 premium: 10% only = 30.00
        let discount = engine.compute(&context(30_000, CustomerTier::Premium));
        assert_eq!(discount, Money::from_major(30));
    }

    #[test]
    fn standard_above_threshold_gets_threshold_rule_only() {
        let engine = DiscountEngine::with_default_rules();
        // 600.00 standard: 5% only = 30.00
        let discount = engine.compute(&context(60_000, CustomerTier::Standard));
        assert_eq!(discount, Money::from_major(30));
    }

    #[test]
    fn standard_below_threshold_gets_nothing() {
        let engine = DiscountEngine::with_default_rules();
        let discount = engine.compute(&context(20_000, CustomerTier::Standard));
        assert_eq!(discount, Money::ZERO);
    }

    #[test]
    fn threshold_is_inclusive() {
        let engine = DiscountEngine::with_default_rules();
        // Exactly 500.00 qualifies.
        let discount = engine.compute(&context(50_000, CustomerTier::Standard));
        assert_eq!(discount, Money::from_major(25));
        // One cent short does not.
        let discount = engine.compute(&context(49_999, CustomerTier::Standard));
        assert_eq!(discount, Money::ZERO);
    }

    #[test]
    fn each_rule_rounds_its_own_amount() {
        let engine = DiscountEngine::with_default_rules();
        // 533.33 premium: 10% of 533.33 = 53.333 -> 53.33
        //                  5% of 533.33 = 26.6665 -> 26.67
        let discount = engine.compute(&context(53_333, CustomerTier::Premium));
        assert_eq!(discount, Money::from_minor(5_333 + 2_667));
    }

    #[test]
    fn registered_rules_extend_the_engine_without_changes() {
        struct EmployeeRule;
        impl DiscountRule for EmployeeRule {
            fn name(&self) -> &'static str {
                "employee"
            }
            fn supports(&self, context: &PricingContext) -> bool {
                context.tier == CustomerTier::Employee
            }
            fn amount(&self, context: &PricingContext) -> Money {
                context.subtotal.apply_rate_bp(2_000)
            }
        }

        let mut engine = DiscountEngine::with_default_rules();
        engine.register(Box::new(EmployeeRule));

        let discount = engine.compute(&context(10_000, CustomerTier::Employee));
        assert_eq!(discount, Money::from_major(20));
    }

    #[test]
    fn aggregate_never_exceeds_subtotal() {
        struct OverEagerRule;
        impl DiscountRule for OverEagerRule {
            fn name(&self) -> &'static str {
                "over_eager"
            }
            fn supports(&self, _context: &PricingContext) -> bool {
                true
            }
            fn amount(&self, context: &PricingContext) -> Money {
                context.subtotal.apply_rate_bp(12_000)
            }
        }

        let mut engine = DiscountEngine::new();
        engine.register(Box::new(OverEagerRule));

        let ctx = context(10_000, CustomerTier::Standard);
        assert_eq!(engine.compute(&ctx), ctx.subtotal);
    }
}
