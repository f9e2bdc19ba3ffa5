pub mod context;
pub mod rules;

pub use context::PricingContext;
pub use rules::{
    BaselineRule, DiscountEngine, DiscountRule, OrderThresholdRule, PremiumTierRule,
};
