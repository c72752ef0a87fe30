/// Model pricing table and lookup.
pub mod pricing;

pub use pricing::{ModelPricing, PricingTable};
