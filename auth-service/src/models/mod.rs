pub mod entitlement;
pub mod identity;

pub use entitlement::{AdminFeatureGrant, AdminProfile, Feature, PlanFeature, SubscriptionPlan};
pub use identity::{Identity, ResolvedIdentity, Role};
