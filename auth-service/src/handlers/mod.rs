pub mod auth;
pub mod entitlements;
