pub mod ads;
pub mod entitlement;
