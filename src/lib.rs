pub mod access;
pub mod catalog;
pub mod control;
pub mod core;
pub mod delivery;
pub mod observability;
pub mod storage;
