pub mod account;
pub mod admin;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod range;
pub mod response;
pub mod router;
pub mod stream;
