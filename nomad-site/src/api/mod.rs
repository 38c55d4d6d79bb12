//! HTTP API for the content site

pub mod handlers;
pub mod server;

pub use server::{api_router, create_router, AppContext};
