//! Connect service
//!
//! OAuth connect flow for the ATOM Analytics integrations (Google Drive,
//! Salesforce, HubSpot), the Drive file relay to the automation webhook and
//! the user sync endpoint used after sign-up.

pub mod config;
pub mod cookies;
pub mod drive;
pub mod error;
pub mod oauth;
pub mod providers;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod state_token;
pub mod token_store;
pub mod validation;
pub mod webhook;

pub use routes::create_router;
pub use state::AppState;
