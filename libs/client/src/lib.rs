//! Client-side state for the ATOM Analytics web app
//!
//! Everything the browser keeps between page loads lives here as plain
//! state containers with explicit update methods: the signed-in user, the
//! integration connections, the chat conversation. [`persistence`] moves
//! them in and out of JSON storage under stable keys.

pub mod callback;
pub mod chat;
pub mod connect;
pub mod error;
pub mod integrations;
pub mod persistence;
pub mod session;
pub mod signup;

pub use callback::{CallbackOutcome, ConnectStatus};
pub use error::ClientError;
pub use integrations::IntegrationStore;
pub use session::{User, UserStore};
