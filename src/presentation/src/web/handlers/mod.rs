//! Request handlers for the Axum server

pub mod events;
pub mod health;
pub mod interactions;
pub mod slash;

pub use events::*;
pub use health::*;
pub use interactions::*;
pub use slash::*;
