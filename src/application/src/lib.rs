//! Use cases: the function-calling chat loop, the selection wizard and the
//! dispatcher that routes inbound events to them.

pub mod chat_service;
pub mod event_dispatcher;
pub mod wizard_service;

#[cfg(test)]
pub(crate) mod testing;

pub use chat_service::ChatService;
pub use event_dispatcher::EventDispatcher;
pub use wizard_service::WizardService;
