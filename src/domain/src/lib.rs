//! Core types and seams for the operations assistant.

pub mod entities;
pub mod models;
pub mod services;

pub use entities::{
    ConversationTurn, InboundEvent, Role, SelectionState, WizardCommand, WizardStep,
};
pub use services::{
    Capability, CapabilitySource, ChatTransport, CommandOutput, CommandRunner, ConversationStore,
    OutgoingMessage, ReasoningEngine, SelectionStore, SelectionUpdate,
};
