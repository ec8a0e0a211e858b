pub mod conversation;
pub mod event;
pub mod selection;

pub use conversation::{ConversationTurn, Role};
pub use event::InboundEvent;
pub use selection::{SelectionState, WizardCommand, WizardStep};
