//! In-memory state stores shared by every worker.

pub mod conversation;
pub mod selection;

pub use conversation::InMemoryConversationStore;
pub use selection::InMemorySelectionStore;
