//! Persistence for the help desk.
//!
//! The store traits describe what the domain and the desk need; [`MemoryStore`]
//! implements them in memory and [`Directory`] persists a memory store to a
//! data directory.

pub mod directory;
mod document;
mod memory;
mod store;

pub use directory::Directory;
pub use document::{
    CommentDocument, DataDocument, EventDocument, NotificationDocument, ServiceDocument,
    TicketDocument, UserDocument,
};
pub use memory::{MemoryStore, Snapshot};
pub use store::{
    NotificationStore, Page, Paged, Sequence, SequenceGenerator, ServiceStore, Store, StoreError,
    TicketFilter, TicketMetrics, TicketStore, UserFilter, UserStore,
};
