//! Help desk ticketing
//!
//! Requesters report incidents or ask for service changes, operators triage
//! and assign them, technicians derive and resolve them, and supervisors are
//! notified of everything the staff they supervise does.
//!
//! - [`domain`] holds the entities and their lifecycle rules.
//! - [`storage`] describes persistence as traits and implements them in
//!   memory and on disk.
//! - [`desk`] is the service layer tying the two together.

pub mod domain;
pub use domain::{Config, Event, Notification, Ticket, User};

pub mod storage;
pub use storage::{Directory, MemoryStore};

pub mod desk;
pub use desk::HelpDesk;
