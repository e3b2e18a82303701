//! TechNanas Core Library
//!
//! Shared types for the TechNanas directory: entity models, the remote
//! document store contract with its Firestore and in-memory adapters, the
//! identity context consumed by the sync layer, and input validation.

pub mod identity;
pub mod models;
pub mod remote;
pub mod validation;

pub use identity::{IdentityContext, StaticIdentity};
pub use models::{
    Account, Announcement, AnnouncementType, Farm, Faq, FaqCategory, Role, SubRole,
};
pub use remote::{
    Direction, Document, FieldValue, Fields, FirestoreClient, FirestoreConfig, MemoryRemoteStore,
    Query, RemoteCall, RemoteError, RemoteOp, RemoteStore,
};
pub use validation::{validate_registration, ValidationError};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
