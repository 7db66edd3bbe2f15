//! # CKAN Sync Protocol
//!
//! Protocol types for mirroring local entities into a CKAN-style catalog.
//!
//! This crate provides:
//! - `EntityKind`, `ResourceType` and the `EntityKindRegistry`
//! - `LocalEntity` and its visibility state
//! - `LifecycleEvent` descriptors
//! - `RemoteOperation` and the named catalog `Action`s
//! - The response envelope and `validate()`
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entity;
mod error;
mod event;
mod kind;
mod operation;
mod response;

pub use entity::{EntityId, LocalEntity, PostStatus, VisibilityState};
pub use error::{ProtocolError, ProtocolResult};
pub use event::{EventOrigin, LifecycleEvent, LifecycleKind};
pub use kind::{EntityKind, EntityKindRegistry, ResourceType};
pub use operation::{Action, OperationKind, RemoteOperation, ResourceAction};
pub use response::{
    validate, ApiError, ApiResponse, RawResponse, SEND_FAILURE_MESSAGE, UNKNOWN_ERROR_MESSAGE,
};
