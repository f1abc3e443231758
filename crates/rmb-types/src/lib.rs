//! Foundation types for the RMB object storage engine.
//!
//! Every other RMB crate depends on `rmb-types`. Nothing in here performs
//! I/O; these are the values that cross the boundary between the engine and
//! the remote object store.
//!
//! # Key Types
//!
//! - [`ObjectLocator`] -- object identifier qualified by a namespace
//! - [`Metadata`] -- a single attribute (string key, byte-string value)
//! - [`MetadataSet`] -- the attribute set attached to an object, keys unique
//! - [`WritePlan`] -- the bounded-size byte ranges a payload is written in

pub mod error;
pub mod locator;
pub mod metadata;
pub mod plan;

pub use error::{TypeError, TypeResult};
pub use locator::ObjectLocator;
pub use metadata::{Metadata, MetadataSet};
pub use plan::{WritePlan, WriteRange};
