//! Polymorphic single-association field engine
//!
//! A morph-to field is a named slot on a host entity that references at most
//! one related entity whose concrete type is chosen at runtime from a
//! registered set of candidate types. Each candidate carries its own field
//! schema; this crate orchestrates resolve, validate, fill and serialize
//! across whichever schema is active.
//!
//! # Architecture
//!
//! - **Orchestration-only**: entity persistence, authorization and the
//!   concrete sub-field implementations belong to the host framework,
//!   reached through the traits in [`contracts`]
//! - **Explicit dispatch**: candidates are a tagged set selected by key
//!   lookup in a [`TypeRegistry`]; nothing reflects on live types
//! - **Request-scoped**: candidate schemas and resolved values are
//!   recomputed per request and never cached across requests
//! - **Scoped remaps**: serialization remaps the route resource parameter
//!   per candidate with guaranteed restoration, so sub-fields render as if
//!   they belonged directly to their own resource
//!
//! # Basic Usage
//!
//! ```rust,ignore
//! use morphfield::{CandidateDef, MorphTo, RequestContext, RequestKind};
//!
//! let ctx = RequestContext::new(RequestKind::Detail);
//! let mut field = MorphTo::new("Commentable", "commentable")
//!     .types(vec![
//!         CandidateDef::new(posts_resource),
//!         CandidateDef::new(videos_resource),
//!     ], &ctx)?
//!     .display_for("posts", |post| post.title());
//!
//! field.resolve(&host, &ctx);
//! let payload = field.serialize(&ctx);
//! ```

pub mod context;
pub mod contracts;
mod error;
pub mod field;
pub mod registry;
pub mod schema;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use context::{RequestContext, RequestKind, ScopedResource};
pub use contracts::{AfterSave, Field, HostEntity, RelatedEntity, RelationKind, Resource};
pub use error::{FieldError, Result};
pub use field::{DefaultCandidate, DisplayFn, MorphTo, ResolvedValue};
pub use registry::{CandidateDef, TypeCandidate, TypeRegistry};
