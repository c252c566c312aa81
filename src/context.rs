//! Request context: classification of the inbound request, payload access,
//! and the scoped resource-parameter remap used during serialization.
//!
//! One `RequestContext` exists per inbound request and is never shared
//! across requests. The only mutable piece is the route resource parameter,
//! which sub-field serialization temporarily remaps via [`ScopedResource`].

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the current request reached the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    /// Creation or attach form
    Create,
    /// Update form
    Update,
    /// Detail view
    Detail,
    /// Index / listing view
    Index,
    /// Action invocation
    Action,
    /// Anything else (lenses, previews, ...)
    Other,
}

/// Per-request state shared by every field lifecycle operation.
#[derive(Debug)]
pub struct RequestContext {
    kind: RequestKind,
    payload: Map<String, Value>,
    resource_param: RefCell<Option<String>>,
}

impl RequestContext {
    /// Create a context for the given request kind with an empty payload.
    pub fn new(kind: RequestKind) -> Self {
        Self {
            kind,
            payload: Map::new(),
            resource_param: RefCell::new(None),
        }
    }

    /// Add a submitted value to the payload.
    pub fn with_input(mut self, attribute: impl Into<String>, value: Value) -> Self {
        self.payload.insert(attribute.into(), value);
        self
    }

    /// Set the route resource parameter (the resource the request targets).
    pub fn with_resource(self, key: impl Into<String>) -> Self {
        *self.resource_param.borrow_mut() = Some(key.into());
        self
    }

    /// The request classification.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// A submitted value by attribute name.
    pub fn input(&self, attribute: &str) -> Option<&Value> {
        self.payload.get(attribute)
    }

    /// A submitted value as a string slice, if it is one.
    pub fn str_input(&self, attribute: &str) -> Option<&str> {
        self.input(attribute).and_then(Value::as_str)
    }

    /// Whether this is a creation or attach request.
    pub fn is_create_or_attach(&self) -> bool {
        self.kind == RequestKind::Create
    }

    /// Whether this is an index request.
    pub fn is_index(&self) -> bool {
        self.kind == RequestKind::Index
    }

    /// Whether this is an action request.
    pub fn is_action(&self) -> bool {
        self.kind == RequestKind::Action
    }

    /// The current route resource parameter.
    pub fn resource_param(&self) -> Option<String> {
        self.resource_param.borrow().clone()
    }

    /// Remap the route resource parameter until the returned guard drops.
    ///
    /// The previous value is restored unconditionally on drop, including
    /// during unwinding, so a failed sub-field serialization can never leak
    /// a remapped parameter into the rest of the request.
    pub fn scope_resource(&self, key: &str) -> ScopedResource<'_> {
        let previous = self.resource_param.replace(Some(key.to_string()));
        ScopedResource {
            ctx: self,
            previous,
        }
    }
}

/// Guard holding a temporary resource-parameter remap. See
/// [`RequestContext::scope_resource`].
pub struct ScopedResource<'a> {
    ctx: &'a RequestContext,
    previous: Option<String>,
}

impl Drop for ScopedResource<'_> {
    fn drop(&mut self) {
        *self.ctx.resource_param.borrow_mut() = self.previous.take();
    }
}
