//! The morph-to field: a named slot on a host entity resolving to at most
//! one related entity of a runtime-selected candidate type.

mod fill;
mod resolve;
mod rules;
mod serialize;

pub use resolve::ResolvedValue;

use std::collections::HashMap;
use std::rc::Rc;

use crate::context::RequestContext;
use crate::contracts::RelatedEntity;
use crate::error::Result;
use crate::registry::{CandidateDef, TypeRegistry};

/// Formatter producing the display string for a resolved related entity.
/// Receives the target entity as an explicit argument.
pub type DisplayFn = Rc<dyn Fn(&dyn RelatedEntity) -> String>;

/// Display configuration: one formatter for every candidate, or one per
/// candidate key. A per-key map with no entry for the active key means "no
/// custom formatter" and falls back to the resource title.
pub(crate) enum DisplayFormat {
    None,
    Single(DisplayFn),
    PerType(HashMap<String, DisplayFn>),
}

impl DisplayFormat {
    /// The formatter applying to the given candidate key, if configured.
    pub(crate) fn for_key(&self, key: &str) -> Option<&DisplayFn> {
        match self {
            DisplayFormat::None => None,
            DisplayFormat::Single(f) => Some(f),
            DisplayFormat::PerType(map) => map.get(key),
        }
    }
}

/// How the default candidate is chosen when the field has no current value.
pub enum DefaultCandidate {
    /// A literal candidate key.
    Key(String),
    /// Selector invoked with the request context.
    Select(Rc<dyn Fn(&RequestContext) -> Option<String>>),
}

/// A polymorphic single-association field.
///
/// Candidates are registered once at definition time via [`MorphTo::types`]
/// and are immutable afterwards. Resolved state is transient per request
/// and recomputed on every resolve call.
pub struct MorphTo {
    name: String,
    attribute: String,
    registry: TypeRegistry,
    display: DisplayFormat,
    viewable: bool,
    default_candidate: Option<DefaultCandidate>,
    resolved: Option<ResolvedValue>,
}

impl MorphTo {
    /// Create a field with a display name and the relation attribute it
    /// follows on the host entity.
    pub fn new(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: attribute.into(),
            registry: TypeRegistry::default(),
            display: DisplayFormat::None,
            viewable: true,
            default_candidate: None,
            resolved: None,
        }
    }

    /// Register the candidate types this field may resolve to.
    ///
    /// Candidate schemas are eagerly resolved for the current request
    /// context. Fails with a configuration-class error when the list is
    /// empty or contains duplicate keys.
    pub fn types(mut self, defs: Vec<CandidateDef>, ctx: &RequestContext) -> Result<Self> {
        self.registry.register(defs, ctx)?;
        Ok(self)
    }

    /// Whether the related entity may be navigated to at all.
    pub fn viewable(mut self, viewable: bool) -> Self {
        self.viewable = viewable;
        self
    }

    /// Use one formatter for every candidate's display value.
    pub fn display_using(
        mut self,
        f: impl Fn(&dyn RelatedEntity) -> String + 'static,
    ) -> Self {
        self.display = DisplayFormat::Single(Rc::new(f));
        self
    }

    /// Use a formatter for one specific candidate. Candidates without an
    /// entry fall back to their resource title. Replaces any single
    /// formatter set via [`MorphTo::display_using`].
    pub fn display_for(
        mut self,
        key: impl Into<String>,
        f: impl Fn(&dyn RelatedEntity) -> String + 'static,
    ) -> Self {
        let mut map = match self.display {
            DisplayFormat::PerType(map) => map,
            _ => HashMap::new(),
        };
        map.insert(key.into(), Rc::new(f) as DisplayFn);
        self.display = DisplayFormat::PerType(map);
        self
    }

    /// Set the default candidate selection for creation-style requests.
    pub fn default_candidate(mut self, default: DefaultCandidate) -> Self {
        self.default_candidate = Some(default);
        self
    }

    /// The field's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The relation attribute on the host entity.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The registered candidates.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The value resolved by the last resolve call, if any.
    pub fn resolved(&self) -> Option<&ResolvedValue> {
        self.resolved.as_ref()
    }
}
