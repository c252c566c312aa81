//! Candidate registration and lookup.
//!
//! A `TypeRegistry` holds the ordered candidate list for one field instance.
//! The list is populated once at field-definition time and read-only
//! afterwards; registration order is preserved so clients render candidates
//! deterministically.

use std::rc::Rc;

use tracing::debug;

use crate::context::RequestContext;
use crate::contracts::{Field, Resource};
use crate::error::{FieldError, Result};
use crate::schema;

/// Caller-supplied descriptor for one registrable target type.
pub struct CandidateDef {
    resource: Rc<dyn Resource>,
    label: Option<String>,
}

impl CandidateDef {
    /// Describe a candidate using the resource's own labels.
    pub fn new(resource: Rc<dyn Resource>) -> Self {
        Self {
            resource,
            label: None,
        }
    }

    /// Describe a candidate with an overriding label (keyed-registration
    /// form: the override becomes both the singular and display label).
    pub fn labeled(resource: Rc<dyn Resource>, label: impl Into<String>) -> Self {
        Self {
            resource,
            label: Some(label.into()),
        }
    }
}

/// One registered target type with its request-scoped field schema.
pub struct TypeCandidate {
    /// Identifying key, unique within the registry (the resource's URI key).
    pub key: String,
    /// Singular label for the client.
    pub singular_label: String,
    /// Display label for the client.
    pub display: String,
    /// The resource wrapper over the candidate's underlying type.
    pub resource: Rc<dyn Resource>,
    /// The candidate's sub-field schema for the current request context.
    /// Recomputed per request; resolved sub-field state lives here between
    /// resolve and serialize.
    pub fields: Vec<Box<dyn Field>>,
}

/// Ordered set of candidates for one field instance.
#[derive(Default)]
pub struct TypeRegistry {
    candidates: Vec<TypeCandidate>,
}

impl TypeRegistry {
    /// Register candidate types, deriving each one's key and labels and
    /// eagerly resolving its field schema for the current request context.
    ///
    /// Fails with a configuration error on an empty descriptor list (the
    /// selection rule would be unsatisfiable) and with `DuplicateCandidate`
    /// if two descriptors share a key; the client would otherwise be unable
    /// to disambiguate the selection.
    pub fn register(&mut self, defs: Vec<CandidateDef>, ctx: &RequestContext) -> Result<()> {
        if defs.is_empty() {
            return Err(FieldError::configuration(
                "at least one candidate type must be registered",
            ));
        }
        for def in defs {
            let key = def.resource.uri_key().to_string();
            if self.candidates.iter().any(|c| c.key == key) {
                return Err(FieldError::DuplicateCandidate { key });
            }

            let (singular_label, display) = match def.label {
                Some(ref label) => (label.clone(), label.clone()),
                None => (def.resource.singular_label(), def.resource.label()),
            };
            let fields = schema::schema_for(def.resource.as_ref(), ctx);

            debug!(key = %key, fields = fields.len(), "registered morph-to candidate");

            self.candidates.push(TypeCandidate {
                key,
                singular_label,
                display,
                resource: def.resource,
                fields,
            });
        }
        Ok(())
    }

    /// Find a candidate by its identifying key.
    pub fn lookup(&self, key: &str) -> Option<&TypeCandidate> {
        self.candidates.iter().find(|c| c.key == key)
    }

    /// Find a candidate by its identifying key, mutably.
    pub fn lookup_mut(&mut self, key: &str) -> Option<&mut TypeCandidate> {
        self.candidates.iter_mut().find(|c| c.key == key)
    }

    /// Find the candidate whose resource wraps the given discriminator class.
    pub fn lookup_by_morph_class(&self, class: &str) -> Option<&TypeCandidate> {
        self.candidates
            .iter()
            .find(|c| c.resource.morph_class() == class)
    }

    /// All candidates, in registration order.
    pub fn all(&self) -> &[TypeCandidate] {
        &self.candidates
    }

    /// The registered candidate keys, in registration order.
    pub fn keys(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.key.clone()).collect()
    }

    /// Whether no candidates are registered.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of registered candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestKind;
    use crate::test_support::TestResource;

    fn request() -> RequestContext {
        RequestContext::new(RequestKind::Detail)
    }

    #[test]
    fn test_register_preserves_order() {
        let mut registry = TypeRegistry::default();
        let defs = vec![
            CandidateDef::new(Rc::new(TestResource::new("posts", "App\\Post"))),
            CandidateDef::new(Rc::new(TestResource::new("videos", "App\\Video"))),
            CandidateDef::new(Rc::new(TestResource::new("articles", "App\\Article"))),
        ];
        registry.register(defs, &request()).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.keys(), vec!["posts", "videos", "articles"]);
        assert_eq!(registry.all()[1].key, "videos");
    }

    #[test]
    fn test_lookup_by_key_and_class() {
        let mut registry = TypeRegistry::default();
        registry
            .register(
                vec![
                    CandidateDef::new(Rc::new(TestResource::new("posts", "App\\Post"))),
                    CandidateDef::new(Rc::new(TestResource::new("videos", "App\\Video"))),
                ],
                &request(),
            )
            .unwrap();

        assert_eq!(registry.lookup("videos").unwrap().key, "videos");
        assert!(registry.lookup("missing").is_none());
        assert_eq!(
            registry.lookup_by_morph_class("App\\Post").unwrap().key,
            "posts"
        );
        assert!(registry.lookup_by_morph_class("App\\Unknown").is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = TypeRegistry::default();
        let defs = vec![
            CandidateDef::new(Rc::new(TestResource::new("posts", "App\\Post"))),
            CandidateDef::new(Rc::new(TestResource::new("posts", "App\\LegacyPost"))),
        ];

        let err = registry.register(defs, &request()).unwrap_err();
        assert!(matches!(
            err,
            FieldError::DuplicateCandidate { ref key } if key == "posts"
        ));
    }

    #[test]
    fn test_empty_registration_rejected() {
        let mut registry = TypeRegistry::default();
        let err = registry.register(Vec::new(), &request()).unwrap_err();
        assert!(matches!(err, FieldError::Configuration { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_label_override() {
        let mut registry = TypeRegistry::default();
        registry
            .register(
                vec![CandidateDef::labeled(
                    Rc::new(TestResource::new("posts", "App\\Post")),
                    "Blog Post",
                )],
                &request(),
            )
            .unwrap();

        let candidate = registry.lookup("posts").unwrap();
        assert_eq!(candidate.singular_label, "Blog Post");
        assert_eq!(candidate.display, "Blog Post");
    }

    #[test]
    fn test_schema_eagerly_resolved_for_context() {
        let mut registry = TypeRegistry::default();
        registry
            .register(
                vec![CandidateDef::new(Rc::new(
                    TestResource::new("posts", "App\\Post").with_fields(["title", "body"]),
                ))],
                &request(),
            )
            .unwrap();

        let candidate = registry.lookup("posts").unwrap();
        assert_eq!(candidate.fields.len(), 2);
        assert_eq!(candidate.fields[0].attribute(), "title");
    }
}
