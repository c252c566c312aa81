//! Collaborator interfaces at the host-framework boundary.
//!
//! The host framework owns entity persistence, authorization and the
//! concrete sub-field implementations; this crate only orchestrates them.
//! Everything is passed explicitly — there is no process-wide resource
//! registry, and callbacks receive their target entity as an argument
//! rather than capturing an implicit receiver.

use indexmap::IndexMap;
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::Result;

/// Deferred post-save work returned by a fill operation. Invoked by the host
/// framework after the parent entity itself has been persisted.
pub type AfterSave = Box<dyn FnOnce() -> Result<()>>;

/// How a sub-field relates to other entities. Relation-bearing sub-fields
/// get via-candidate routing metadata stamped during resolve so the client
/// can navigate through the polymorphic parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Plain attribute, no relation
    None,
    /// One related row on the far side
    HasOne,
    /// Many related rows on the far side
    HasMany,
    /// Many related rows through a pivot
    BelongsToMany,
}

impl RelationKind {
    /// Whether navigation to this relation must be routed via the parent.
    pub fn routes_via_parent(self) -> bool {
        !matches!(self, RelationKind::None)
    }
}

/// A related entity owned by the host persistence framework.
pub trait RelatedEntity {
    /// Primary key, if the entity has been persisted.
    fn key(&self) -> Option<Value>;

    /// The stored discriminator identifying this entity's type.
    fn morph_class(&self) -> &str;

    /// Whether the entity exists in storage (as opposed to a fresh blank).
    fn exists(&self) -> bool;

    /// Generic human-readable title, used when no display formatter is set.
    fn title(&self) -> String;

    /// Read an attribute by name.
    fn get(&self, attribute: &str) -> Option<Value>;

    /// Write an attribute by name.
    fn set(&mut self, attribute: &str, value: Value);

    /// Persist the entity. Failures surface as `FieldError::Persistence`.
    fn save(&mut self) -> Result<()>;
}

/// The host entity carrying the polymorphic relation.
pub trait HostEntity {
    /// Fetch the related entity for the given attribute, bypassing any
    /// default visibility scoping so soft-deleted rows are still visible.
    fn related_unscoped(&self, attribute: &str) -> Option<&dyn RelatedEntity>;

    /// Mutable access to the related entity, if one is linked.
    fn related_mut(&mut self, attribute: &str) -> Option<&mut dyn RelatedEntity>;

    /// The declared discriminator for the relation, independent of whether
    /// a related row is currently loaded.
    fn morph_type(&self, attribute: &str) -> Option<String>;

    /// Point the relation at the given entity key and discriminator.
    fn associate(&mut self, attribute: &str, key: Value, morph_class: &str);
}

/// Resource wrapper around one candidate's underlying entity type.
///
/// The five field accessors return the context-filtered subset of the
/// resource's sub-fields; authorization state is evaluated inside them by
/// the host framework.
pub trait Resource {
    /// Identifying key, unique within a field's candidate list.
    fn uri_key(&self) -> &str;

    /// Singular label for the client.
    fn singular_label(&self) -> String;

    /// Display (plural) label for the client.
    fn label(&self) -> String;

    /// Discriminator class of the wrapped entity type.
    fn morph_class(&self) -> &str;

    /// Human-readable title for a concrete entity of this type.
    fn title(&self, entity: &dyn RelatedEntity) -> String {
        entity.title()
    }

    /// Whether the current caller may view the given entity.
    fn authorized_to_view(&self, ctx: &RequestContext, entity: &dyn RelatedEntity) -> bool;

    /// Structural validation before a new entity of this type is filled.
    fn validate_for_creation(&self, ctx: &RequestContext) -> Result<()>;

    /// Structural validation before an existing entity of this type is filled.
    fn validate_for_update(&self, ctx: &RequestContext) -> Result<()>;

    /// A blank, unsaved entity of this type.
    fn new_entity(&self) -> Box<dyn RelatedEntity>;

    /// Sub-fields shown on the creation form.
    fn creation_fields(&self, ctx: &RequestContext) -> Vec<Box<dyn Field>>;

    /// Sub-fields shown on the update form.
    fn update_fields(&self, ctx: &RequestContext) -> Vec<Box<dyn Field>>;

    /// Sub-fields shown on the detail view.
    fn detail_fields(&self, ctx: &RequestContext) -> Vec<Box<dyn Field>>;

    /// Sub-fields shown on the index view.
    fn index_fields(&self, ctx: &RequestContext) -> Vec<Box<dyn Field>>;

    /// All sub-fields, not filtered by context.
    fn available_fields(&self, ctx: &RequestContext) -> Vec<Box<dyn Field>>;
}

/// Contract every concrete sub-field implements.
///
/// The morph-to field delegates to these uniformly; it never inspects what
/// kind of field it is holding beyond [`Field::relation_kind`].
pub trait Field {
    /// The attribute this field reads and writes on its entity.
    fn attribute(&self) -> &str;

    /// How this field relates to other entities.
    fn relation_kind(&self) -> RelationKind {
        RelationKind::None
    }

    /// Resolve the field's value from the entity for a list/summary view.
    fn resolve(&mut self, entity: &dyn RelatedEntity);

    /// Resolve for a detail view, forcing resolution even if normally lazy.
    fn resolve_for_display(&mut self, entity: &dyn RelatedEntity) {
        self.resolve(entity);
    }

    /// Write the submitted value onto the entity. May return deferred work
    /// that needs the saved parent (e.g. attaching pivot rows).
    fn fill(
        &mut self,
        ctx: &RequestContext,
        entity: &mut dyn RelatedEntity,
    ) -> Result<Option<AfterSave>>;

    /// Validation rules keyed by field path.
    fn rules(&self, ctx: &RequestContext) -> IndexMap<String, Vec<String>>;

    /// Attach client-facing metadata under the given key.
    fn set_meta(&mut self, key: &str, value: Value);

    /// Wire representation for the client.
    fn serialize(&self, ctx: &RequestContext) -> Value;
}
