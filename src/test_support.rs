//! In-memory fakes for exercising the field lifecycle without a real host
//! framework: a map-backed entity, a configurable resource wrapper, a text
//! sub-field, and a host entity with a recordable polymorphic relation.
//!
//! Available to integration tests and downstream crates through the
//! `test-support` feature.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::context::RequestContext;
use crate::contracts::{AfterSave, Field, HostEntity, RelatedEntity, RelationKind, Resource};
use crate::error::{FieldError, Result};

/// Shared event log for asserting call ordering across fakes.
pub type EventLog = Rc<RefCell<Vec<String>>>;

/// Create an empty event log.
pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Snapshot an event log as a plain vector.
pub fn events(log: &EventLog) -> Vec<String> {
    log.borrow().clone()
}

/// A map-backed related entity.
pub struct TestEntity {
    pub key: Option<Value>,
    pub morph_class: String,
    pub attributes: Map<String, Value>,
    pub exists: bool,
    pub saves: u32,
    next_key: Value,
    fail_save: bool,
}

impl TestEntity {
    /// Create a blank, unsaved entity of the given discriminator class.
    pub fn new(morph_class: impl Into<String>) -> Self {
        Self {
            key: None,
            morph_class: morph_class.into(),
            attributes: Map::new(),
            exists: false,
            saves: 0,
            next_key: json!(1),
            fail_save: false,
        }
    }

    /// Mark the entity as persisted under the given key.
    pub fn with_key(mut self, key: Value) -> Self {
        self.key = Some(key);
        self.exists = true;
        self
    }

    /// Set an attribute value.
    pub fn with_attribute(mut self, attribute: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(attribute.into(), value);
        self
    }

    /// Key assigned when the entity is first saved.
    pub fn with_next_key(mut self, key: Value) -> Self {
        self.next_key = key;
        self
    }

    /// Make every save attempt fail.
    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }
}

impl RelatedEntity for TestEntity {
    fn key(&self) -> Option<Value> {
        self.key.clone()
    }

    fn morph_class(&self) -> &str {
        &self.morph_class
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn title(&self) -> String {
        match self.attributes.get("title").and_then(Value::as_str) {
            Some(title) => title.to_string(),
            None => self
                .key
                .as_ref()
                .map(|k| k.to_string())
                .unwrap_or_else(|| "Untitled".to_string()),
        }
    }

    fn get(&self, attribute: &str) -> Option<Value> {
        self.attributes.get(attribute).cloned()
    }

    fn set(&mut self, attribute: &str, value: Value) {
        self.attributes.insert(attribute.to_string(), value);
    }

    fn save(&mut self) -> Result<()> {
        if self.fail_save {
            return Err(FieldError::persistence(
                self.morph_class.clone(),
                "save failed",
            ));
        }
        self.saves += 1;
        if !self.exists {
            self.key = Some(self.next_key.clone());
            self.exists = true;
        }
        Ok(())
    }
}

/// A host entity with a recordable polymorphic relation per attribute.
#[derive(Default)]
pub struct TestHost {
    related: HashMap<String, TestEntity>,
    morph_types: HashMap<String, String>,
    /// Every `associate` call, in order: (attribute, key, morph class).
    pub associations: Vec<(String, Value, String)>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a related entity under the given relation attribute. The
    /// declared discriminator follows the entity's class.
    pub fn with_related(mut self, attribute: impl Into<String>, entity: TestEntity) -> Self {
        let attribute = attribute.into();
        self.morph_types
            .insert(attribute.clone(), entity.morph_class.clone());
        self.related.insert(attribute, entity);
        self
    }

    /// Declare a discriminator without linking a related row.
    pub fn with_morph_type(
        mut self,
        attribute: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        self.morph_types.insert(attribute.into(), class.into());
        self
    }

    /// The linked entity for an attribute, if any.
    pub fn related(&self, attribute: &str) -> Option<&TestEntity> {
        self.related.get(attribute)
    }
}

impl HostEntity for TestHost {
    fn related_unscoped(&self, attribute: &str) -> Option<&dyn RelatedEntity> {
        self.related
            .get(attribute)
            .map(|e| e as &dyn RelatedEntity)
    }

    fn related_mut(&mut self, attribute: &str) -> Option<&mut dyn RelatedEntity> {
        self.related
            .get_mut(attribute)
            .map(|e| e as &mut dyn RelatedEntity)
    }

    fn morph_type(&self, attribute: &str) -> Option<String> {
        self.morph_types.get(attribute).cloned()
    }

    fn associate(&mut self, attribute: &str, key: Value, morph_class: &str) {
        self.morph_types
            .insert(attribute.to_string(), morph_class.to_string());
        self.associations
            .push((attribute.to_string(), key, morph_class.to_string()));
    }
}

/// A text sub-field that reads and writes one attribute.
pub struct TextField {
    attribute: String,
    source: &'static str,
    relation: RelationKind,
    rules: Vec<String>,
    value: Option<Value>,
    display_resolved: bool,
    meta: Map<String, Value>,
    log: Option<EventLog>,
}

impl TextField {
    /// Create a field for an attribute, tagged with the accessor that
    /// produced it ("creation", "update", "detail", "index", "available").
    pub fn new(attribute: impl Into<String>, source: &'static str) -> Self {
        Self {
            attribute: attribute.into(),
            source,
            relation: RelationKind::None,
            rules: Vec::new(),
            value: None,
            display_resolved: false,
            meta: Map::new(),
            log: None,
        }
    }

    pub fn with_relation(mut self, relation: RelationKind) -> Self {
        self.relation = relation;
        self
    }

    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    fn record(&self, event: String) {
        if let Some(ref log) = self.log {
            log.borrow_mut().push(event);
        }
    }
}

impl Field for TextField {
    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn relation_kind(&self) -> RelationKind {
        self.relation
    }

    fn resolve(&mut self, entity: &dyn RelatedEntity) {
        self.record(format!("resolve:{}", self.attribute));
        self.value = entity.get(&self.attribute);
    }

    fn resolve_for_display(&mut self, entity: &dyn RelatedEntity) {
        self.record(format!("display:{}", self.attribute));
        self.value = entity.get(&self.attribute);
        self.display_resolved = true;
    }

    fn fill(
        &mut self,
        ctx: &RequestContext,
        entity: &mut dyn RelatedEntity,
    ) -> Result<Option<AfterSave>> {
        self.record(format!("fill:{}", self.attribute));
        if let Some(value) = ctx.input(&self.attribute) {
            entity.set(&self.attribute, value.clone());
        }

        match self.log {
            Some(ref log) => {
                let log = Rc::clone(log);
                let attribute = self.attribute.clone();
                Ok(Some(Box::new(move || {
                    log.borrow_mut().push(format!("after:{attribute}"));
                    Ok(())
                })))
            }
            None => Ok(None),
        }
    }

    fn rules(&self, _ctx: &RequestContext) -> IndexMap<String, Vec<String>> {
        if self.rules.is_empty() {
            return IndexMap::new();
        }
        IndexMap::from_iter([(self.attribute.clone(), self.rules.clone())])
    }

    fn set_meta(&mut self, key: &str, value: Value) {
        self.meta.insert(key.to_string(), value);
    }

    fn serialize(&self, ctx: &RequestContext) -> Value {
        json!({
            "attribute": self.attribute,
            "value": self.value,
            "source": self.source,
            "displayResolved": self.display_resolved,
            "meta": self.meta,
            "resource": ctx.resource_param(),
        })
    }
}

/// A configurable resource wrapper over [`TestEntity`].
pub struct TestResource {
    uri_key: String,
    morph_class: String,
    singular: String,
    plural: String,
    fields: Vec<(String, RelationKind)>,
    rules: HashMap<String, Vec<String>>,
    deny_view: bool,
    fail_creation: bool,
    fail_update: bool,
    next_key: Value,
    log: Option<EventLog>,
}

impl TestResource {
    pub fn new(uri_key: impl Into<String>, morph_class: impl Into<String>) -> Self {
        let uri_key = uri_key.into();
        let singular = capitalize(uri_key.trim_end_matches('s'));
        let plural = capitalize(&uri_key);
        Self {
            uri_key,
            morph_class: morph_class.into(),
            singular,
            plural,
            fields: Vec::new(),
            rules: HashMap::new(),
            deny_view: false,
            fail_creation: false,
            fail_update: false,
            next_key: json!(1),
            log: None,
        }
    }

    /// Declare plain sub-fields by attribute name.
    pub fn with_fields<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.fields
            .extend(names.into_iter().map(|n| (n.to_string(), RelationKind::None)));
        self
    }

    /// Declare a relation-bearing sub-field.
    pub fn with_relation_field(mut self, name: impl Into<String>, kind: RelationKind) -> Self {
        self.fields.push((name.into(), kind));
        self
    }

    /// Attach validation rules to one of the declared sub-fields.
    pub fn with_rules<'a>(
        mut self,
        attribute: impl Into<String>,
        rules: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.rules.insert(
            attribute.into(),
            rules.into_iter().map(str::to_string).collect(),
        );
        self
    }

    pub fn with_labels(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.singular = singular.into();
        self.plural = plural.into();
        self
    }

    /// Key assigned to entities created by this resource on first save.
    pub fn with_next_key(mut self, key: Value) -> Self {
        self.next_key = key;
        self
    }

    /// Refuse view authorization for every entity.
    pub fn deny_view(mut self) -> Self {
        self.deny_view = true;
        self
    }

    /// Make creation validation fail.
    pub fn failing_creation(mut self) -> Self {
        self.fail_creation = true;
        self
    }

    /// Make update validation fail.
    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    fn record(&self, event: String) {
        if let Some(ref log) = self.log {
            log.borrow_mut().push(event);
        }
    }

    fn make_fields(&self, source: &'static str) -> Vec<Box<dyn Field>> {
        self.fields
            .iter()
            .map(|(name, kind)| {
                let mut field = TextField::new(name.clone(), source).with_relation(*kind);
                if let Some(rules) = self.rules.get(name) {
                    field = field.with_rules(rules.iter().map(String::as_str));
                }
                if let Some(ref log) = self.log {
                    field = field.with_log(Rc::clone(log));
                }
                Box::new(field) as Box<dyn Field>
            })
            .collect()
    }
}

impl Resource for TestResource {
    fn uri_key(&self) -> &str {
        &self.uri_key
    }

    fn singular_label(&self) -> String {
        self.singular.clone()
    }

    fn label(&self) -> String {
        self.plural.clone()
    }

    fn morph_class(&self) -> &str {
        &self.morph_class
    }

    fn authorized_to_view(&self, _ctx: &RequestContext, _entity: &dyn RelatedEntity) -> bool {
        !self.deny_view
    }

    fn validate_for_creation(&self, _ctx: &RequestContext) -> Result<()> {
        self.record(format!("validate_for_creation:{}", self.uri_key));
        if self.fail_creation {
            return Err(FieldError::validation(
                self.uri_key.clone(),
                "creation rejected",
            ));
        }
        Ok(())
    }

    fn validate_for_update(&self, _ctx: &RequestContext) -> Result<()> {
        self.record(format!("validate_for_update:{}", self.uri_key));
        if self.fail_update {
            return Err(FieldError::validation(
                self.uri_key.clone(),
                "update rejected",
            ));
        }
        Ok(())
    }

    fn new_entity(&self) -> Box<dyn RelatedEntity> {
        Box::new(TestEntity::new(self.morph_class.clone()).with_next_key(self.next_key.clone()))
    }

    fn creation_fields(&self, _ctx: &RequestContext) -> Vec<Box<dyn Field>> {
        self.make_fields("creation")
    }

    fn update_fields(&self, _ctx: &RequestContext) -> Vec<Box<dyn Field>> {
        self.make_fields("update")
    }

    fn detail_fields(&self, _ctx: &RequestContext) -> Vec<Box<dyn Field>> {
        self.make_fields("detail")
    }

    fn index_fields(&self, _ctx: &RequestContext) -> Vec<Box<dyn Field>> {
        self.make_fields("index")
    }

    fn available_fields(&self, _ctx: &RequestContext) -> Vec<Box<dyn Field>> {
        self.make_fields("available")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
