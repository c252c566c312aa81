//! Read path: resolve the field's current value and the active candidate's
//! sub-field state.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use super::MorphTo;
use crate::context::RequestContext;
use crate::contracts::HostEntity;

/// The field's resolved state for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedValue {
    /// Key of the related entity, if one is linked.
    pub morph_to_id: Option<Value>,
    /// Active candidate key, or the raw discriminator class when the
    /// related type is not a registered candidate.
    pub morph_to_type: Option<String>,
    /// URI key of the active candidate's resource.
    pub resource_name: Option<String>,
    /// Human-readable display string for the related entity.
    pub display: Option<String>,
    /// Whether the caller may navigate to the related entity.
    pub viewable: bool,
}

impl MorphTo {
    /// Resolve the field against the host entity for a list/summary view.
    ///
    /// Every step tolerates a missing relation: an unlinked field resolves
    /// to a null id with viewability untouched.
    pub fn resolve(&mut self, host: &dyn HostEntity, ctx: &RequestContext) {
        self.resolve_with(host, ctx, false);
    }

    /// Resolve for a detail view, forcing full display resolution of every
    /// sub-field in the active candidate's schema.
    pub fn resolve_for_display(&mut self, host: &dyn HostEntity, ctx: &RequestContext) {
        self.resolve_with(host, ctx, true);
    }

    fn resolve_with(&mut self, host: &dyn HostEntity, ctx: &RequestContext, for_display: bool) {
        // The declared discriminator maps to a candidate independently of
        // whether a related row is currently linked.
        let declared_key = host
            .morph_type(&self.attribute)
            .and_then(|class| self.registry.lookup_by_morph_class(&class))
            .map(|c| c.key.clone());

        let related = host.related_unscoped(&self.attribute);

        let mut value = ResolvedValue {
            morph_to_id: related.and_then(|e| e.key()),
            morph_to_type: declared_key,
            resource_name: None,
            display: None,
            viewable: self.viewable,
        };

        if let Some(entity) = related {
            let active_key = self
                .registry
                .lookup_by_morph_class(entity.morph_class())
                .map(|c| c.key.clone());

            match active_key {
                Some(key) => {
                    let via = json!({
                        "viaResource": key,
                        "viaResourceId": entity.key(),
                    });

                    if let Some(candidate) = self.registry.lookup_mut(&key) {
                        for field in candidate.fields.iter_mut() {
                            if field.relation_kind().routes_via_parent() {
                                field.set_meta("morphTo", via.clone());
                            }
                            if for_display {
                                field.resolve_for_display(entity);
                            } else {
                                field.resolve(entity);
                            }
                        }

                        value.resource_name = Some(candidate.key.clone());
                        value.morph_to_id = entity.key().map(coerce_key);
                        value.viewable =
                            self.viewable && candidate.resource.authorized_to_view(ctx, entity);
                        value.display = Some(match self.display.for_key(&key) {
                            Some(format) => format(entity),
                            None => candidate.resource.title(entity),
                        });
                    }
                }
                None => {
                    // Unmanaged relation: surface the raw key and
                    // discriminator and withhold navigation.
                    debug!(
                        attribute = %self.attribute,
                        class = entity.morph_class(),
                        "related entity type is not a registered candidate"
                    );
                    value.morph_to_type = Some(entity.morph_class().to_string());
                    value.morph_to_id = entity.key().map(|k| Value::String(key_to_string(&k)));
                    value.display = entity.key().map(|k| key_to_string(&k));
                    value.viewable = false;
                }
            }
        }

        debug!(
            attribute = %self.attribute,
            morph_to_type = ?value.morph_to_type,
            viewable = value.viewable,
            "resolved morph-to field"
        );

        self.resolved = Some(value);
    }
}

/// Normalize numeric-looking string keys to JSON numbers so clients compare
/// ids consistently. Non-round-tripping strings are left alone.
fn coerce_key(key: Value) -> Value {
    match key {
        Value::String(s) => match s.parse::<i64>() {
            Ok(n) if n.to_string() == s => Value::Number(n.into()),
            _ => Value::String(s),
        },
        other => other,
    }
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestKind;
    use crate::contracts::Field;
    use crate::registry::CandidateDef;
    use crate::test_support::{event_log, events, TestEntity, TestHost, TestResource};
    use std::rc::Rc;

    fn field_with(resources: Vec<TestResource>, ctx: &RequestContext) -> MorphTo {
        let defs = resources
            .into_iter()
            .map(|r| CandidateDef::new(Rc::new(r) as Rc<dyn crate::contracts::Resource>))
            .collect();
        MorphTo::new("Commentable", "commentable")
            .types(defs, ctx)
            .unwrap()
    }

    #[test]
    fn test_resolve_with_no_relation() {
        let ctx = RequestContext::new(RequestKind::Index);
        let mut field = field_with(vec![TestResource::new("posts", "App\\Post")], &ctx);
        let host = TestHost::new();

        field.resolve(&host, &ctx);

        let resolved = field.resolved().unwrap();
        assert_eq!(resolved.morph_to_id, None);
        assert_eq!(resolved.morph_to_type, None);
        assert_eq!(resolved.display, None);
        // Unaffected by related-entity authorization
        assert!(resolved.viewable);
    }

    #[test]
    fn test_resolve_declared_type_without_row() {
        let ctx = RequestContext::new(RequestKind::Index);
        let mut field = field_with(vec![TestResource::new("posts", "App\\Post")], &ctx);
        let host = TestHost::new().with_morph_type("commentable", "App\\Post");

        field.resolve(&host, &ctx);

        let resolved = field.resolved().unwrap();
        assert_eq!(resolved.morph_to_id, None);
        assert_eq!(resolved.morph_to_type.as_deref(), Some("posts"));
    }

    #[test]
    fn test_resolve_registered_candidate() {
        let ctx = RequestContext::new(RequestKind::Detail);
        let mut field = field_with(
            vec![TestResource::new("posts", "App\\Post").with_fields(["title"])],
            &ctx,
        );
        let host = TestHost::new().with_related(
            "commentable",
            TestEntity::new("App\\Post")
                .with_key(json!(7))
                .with_attribute("title", json!("Hello world")),
        );

        field.resolve(&host, &ctx);

        let resolved = field.resolved().unwrap();
        assert_eq!(resolved.morph_to_id, Some(json!(7)));
        assert_eq!(resolved.morph_to_type.as_deref(), Some("posts"));
        assert_eq!(resolved.resource_name.as_deref(), Some("posts"));
        assert_eq!(resolved.display.as_deref(), Some("Hello world"));
        assert!(resolved.viewable);

        // Sub-field state was resolved against the related entity
        let candidate = field.registry().lookup("posts").unwrap();
        let serialized = candidate.fields[0].serialize(&ctx);
        assert_eq!(serialized["value"], json!("Hello world"));
    }

    #[test]
    fn test_resolve_unregistered_type() {
        let ctx = RequestContext::new(RequestKind::Detail);
        let mut field = field_with(vec![TestResource::new("posts", "App\\Post")], &ctx);
        let host = TestHost::new().with_related(
            "commentable",
            TestEntity::new("App\\LegacyNote").with_key(json!(42)),
        );

        field.resolve(&host, &ctx);

        let resolved = field.resolved().unwrap();
        assert!(!resolved.viewable);
        assert_eq!(resolved.morph_to_type.as_deref(), Some("App\\LegacyNote"));
        assert_eq!(resolved.morph_to_id, Some(json!("42")));
        assert_eq!(resolved.display.as_deref(), Some("42"));
        assert_eq!(resolved.resource_name, None);
    }

    #[test]
    fn test_resolve_display_formatter() {
        let ctx = RequestContext::new(RequestKind::Detail);
        let defs = vec![CandidateDef::new(Rc::new(
            TestResource::new("posts", "App\\Post"),
        ) as Rc<dyn crate::contracts::Resource>)];
        let mut field = MorphTo::new("Commentable", "commentable")
            .types(defs, &ctx)
            .unwrap()
            .display_for("posts", |e| format!("Post — {}", e.title()));

        let host = TestHost::new().with_related(
            "commentable",
            TestEntity::new("App\\Post")
                .with_key(json!(1))
                .with_attribute("title", json!("First")),
        );

        field.resolve(&host, &ctx);
        assert_eq!(
            field.resolved().unwrap().display.as_deref(),
            Some("Post — First")
        );
    }

    #[test]
    fn test_per_type_formatter_miss_falls_back_to_title() {
        let ctx = RequestContext::new(RequestKind::Detail);
        let defs = vec![CandidateDef::new(Rc::new(
            TestResource::new("posts", "App\\Post"),
        ) as Rc<dyn crate::contracts::Resource>)];
        let mut field = MorphTo::new("Commentable", "commentable")
            .types(defs, &ctx)
            .unwrap()
            .display_for("videos", |e| format!("Video — {}", e.title()));

        let host = TestHost::new().with_related(
            "commentable",
            TestEntity::new("App\\Post")
                .with_key(json!(1))
                .with_attribute("title", json!("Plain title")),
        );

        field.resolve(&host, &ctx);
        assert_eq!(
            field.resolved().unwrap().display.as_deref(),
            Some("Plain title")
        );
    }

    #[test]
    fn test_unauthorized_view_degrades_to_not_viewable() {
        let ctx = RequestContext::new(RequestKind::Detail);
        let mut field = field_with(
            vec![TestResource::new("posts", "App\\Post").deny_view()],
            &ctx,
        );
        let host = TestHost::new().with_related(
            "commentable",
            TestEntity::new("App\\Post").with_key(json!(1)),
        );

        field.resolve(&host, &ctx);
        let resolved = field.resolved().unwrap();
        assert!(!resolved.viewable);
        // Still resolved, never an error
        assert_eq!(resolved.resource_name.as_deref(), Some("posts"));
    }

    #[test]
    fn test_numeric_string_key_coerced() {
        let ctx = RequestContext::new(RequestKind::Detail);
        let mut field = field_with(vec![TestResource::new("posts", "App\\Post")], &ctx);
        let host = TestHost::new().with_related(
            "commentable",
            TestEntity::new("App\\Post").with_key(json!("19")),
        );

        field.resolve(&host, &ctx);
        assert_eq!(field.resolved().unwrap().morph_to_id, Some(json!(19)));
    }

    #[test]
    fn test_relation_sub_fields_stamped_with_via_metadata() {
        let ctx = RequestContext::new(RequestKind::Detail);
        let mut field = field_with(
            vec![TestResource::new("posts", "App\\Post")
                .with_fields(["title"])
                .with_relation_field("comments", crate::contracts::RelationKind::HasMany)],
            &ctx,
        );
        let host = TestHost::new().with_related(
            "commentable",
            TestEntity::new("App\\Post").with_key(json!(5)),
        );

        field.resolve(&host, &ctx);

        let candidate = field.registry().lookup("posts").unwrap();
        let title = candidate.fields[0].serialize(&ctx);
        let comments = candidate.fields[1].serialize(&ctx);

        assert_eq!(title["meta"], json!({}));
        assert_eq!(
            comments["meta"]["morphTo"],
            json!({ "viaResource": "posts", "viaResourceId": 5 })
        );
    }

    #[test]
    fn test_resolve_for_display_delegates_to_sub_fields() {
        let ctx = RequestContext::new(RequestKind::Detail);
        let log = event_log();
        let mut field = field_with(
            vec![TestResource::new("posts", "App\\Post")
                .with_fields(["title", "body"])
                .with_log(log.clone())],
            &ctx,
        );
        let host = TestHost::new().with_related(
            "commentable",
            TestEntity::new("App\\Post").with_key(json!(1)),
        );

        field.resolve_for_display(&host, &ctx);

        assert_eq!(events(&log), vec!["display:title", "display:body"]);
    }

    #[test]
    fn test_resolved_value_serializes_camel_case() {
        let value = ResolvedValue {
            morph_to_id: Some(json!(7)),
            morph_to_type: Some("posts".into()),
            resource_name: Some("posts".into()),
            display: Some("Hello".into()),
            viewable: true,
        };
        let encoded = serde_json::to_value(&value).unwrap();
        assert_eq!(encoded["morphToId"], json!(7));
        assert_eq!(encoded["morphToType"], json!("posts"));
        assert_eq!(encoded["resourceName"], json!("posts"));
    }

    #[test]
    fn test_resolved_value_recomputed_per_call() {
        let ctx = RequestContext::new(RequestKind::Detail);
        let mut field = field_with(vec![TestResource::new("posts", "App\\Post")], &ctx);

        let linked = TestHost::new().with_related(
            "commentable",
            TestEntity::new("App\\Post").with_key(json!(1)),
        );
        field.resolve(&linked, &ctx);
        assert!(field.resolved().unwrap().morph_to_id.is_some());

        let unlinked = TestHost::new();
        field.resolve(&unlinked, &ctx);
        assert!(field.resolved().unwrap().morph_to_id.is_none());
    }
}
