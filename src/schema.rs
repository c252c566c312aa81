//! Context-dependent schema resolution for candidate resources.

use tracing::trace;

use crate::context::{RequestContext, RequestKind};
use crate::contracts::{Field, Resource};

/// Resolve the subset of a resource's sub-fields that applies to the
/// current request context.
///
/// Creation, update, detail and index requests each dispatch to the
/// matching accessor on the resource wrapper; any other request kind falls
/// back to the full, unfiltered field list. A candidate that yields no
/// fields for a context is a legitimate outcome — the client simply renders
/// no inline schema for it — never a failure of the whole field.
pub fn schema_for(resource: &dyn Resource, ctx: &RequestContext) -> Vec<Box<dyn Field>> {
    let fields = match ctx.kind() {
        RequestKind::Create => resource.creation_fields(ctx),
        RequestKind::Update => resource.update_fields(ctx),
        RequestKind::Detail => resource.detail_fields(ctx),
        RequestKind::Index => resource.index_fields(ctx),
        RequestKind::Action | RequestKind::Other => resource.available_fields(ctx),
    };

    trace!(
        resource = resource.uri_key(),
        kind = ?ctx.kind(),
        fields = fields.len(),
        "resolved candidate schema"
    );

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestResource;
    use serde_json::json;

    fn sources_for(kind: RequestKind) -> Vec<String> {
        let resource = TestResource::new("posts", "App\\Post").with_fields(["title"]);
        let ctx = RequestContext::new(kind);
        schema_for(&resource, &ctx)
            .iter()
            .map(|f| f.serialize(&ctx)["source"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_dispatch_per_context() {
        assert_eq!(sources_for(RequestKind::Create), vec!["creation"]);
        assert_eq!(sources_for(RequestKind::Update), vec!["update"]);
        assert_eq!(sources_for(RequestKind::Detail), vec!["detail"]);
        assert_eq!(sources_for(RequestKind::Index), vec!["index"]);
    }

    #[test]
    fn test_fallback_to_available_fields() {
        assert_eq!(sources_for(RequestKind::Action), vec!["available"]);
        assert_eq!(sources_for(RequestKind::Other), vec!["available"]);
    }

    #[test]
    fn test_empty_schema_is_soft() {
        let resource = TestResource::new("posts", "App\\Post");
        let ctx = RequestContext::new(RequestKind::Detail).with_input("x", json!(1));
        assert!(schema_for(&resource, &ctx).is_empty());
    }
}
