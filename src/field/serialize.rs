//! Wire serialization of the field and every candidate's sub-schema.

use serde_json::{json, Value};

use super::{DefaultCandidate, MorphTo};
use crate::context::RequestContext;

impl MorphTo {
    /// Wire representation of the field for the client.
    ///
    /// Every candidate's sub-fields are serialized under a scoped remap of
    /// the route resource parameter, so each sub-field renders as if it
    /// belonged directly to its candidate's own resource. The guard restores
    /// the original parameter before the next candidate is processed and
    /// before control returns, even when a sub-field serializer panics.
    pub fn serialize(&self, ctx: &RequestContext) -> Value {
        let mut types = Vec::with_capacity(self.registry.len());
        for candidate in self.registry.all() {
            let fields: Vec<Value> = {
                let _scope = ctx.scope_resource(&candidate.key);
                candidate.fields.iter().map(|f| f.serialize(ctx)).collect()
            };
            types.push(json!({
                "key": candidate.key,
                "singularLabel": candidate.singular_label,
                "display": candidate.display,
                "value": candidate.key,
                "fields": fields,
            }));
        }

        let resolved = self.resolved.as_ref();
        let resource_name = resolved.and_then(|r| r.resource_name.clone());
        let resource_label = resource_name
            .as_deref()
            .and_then(|key| self.registry.lookup(key))
            .map(|c| c.resource.singular_label());

        json!({
            "morphToId": resolved.and_then(|r| r.morph_to_id.clone()),
            "morphToType": resolved.and_then(|r| r.morph_to_type.clone()),
            "morphToTypes": types,
            "resourceLabel": resource_label,
            "resourceName": resource_name,
            "viewable": resolved.map(|r| r.viewable).unwrap_or(self.viewable),
            "defaultResource": self.default_resource(ctx),
            "listable": true,
        })
    }

    /// The default candidate key for creation-style requests.
    ///
    /// Evaluated only under create/attach, index and action contexts, only
    /// when no value is currently resolved, and only when the selector's
    /// answer names a registered candidate.
    fn default_resource(&self, ctx: &RequestContext) -> Option<String> {
        if !(ctx.is_create_or_attach() || ctx.is_index() || ctx.is_action()) {
            return None;
        }
        if self.resolved.as_ref().is_some_and(|r| r.display.is_some()) {
            return None;
        }

        let key = match self.default_candidate.as_ref()? {
            DefaultCandidate::Key(key) => Some(key.clone()),
            DefaultCandidate::Select(select) => select(ctx),
        }?;

        self.registry.lookup(&key).map(|c| c.key.clone())
    }
}
