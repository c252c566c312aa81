//! Validation rule assembly for the write path.

use indexmap::IndexMap;

use super::MorphTo;
use crate::context::RequestContext;
use crate::schema;

impl MorphTo {
    /// Validation rules for the current request, keyed by field path.
    ///
    /// The field's own attribute always requires a value equal to one of
    /// the registered candidate keys. The selected candidate's sub-field
    /// rules are merged in only when the payload already carries a matching
    /// selection; otherwise the outer rule alone rejects the request and
    /// the sub-field rules are withheld entirely.
    pub fn rules(&self, ctx: &RequestContext) -> IndexMap<String, Vec<String>> {
        let mut rules = IndexMap::new();
        rules.insert(
            self.attribute.clone(),
            vec![
                "required".to_string(),
                format!("in:{}", self.registry.keys().join(",")),
            ],
        );

        if let Some(candidate) = ctx
            .str_input(&self.attribute)
            .and_then(|selected| self.registry.lookup(selected))
        {
            for field in schema::schema_for(candidate.resource.as_ref(), ctx) {
                for (path, field_rules) in field.rules(ctx) {
                    rules.entry(path).or_default().extend(field_rules);
                }
            }
        }

        rules
    }
}
