//! Write path: hydrate the related entity from the incoming request and
//! link the host relation to it.

use std::rc::Rc;

use tracing::debug;

use super::MorphTo;
use crate::context::RequestContext;
use crate::contracts::{AfterSave, HostEntity, RelatedEntity, Resource};
use crate::error::{FieldError, Result};
use crate::schema;

impl MorphTo {
    /// Fill the related entity from the request payload and associate the
    /// host relation with it.
    ///
    /// Validation (`rules`) runs at the request boundary before this is
    /// invoked; the unknown-candidate checks here are a backstop, not the
    /// primary gate. Returns one deferred callback that, invoked after the
    /// host entity itself is saved, runs every sub-field callback in
    /// collection order.
    pub fn fill(
        &mut self,
        ctx: &RequestContext,
        host: &mut dyn HostEntity,
    ) -> Result<Option<AfterSave>> {
        let selected = ctx
            .str_input(&self.attribute)
            .ok_or_else(|| FieldError::MissingSelection {
                attribute: self.attribute.clone(),
            })?
            .to_string();

        let resource = self
            .registry
            .lookup(&selected)
            .map(|c| Rc::clone(&c.resource))
            .ok_or_else(|| FieldError::UnknownCandidate {
                key: selected.clone(),
            })?;

        let mut callbacks: Vec<AfterSave> = Vec::new();

        // Reuse the linked related entity when one exists, otherwise start
        // from a blank entity of the selected candidate's type.
        let (key, morph_class) = match host.related_mut(&self.attribute) {
            Some(entity) => {
                fill_related(resource.as_ref(), ctx, entity, &mut callbacks)?;
                (entity.key(), entity.morph_class().to_string())
            }
            None => {
                let mut entity = resource.new_entity();
                fill_related(resource.as_ref(), ctx, entity.as_mut(), &mut callbacks)?;
                (entity.key(), entity.morph_class().to_string())
            }
        };

        let key = key.ok_or_else(|| {
            FieldError::persistence(resource.uri_key(), "saved entity has no key")
        })?;

        host.associate(&self.attribute, key, &morph_class);

        debug!(
            attribute = %self.attribute,
            candidate = %selected,
            callbacks = callbacks.len(),
            "filled morph-to relation"
        );

        if callbacks.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(move || {
            for callback in callbacks {
                callback()?;
            }
            Ok(())
        })))
    }
}

/// Validate, fill and persist one related entity. Structural validation
/// runs before any sub-field fill so an invalid entity never reaches the
/// sub-fields; the save failure is fatal for the request and not retried.
fn fill_related(
    resource: &dyn Resource,
    ctx: &RequestContext,
    entity: &mut dyn RelatedEntity,
    callbacks: &mut Vec<AfterSave>,
) -> Result<()> {
    if entity.exists() {
        resource.validate_for_update(ctx)?;
    } else {
        resource.validate_for_creation(ctx)?;
    }

    for mut field in schema::schema_for(resource, ctx) {
        if let Some(callback) = field.fill(ctx, entity)? {
            callbacks.push(callback);
        }
    }

    entity.save()
}
