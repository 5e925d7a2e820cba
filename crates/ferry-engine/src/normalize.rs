//! Payload normalizer: converts fetched entry payloads into a form the
//! destination store can write.
//!
//! Normalization always strips store-local row identifiers and audit
//! metadata, resolves media references through the [`MediaResolver`], and
//! recurses through fragments and fragment unions. Relation handling
//! depends on the mode: stripped entirely (phase 1) or resolved against the
//! destination store (phase 2). A reference that cannot be resolved is
//! dropped, never an error: cross-instance graphs routinely have
//! legitimately absent targets.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use tracing::{trace, warn};

use ferry_core::defaults::{STRIPPED_FIELDS, UNION_TAG_FIELD};
use ferry_core::{Attribute, ContentStore, JsonMap, Result, SchemaRegistry};

use crate::media::MediaResolver;

/// Relation handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationMode {
    /// Omit relation attributes entirely (phase 1: entries may reference
    /// targets that do not exist yet).
    Strip,
    /// Replace references with destination store-local identifiers
    /// (phase 2: every target exists).
    Resolve,
}

/// Stateless-per-entry normalizer; the media resolver it borrows carries
/// the only cross-entry state.
pub struct Normalizer<'a> {
    registry: &'a SchemaRegistry,
    dest: &'a dyn ContentStore,
    media: &'a MediaResolver,
    mode: RelationMode,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        dest: &'a dyn ContentStore,
        media: &'a MediaResolver,
        mode: RelationMode,
    ) -> Self {
        Self {
            registry,
            dest,
            media,
            mode,
        }
    }

    /// Normalize one entry payload against its content-type attributes.
    /// `locale` is the locale of the entry being normalized; relation
    /// lookups prefer the same-locale variant of the target.
    pub async fn normalize_entry(
        &self,
        data: &JsonMap,
        attributes: &BTreeMap<String, Attribute>,
        locale: Option<&str>,
    ) -> Result<JsonMap> {
        self.normalize_map(data, attributes, locale).await
    }

    fn normalize_map<'b>(
        &'b self,
        data: &'b JsonMap,
        attributes: &'b BTreeMap<String, Attribute>,
        locale: Option<&'b str>,
    ) -> BoxFuture<'b, Result<JsonMap>> {
        Box::pin(async move {
            let mut out = JsonMap::new();
            for (key, value) in data {
                if STRIPPED_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                if value.is_null() {
                    out.insert(key.clone(), JsonValue::Null);
                    continue;
                }
                match attributes.get(key) {
                    Some(Attribute::Scalar) => {
                        out.insert(key.clone(), value.clone());
                    }
                    Some(Attribute::Media { multiple }) => {
                        if let Some(resolved) = self.normalize_media(value, *multiple).await? {
                            out.insert(key.clone(), resolved);
                        }
                    }
                    Some(Attribute::Relation { target, multiple }) => match self.mode {
                        RelationMode::Strip => {}
                        RelationMode::Resolve => {
                            if let Some(resolved) =
                                self.normalize_relation(value, target, *multiple, locale).await
                            {
                                out.insert(key.clone(), resolved);
                            }
                        }
                    },
                    Some(Attribute::Fragment {
                        fragment,
                        repeatable,
                    }) => {
                        let Some(schema) = self.registry.fragment(fragment) else {
                            warn!(attribute = %key, fragment = %fragment, "normalize: unknown fragment schema, dropped");
                            continue;
                        };
                        let normalized = if *repeatable {
                            let Some(elements) = value.as_array() else {
                                continue;
                            };
                            let mut items = Vec::with_capacity(elements.len());
                            for element in elements {
                                let Some(map) = element.as_object() else {
                                    continue;
                                };
                                items.push(JsonValue::Object(
                                    self.normalize_map(map, &schema.attributes, locale).await?,
                                ));
                            }
                            JsonValue::Array(items)
                        } else {
                            let Some(map) = value.as_object() else {
                                continue;
                            };
                            JsonValue::Object(
                                self.normalize_map(map, &schema.attributes, locale).await?,
                            )
                        };
                        out.insert(key.clone(), normalized);
                    }
                    Some(Attribute::FragmentUnion { members }) => {
                        let Some(elements) = value.as_array() else {
                            continue;
                        };
                        let mut items = Vec::with_capacity(elements.len());
                        for element in elements {
                            match self.normalize_union_element(element, members, locale).await? {
                                Some(item) => items.push(item),
                                None => {}
                            }
                        }
                        out.insert(key.clone(), JsonValue::Array(items));
                    }
                    None => {
                        // Unknown attribute: opaque structures cannot be
                        // written safely, scalars can.
                        if is_object_valued(value) {
                            trace!(attribute = %key, "normalize: unknown object-valued attribute dropped");
                        } else {
                            out.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            Ok(out)
        })
    }

    /// Normalize one tagged element of a fragment-union array. The member
    /// tag is preserved on the output element.
    async fn normalize_union_element(
        &self,
        element: &JsonValue,
        members: &[String],
        locale: Option<&str>,
    ) -> Result<Option<JsonValue>> {
        let Some(map) = element.as_object() else {
            return Ok(None);
        };
        let Some(tag) = map.get(UNION_TAG_FIELD).and_then(JsonValue::as_str) else {
            warn!("normalize: union element without member tag dropped");
            return Ok(None);
        };
        if !members.iter().any(|m| m == tag) {
            warn!(tag = %tag, "normalize: union element with undeclared member tag dropped");
            return Ok(None);
        }
        let Some(schema) = self.registry.fragment(tag) else {
            warn!(tag = %tag, "normalize: union member schema unknown, element dropped");
            return Ok(None);
        };
        let tag = tag.to_string();
        let mut normalized = self.normalize_map(map, &schema.attributes, locale).await?;
        normalized.insert(UNION_TAG_FIELD.to_string(), JsonValue::String(tag));
        Ok(Some(JsonValue::Object(normalized)))
    }

    async fn normalize_media(
        &self,
        value: &JsonValue,
        multiple: bool,
    ) -> Result<Option<JsonValue>> {
        if multiple {
            let Some(elements) = value.as_array() else {
                return Ok(None);
            };
            let mut resolved = Vec::with_capacity(elements.len());
            for element in elements {
                if let Some(id) = self.media.resolve_value(element).await? {
                    resolved.push(JsonValue::String(id));
                }
            }
            Ok(Some(JsonValue::Array(resolved)))
        } else {
            Ok(self
                .media
                .resolve_value(value)
                .await?
                .map(JsonValue::String))
        }
    }

    async fn normalize_relation(
        &self,
        value: &JsonValue,
        target: &str,
        multiple: bool,
        locale: Option<&str>,
    ) -> Option<JsonValue> {
        if multiple {
            let elements = value.as_array()?;
            let mut resolved = Vec::with_capacity(elements.len());
            for element in elements {
                if let Some(id) = self.resolve_reference(element, target, locale).await {
                    resolved.push(JsonValue::String(id));
                }
            }
            Some(JsonValue::Array(resolved))
        } else {
            self.resolve_reference(value, target, locale)
                .await
                .map(JsonValue::String)
        }
    }

    /// Resolve one relation reference to a destination store-local id.
    /// Prefers the referencing entry's locale, falls back to any variant.
    async fn resolve_reference(
        &self,
        value: &JsonValue,
        target: &str,
        locale: Option<&str>,
    ) -> Option<String> {
        let Some(stable_id) = reference_stable_id(value) else {
            warn!(target = %target, "normalize: relation reference without stable identifier dropped");
            return None;
        };

        if locale.is_some() {
            match self.dest.find_entry(target, &stable_id, locale).await {
                Ok(Some(record)) => return Some(record.id),
                Ok(None) => {}
                Err(e) => {
                    warn!(target = %target, stable_id = %stable_id, error = %e, "normalize: relation lookup failed, dropped");
                    return None;
                }
            }
        }
        match self.dest.find_entry(target, &stable_id, None).await {
            Ok(Some(record)) => Some(record.id),
            Ok(None) => {
                warn!(target = %target, stable_id = %stable_id, "normalize: relation target absent, dropped");
                None
            }
            Err(e) => {
                warn!(target = %target, stable_id = %stable_id, error = %e, "normalize: relation lookup failed, dropped");
                None
            }
        }
    }
}

/// Extract the stable identifier from a relation reference, which is
/// either an embedded copy of the referenced entry's portable fields or a
/// bare identifier.
fn reference_stable_id(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Object(map) => map
            .get("stable_id")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// Whether a JSON value is object-valued for the unknown-attribute policy:
/// an object, or an array containing any object.
fn is_object_valued(value: &JsonValue) -> bool {
    match value {
        JsonValue::Object(_) => true,
        JsonValue::Array(items) => items.iter().any(JsonValue::is_object),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_stable_id_forms() {
        assert_eq!(
            reference_stable_id(&json!("p1")),
            Some("p1".to_string())
        );
        assert_eq!(
            reference_stable_id(&json!({"stable_id": "p2", "title": "x"})),
            Some("p2".to_string())
        );
        assert_eq!(reference_stable_id(&json!("")), None);
        assert_eq!(reference_stable_id(&json!(42)), None);
        assert_eq!(reference_stable_id(&json!({"title": "x"})), None);
    }

    #[test]
    fn test_is_object_valued() {
        assert!(is_object_valued(&json!({"a": 1})));
        assert!(is_object_valued(&json!([{"a": 1}, 2])));
        assert!(!is_object_valued(&json!([1, 2])));
        assert!(!is_object_valued(&json!("text")));
    }
}
