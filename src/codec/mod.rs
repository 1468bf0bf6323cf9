//! Resource codec.
//!
//! Converts between [`Resource`] values and the on-disk document format: a
//! single top-level `resources` sequence whose elements are mappings tagged
//! with a `kind` field.
//!
//! ```yaml
//! resources:
//! - kind: Service
//!   name: immich
//!   tags: []
//!   network:
//!     ip: 192.168.10.14
//!     port: 80
//!   runsOn: vm01
//! ```
//!
//! # Decode policy
//!
//! - An element without `kind` is skipped.
//! - An element whose `kind` is not registered aborts the whole document with
//!   [`CodecError::UnrecognizedKind`]. The same rule applies to every caller
//!   (startup load, explicit load, background reload) so a typo never silently
//!   drops records from a file that is later saved.

mod error;
pub mod keys;
mod registry;

use std::sync::{Arc, LazyLock};

use serde_yaml::{Mapping, Value};

pub use error::{CodecError, CodecResult};
pub use registry::{DecodeFn, EncodeFn, KindCodec, KindRegistry};

use crate::resource::Resource;

/// Name of the top-level sequence in every resource file.
pub const RESOURCES_KEY: &str = "resources";

/// Name of the discriminator field.
pub const KIND_KEY: &str = "kind";

static BUILTIN: LazyLock<Arc<KindRegistry>> = LazyLock::new(|| Arc::new(KindRegistry::builtin()));

/// Encoder/decoder backed by a [`KindRegistry`].
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<KindRegistry>,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            registry: BUILTIN.clone(),
        }
    }
}

impl Codec {
    /// Codec for the built-in kinds.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: KindRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Encode a resource: `kind` first, then the attributes in declaration order.
    pub fn encode(&self, resource: &Resource) -> CodecResult<Mapping> {
        let kind = resource.kind();
        let codec = self
            .registry
            .get(kind)
            .ok_or_else(|| CodecError::UnregisteredKind {
                kind: kind.to_string(),
            })?;

        let fields = (codec.encode)(resource)?;
        let mut out = Mapping::with_capacity(fields.len() + 1);
        out.insert(
            Value::String(KIND_KEY.to_string()),
            Value::String(kind.as_str().to_string()),
        );
        for (key, value) in fields {
            if key.as_str() == Some(KIND_KEY) {
                continue;
            }
            out.insert(key, value);
        }
        Ok(out)
    }

    /// Decode one tagged mapping.
    ///
    /// Returns `Ok(None)` when the mapping has no `kind` (or a null one).
    pub fn decode(&self, mapping: Mapping) -> CodecResult<Option<Resource>> {
        let tag = match keys::get_ignore_case(&mapping, KIND_KEY) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(tag)) => tag.clone(),
            Some(other) => scalar_text(other),
        };

        let codec = self
            .registry
            .by_tag(&tag)
            .ok_or_else(|| CodecError::UnrecognizedKind { kind: tag.clone() })?;

        let mut fields = keys::canonicalize_mapping(mapping);
        fields.remove(KIND_KEY);
        (codec.decode)(Value::Mapping(fields)).map(Some)
    }

    /// Parse a whole resource document.
    ///
    /// Empty text, a null document, or a document without `resources` all
    /// decode to no resources.
    pub fn parse_document(&self, text: &str) -> CodecResult<Vec<Resource>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document: Value = serde_yaml::from_str(text).map_err(|e| CodecError::Parse {
            reason: e.to_string(),
        })?;

        let root = match document {
            Value::Null => return Ok(Vec::new()),
            Value::Mapping(root) => root,
            _ => {
                return Err(CodecError::InvalidShape {
                    reason: "top level must be a mapping".to_string(),
                });
            }
        };

        let items = match keys::get_ignore_case(&root, RESOURCES_KEY) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Sequence(items)) => items.clone(),
            Some(_) => {
                return Err(CodecError::InvalidShape {
                    reason: format!("'{RESOURCES_KEY}' must be a sequence"),
                });
            }
        };

        let mut resources = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let mapping = match item {
                Value::Mapping(mapping) => mapping,
                Value::Null => continue,
                _ => {
                    return Err(CodecError::InvalidShape {
                        reason: format!("resource #{index} is not a mapping"),
                    });
                }
            };

            match self.decode(mapping)? {
                Some(resource) => resources.push(resource),
                None => {
                    tracing::debug!("[codec] skipping resource #{index}: no kind");
                }
            }
        }

        Ok(resources)
    }

    /// Render resources as a complete document.
    pub fn render_document<'a>(
        &self,
        resources: impl IntoIterator<Item = &'a Resource>,
    ) -> CodecResult<String> {
        let items = resources
            .into_iter()
            .map(|resource| self.encode(resource).map(Value::Mapping))
            .collect::<CodecResult<Vec<_>>>()?;

        let mut root = Mapping::with_capacity(1);
        root.insert(
            Value::String(RESOURCES_KEY.to_string()),
            Value::Sequence(items),
        );

        serde_yaml::to_string(&root).map_err(|e| CodecError::Render {
            reason: e.to_string(),
        })
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
