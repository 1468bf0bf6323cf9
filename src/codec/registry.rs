//! Kind registry: maps each `kind` tag to its encode/decode pair.
//!
//! Adding a kind is a single entry in [`KindRegistry::builtin`]; neither the
//! document codec nor the store branch on concrete types.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use super::error::{CodecError, CodecResult};
use crate::resource::{
    AccessPoint, Desktop, Firewall, Kind, Laptop, Resource, Router, Server, Service, Switch,
    SystemResource, Ups,
};

/// Encodes a resource's attributes (everything except `kind`).
pub type EncodeFn = fn(&Resource) -> CodecResult<Mapping>;

/// Decodes a canonicalized attribute mapping into a resource.
pub type DecodeFn = fn(Value) -> CodecResult<Resource>;

/// Encode/decode pair for one kind.
#[derive(Clone, Copy)]
pub struct KindCodec {
    pub kind: Kind,
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

impl std::fmt::Debug for KindCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindCodec").field("kind", &self.kind).finish()
    }
}

/// Builds a [`KindCodec`] for a variant whose payload derives serde.
macro_rules! kind_codec {
    ($variant:ident, $ty:ty) => {
        KindCodec {
            kind: Kind::$variant,
            encode: |resource| match resource {
                Resource::$variant(inner) => to_mapping(Kind::$variant, inner),
                other => Err(CodecError::UnregisteredKind {
                    kind: other.kind().to_string(),
                }),
            },
            decode: |value| from_value::<$ty>(Kind::$variant, value).map(Resource::$variant),
        }
    };
}

/// Registered kinds, looked up by [`Kind`] or by tag.
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    codecs: Vec<KindCodec>,
}

impl KindRegistry {
    /// An empty registry. Encoding anything fails until kinds are registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(kind_codec!(Server, Server));
        registry.register(kind_codec!(Switch, Switch));
        registry.register(kind_codec!(Firewall, Firewall));
        registry.register(kind_codec!(Router, Router));
        registry.register(kind_codec!(Desktop, Desktop));
        registry.register(kind_codec!(Laptop, Laptop));
        registry.register(kind_codec!(AccessPoint, AccessPoint));
        registry.register(kind_codec!(Ups, Ups));
        registry.register(kind_codec!(System, SystemResource));
        registry.register(kind_codec!(Service, Service));
        registry
    }

    /// Register a codec, replacing any previous entry for the same kind.
    pub fn register(&mut self, codec: KindCodec) {
        self.codecs.retain(|existing| existing.kind != codec.kind);
        self.codecs.push(codec);
    }

    pub fn get(&self, kind: Kind) -> Option<&KindCodec> {
        self.codecs.iter().find(|codec| codec.kind == kind)
    }

    /// Look up a codec by its on-disk tag, ignoring case.
    pub fn by_tag(&self, tag: &str) -> Option<&KindCodec> {
        Kind::from_tag(tag).and_then(|kind| self.get(kind))
    }

    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        self.codecs.iter().map(|codec| codec.kind)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

fn to_mapping<T: Serialize>(kind: Kind, value: &T) -> CodecResult<Mapping> {
    match serde_yaml::to_value(value) {
        Ok(Value::Mapping(mapping)) => Ok(mapping),
        Ok(_) => Err(CodecError::Field {
            kind: kind.to_string(),
            reason: "resource did not encode to a mapping".to_string(),
        }),
        Err(e) => Err(CodecError::Field {
            kind: kind.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn from_value<T: DeserializeOwned>(kind: Kind, value: Value) -> CodecResult<T> {
    serde_yaml::from_value(value).map_err(|e| CodecError::Field {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}
