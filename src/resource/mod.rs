//! Inventory data model.
//!
//! Every inventory item is a [`Resource`]: a closed set of kinds sharing a
//! `name` (unique, compared case-insensitively) and a set of `tags`. Each kind
//! carries its own attributes, see [`hardware`], [`system`] and [`service`].
//!
//! Field names follow lower camel case on disk (`runsOn`, `accessPoint`
//! style) regardless of the Rust field names.

pub mod components;
pub mod hardware;
pub mod service;
pub mod system;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use components::{Cpu, Drive, Gpu, Network, Nic, Port, Ram};
pub use hardware::{AccessPoint, Desktop, Firewall, Laptop, Router, Server, Switch, Ups};
pub use service::Service;
pub use system::SystemResource;

/// Discriminator identifying the concrete shape of a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    Server,
    Switch,
    Firewall,
    Router,
    Desktop,
    Laptop,
    AccessPoint,
    Ups,
    System,
    Service,
}

impl Kind {
    /// Every kind, in catalogue order.
    pub const ALL: [Kind; 10] = [
        Kind::Server,
        Kind::Switch,
        Kind::Firewall,
        Kind::Router,
        Kind::Desktop,
        Kind::Laptop,
        Kind::AccessPoint,
        Kind::Ups,
        Kind::System,
        Kind::Service,
    ];

    /// The tag written to the `kind` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "Server",
            Self::Switch => "Switch",
            Self::Firewall => "Firewall",
            Self::Router => "Router",
            Self::Desktop => "Desktop",
            Self::Laptop => "Laptop",
            Self::AccessPoint => "AccessPoint",
            Self::Ups => "Ups",
            Self::System => "System",
            Self::Service => "Service",
        }
    }

    /// Look up a kind by its tag, ignoring ASCII case.
    pub fn from_tag(tag: &str) -> Option<Kind> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
    }

    pub fn category(&self) -> Category {
        match self {
            Self::System => Category::System,
            Self::Service => Category::Service,
            _ => Category::Hardware,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::from_tag(s).ok_or_else(|| {
            let known: Vec<&str> = Kind::ALL.iter().map(Kind::as_str).collect();
            format!("unknown kind '{s}' (expected one of: {})", known.join(", "))
        })
    }
}

/// Coarse grouping used by the typed store views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Hardware,
    System,
    Service,
}

/// One inventory item.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Server(Server),
    Switch(Switch),
    Firewall(Firewall),
    Router(Router),
    Desktop(Desktop),
    Laptop(Laptop),
    AccessPoint(AccessPoint),
    Ups(Ups),
    System(SystemResource),
    Service(Service),
}

/// Dispatch an expression over the inner value of every variant.
macro_rules! each_variant {
    ($value:expr, $inner:ident => $body:expr) => {
        match $value {
            Resource::Server($inner) => $body,
            Resource::Switch($inner) => $body,
            Resource::Firewall($inner) => $body,
            Resource::Router($inner) => $body,
            Resource::Desktop($inner) => $body,
            Resource::Laptop($inner) => $body,
            Resource::AccessPoint($inner) => $body,
            Resource::Ups($inner) => $body,
            Resource::System($inner) => $body,
            Resource::Service($inner) => $body,
        }
    };
}

impl Resource {
    /// Create an empty resource of the given kind.
    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        let name = name.into();
        match kind {
            Kind::Server => Resource::Server(Server::named(name)),
            Kind::Switch => Resource::Switch(Switch::named(name)),
            Kind::Firewall => Resource::Firewall(Firewall::named(name)),
            Kind::Router => Resource::Router(Router::named(name)),
            Kind::Desktop => Resource::Desktop(Desktop::named(name)),
            Kind::Laptop => Resource::Laptop(Laptop::named(name)),
            Kind::AccessPoint => Resource::AccessPoint(AccessPoint::named(name)),
            Kind::Ups => Resource::Ups(Ups::named(name)),
            Kind::System => Resource::System(SystemResource::named(name)),
            Kind::Service => Resource::Service(Service::named(name)),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Resource::Server(_) => Kind::Server,
            Resource::Switch(_) => Kind::Switch,
            Resource::Firewall(_) => Kind::Firewall,
            Resource::Router(_) => Kind::Router,
            Resource::Desktop(_) => Kind::Desktop,
            Resource::Laptop(_) => Kind::Laptop,
            Resource::AccessPoint(_) => Kind::AccessPoint,
            Resource::Ups(_) => Kind::Ups,
            Resource::System(_) => Kind::System,
            Resource::Service(_) => Kind::Service,
        }
    }

    pub fn category(&self) -> Category {
        self.kind().category()
    }

    pub fn name(&self) -> &str {
        each_variant!(self, inner => &inner.name)
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        each_variant!(self, inner => &inner.tags)
    }

    pub fn tags_mut(&mut self) -> &mut BTreeSet<String> {
        each_variant!(self, inner => &mut inner.tags)
    }

    pub(crate) fn set_name(&mut self, name: String) {
        each_variant!(self, inner => inner.name = name)
    }

    /// Whether this resource is identified by `name` (case-insensitive).
    pub fn is_named(&self, name: &str) -> bool {
        same_name(self.name(), name)
    }

    pub fn as_system(&self) -> Option<&SystemResource> {
        match self {
            Resource::System(system) => Some(system),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&Service> {
        match self {
            Resource::Service(service) => Some(service),
            _ => None,
        }
    }

    pub fn as_service_mut(&mut self) -> Option<&mut Service> {
        match self {
            Resource::Service(service) => Some(service),
            _ => None,
        }
    }
}

/// Case-insensitive name comparison shared by every lookup.
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(Kind::from_tag("accesspoint"), Some(Kind::AccessPoint));
        assert_eq!(Kind::from_tag(" UPS "), Some(Kind::Ups));
        assert_eq!(Kind::from_tag("Mainframe"), None);
    }

    #[test]
    fn test_kind_from_str_lists_known_kinds() {
        let err = "toaster".parse::<Kind>().unwrap_err();
        assert!(err.contains("toaster"));
        assert!(err.contains("AccessPoint"));
    }

    #[test]
    fn test_new_resource_has_requested_kind_and_name() {
        for kind in Kind::ALL {
            let resource = Resource::new(kind, "alpha");
            assert_eq!(resource.kind(), kind);
            assert_eq!(resource.name(), "alpha");
            assert!(resource.tags().is_empty());
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(Kind::Server.category(), Category::Hardware);
        assert_eq!(Kind::Ups.category(), Category::Hardware);
        assert_eq!(Kind::System.category(), Category::System);
        assert_eq!(Kind::Service.category(), Category::Service);
    }

    #[test]
    fn test_name_matching_ignores_case() {
        let resource = Resource::new(Kind::Service, "immich");
        assert!(resource.is_named("IMMICH"));
        assert!(resource.is_named("Immich"));
        assert!(!resource.is_named("immich2"));
    }

    #[test]
    fn test_tags_mut() {
        let mut resource = Resource::new(Kind::Switch, "core-sw");
        resource.tags_mut().insert("rack-a".to_string());
        resource.tags_mut().insert("rack-a".to_string());
        assert_eq!(resource.tags().len(), 1);
    }
}
