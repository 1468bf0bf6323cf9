//! Physical devices.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::components::{Cpu, Drive, Gpu, Nic, Port, Ram};

/// Rack or tower server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub cpus: Option<Vec<Cpu>>,
    pub ram: Option<Ram>,
    pub drives: Option<Vec<Drive>>,
    pub nics: Option<Vec<Nic>>,
    pub gpus: Option<Vec<Gpu>>,
    /// Whether an out-of-band management interface is present.
    pub ipmi: Option<bool>,
}

/// Workstation-class machine. `Laptop` shares the same layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Desktop {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub model: Option<String>,
    pub cpus: Option<Vec<Cpu>>,
    pub ram: Option<Ram>,
    pub drives: Option<Vec<Drive>>,
    pub nics: Option<Vec<Nic>>,
    pub gpus: Option<Vec<Gpu>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Laptop {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub model: Option<String>,
    pub cpus: Option<Vec<Cpu>>,
    pub ram: Option<Ram>,
    pub drives: Option<Vec<Drive>>,
    pub nics: Option<Vec<Nic>>,
    pub gpus: Option<Vec<Gpu>>,
}

/// Declares a port-based network device (switch, router, firewall).
macro_rules! port_device {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub name: String,
            #[serde(default)]
            pub tags: BTreeSet<String>,
            pub model: Option<String>,
            pub managed: Option<bool>,
            pub poe: Option<bool>,
            pub ports: Option<Vec<Port>>,
        }
    };
}

port_device!(Switch);
port_device!(Router);
port_device!(Firewall);

/// Wireless access point; `speed` is in Gb/s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPoint {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub model: Option<String>,
    pub speed: Option<f64>,
}

/// Uninterruptible power supply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ups {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub model: Option<String>,
    pub va: Option<u32>,
}

macro_rules! named_ctor {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $name {
                pub fn named(name: impl Into<String>) -> Self {
                    Self {
                        name: name.into(),
                        ..Self::default()
                    }
                }
            }
        )+
    };
}

named_ctor!(Server, Desktop, Laptop, Switch, Router, Firewall, AccessPoint, Ups);
