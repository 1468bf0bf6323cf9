//! Logical systems: operating system installs, hypervisors, VMs, containers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::components::Drive;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemResource {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Free-form classification, e.g. `baremetal`, `vm`, `container`.
    #[serde(rename = "type")]
    pub system_type: Option<String>,
    pub os: Option<String>,
    pub cores: Option<u32>,
    /// Memory in GB.
    pub ram: Option<u32>,
    pub drives: Option<Vec<Drive>>,
    /// Name of the hardware this system runs on.
    pub runs_on: Option<String>,
}

impl SystemResource {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
