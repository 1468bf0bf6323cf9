//! Network services hosted on a system.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::components::Network;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub network: Option<Network>,
    /// Name of the system this service runs on.
    pub runs_on: Option<String>,
}

impl Service {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Mutable access to the network descriptor, creating it when absent.
    pub fn network_mut(&mut self) -> &mut Network {
        self.network.get_or_insert_with(Network::default)
    }
}
