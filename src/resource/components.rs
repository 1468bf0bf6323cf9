//! Building blocks shared by several resource kinds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cpu {
    pub model: Option<String>,
    pub cores: Option<u32>,
    pub threads: Option<u32>,
}

/// Memory; `size` is in GB, `mts` in megatransfers per second.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ram {
    pub size: Option<u32>,
    pub mts: Option<u32>,
}

/// Storage device; `size` is in GB.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    #[serde(rename = "type")]
    pub drive_type: Option<String>,
    pub size: Option<u32>,
}

impl Drive {
    /// Drive types accepted by the CLI (`nvme`, `ssd`, `hdd`, ...).
    pub const VALID_TYPES: [&'static str; 8] =
        ["nvme", "ssd", "hdd", "sas", "sata", "usb", "sdcard", "micro-sd"];
}

/// Network interface card; `speed` is in Gb/s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nic {
    #[serde(rename = "type")]
    pub nic_type: Option<String>,
    pub speed: Option<u32>,
    pub ports: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gpu {
    pub model: Option<String>,
    pub vram: Option<u32>,
}

/// A group of identical ports on a network device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    #[serde(rename = "type")]
    pub port_type: Option<String>,
    pub speed: Option<u32>,
    pub count: Option<u32>,
}

/// How a service is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub url: Option<String>,
}

impl Network {
    pub fn is_empty(&self) -> bool {
        self.ip.is_none() && self.port.is_none() && self.protocol.is_none() && self.url.is_none()
    }
}
