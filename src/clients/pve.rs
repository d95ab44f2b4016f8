//! Client for the Proxmox VE management API.

use std::collections::HashMap;
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::ConfigSource;
use crate::slot::SlotId;

/// Errors from the management API. All variants mean the same thing to the
/// reconciler: live state is unavailable and the pass must be abandoned.
#[derive(Debug, Error)]
pub enum PveError {
    #[error("request to PVE API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("PVE API returned {status} for {path}")]
    Api {
        status: reqwest::StatusCode,
        path: String,
    },

    #[error("invalid PVE API endpoint: {0}")]
    Endpoint(String),
}

/// Reference to a QEMU guest on a specific cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRef {
    pub node: String,
    pub vmid: u32,
}

impl VmRef {
    pub fn new(node: impl Into<String>, vmid: u32) -> Self {
        Self {
            node: node.into(),
            vmid,
        }
    }
}

impl fmt::Display for VmRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "qemu/{}@{}", self.vmid, self.node)
    }
}

/// Immutable snapshot of a guest's live configuration.
///
/// Keys are attribute names, disk slot keys among them (`"ide2"`,
/// `"sata0"`, ...). The map is heterogeneous: populated disk slots carry
/// strings of the form `<storage>:<volume>`, other attributes can be
/// numbers or anything else the API reports.
#[derive(Debug, Clone, Default)]
pub struct LiveConfig(HashMap<String, Value>);

impl LiveConfig {
    pub fn new(attrs: HashMap<String, Value>) -> Self {
        Self(attrs)
    }

    /// Volume string for a disk slot, if the slot is populated and the live
    /// value is string-shaped. Any other shape reads as unpopulated.
    pub fn volume(&self, slot: SlotId) -> Option<&str> {
        self.0.get(&slot.to_string()).and_then(Value::as_str)
    }
}

impl FromIterator<(String, Value)> for LiveConfig {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Envelope every PVE API response body is wrapped in.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

/// HTTPS client for the Proxmox VE API, authenticated with an API token.
pub struct PveClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl PveClient {
    /// `base_url` is the scheme-and-host part, e.g.
    /// `https://pve1.example.com:8006`; `token` the full API token value
    /// (`user@realm!name=uuid`).
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, PveError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(PveError::Endpoint(base_url));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PveError> {
        debug!(path = %path, "GET PVE API");

        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("PVEAPIToken={}", self.token))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(PveError::Api {
                status: resp.status(),
                path: path.to_string(),
            });
        }

        let body: ApiResponse<T> = resp.json().await?;
        Ok(body.data)
    }
}

#[async_trait]
impl ConfigSource for PveClient {
    async fn current_config(&self, vm: &VmRef) -> Result<LiveConfig> {
        let path = format!("/api2/json/nodes/{}/qemu/{}/config", vm.node, vm.vmid);
        let attrs: HashMap<String, Value> = self.get_json(&path).await?;
        Ok(LiveConfig::new(attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vm_ref_display() {
        let vm = VmRef::new("pve1", 100);
        assert_eq!(vm.to_string(), "qemu/100@pve1");
    }

    #[test]
    fn client_rejects_bare_host_endpoint() {
        assert!(PveClient::new("pve1.example.com:8006", "t").is_err());
        assert!(PveClient::new("https://pve1.example.com:8006/", "t").is_ok());
    }

    #[test]
    fn volume_reads_only_string_values() {
        let live: LiveConfig = [
            ("ide2".to_string(), json!("local-lvm:vm-100-cloudinit")),
            ("ide3".to_string(), json!(42)),
            ("cores".to_string(), json!(4)),
        ]
        .into_iter()
        .collect();

        let ide2 = "ide2".parse().unwrap();
        let ide3 = "ide3".parse().unwrap();
        let ide0 = "ide0".parse().unwrap();

        assert_eq!(live.volume(ide2), Some("local-lvm:vm-100-cloudinit"));
        assert_eq!(live.volume(ide3), None);
        assert_eq!(live.volume(ide0), None);
    }

    #[test]
    fn api_envelope_deserializes() {
        let body = json!({ "data": { "ide2": "local:cloudinit", "cores": 2 } });
        let resp: ApiResponse<HashMap<String, Value>> = serde_json::from_value(body).unwrap();
        assert_eq!(resp.data["ide2"], json!("local:cloudinit"));
    }
}
