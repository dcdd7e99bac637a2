use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to one peer of the channel.
///
/// Carries what the session needs to address proposals, queries and event
/// subscriptions to the peer. The engine never owns peers; it only picks
/// among the list the session hands out.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerHandle {
    /// Logical name, unique within the channel (e.g. `peer0.org1`).
    pub name: String,
    /// Endpoint URL (e.g. `grpcs://peer0.org1.example.com:7051`).
    pub url: String,
    /// TLS host name override used when the URL host differs from the
    /// certificate subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_host_override: Option<String>,
}

impl PeerHandle {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            tls_host_override: None,
        }
    }

    pub fn with_tls_host_override(mut self, host: impl Into<String>) -> Self {
        self.tls_host_override = Some(host.into());
        self
    }
}

impl fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
