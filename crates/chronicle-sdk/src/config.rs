use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chronicle_engine::{EngineConfig, DEFAULT_QUERY_FUNCTION, DEFAULT_WRITE_FUNCTION};
use chronicle_types::{
    PeerHandle, QueryRequest, WriteRequest, DEFAULT_EVALUATE_TIMEOUT, DEFAULT_QUERY_ATTEMPTS,
    DEFAULT_QUERY_TIMEOUT, DEFAULT_WRITE_ATTEMPTS, DEFAULT_WRITE_TIMEOUT,
};

use crate::error::{SdkError, SdkResult};

/// Client configuration, read from a TOML file.
///
/// ```toml
/// channel = "registry-channel"
/// user = "appUser"
///
/// [contract]
/// name = "registry"
///
/// [write]
/// timeout_ms = 9500
/// max_attempts = 2
///
/// [[peers]]
/// name = "peer0.org1"
/// url = "grpcs://localhost:7051"
/// tls_ca_cert = "crypto/peer0/tls/ca.crt"
/// ssl_target_name_override = "peer0.org1.example.com"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub channel: String,
    /// Identity proposals are signed as.
    #[serde(default = "default_user")]
    pub user: String,
    pub contract: ContractConfig,
    #[serde(default)]
    pub write: WriteSettings,
    #[serde(default)]
    pub query: QuerySettings,
    /// Timeout of one-shot evaluations.
    #[serde(default = "default_evaluate_timeout_ms")]
    pub evaluate_timeout_ms: u64,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub name: String,
    #[serde(default = "default_write_function")]
    pub write_function: String,
    #[serde(default = "default_query_function")]
    pub query_function: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteSettings {
    pub timeout_ms: u64,
    pub max_attempts: u32,
}

impl Default for WriteSettings {
    fn default() -> Self {
        Self {
            timeout_ms: millis(DEFAULT_WRITE_TIMEOUT),
            max_attempts: DEFAULT_WRITE_ATTEMPTS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub timeout_ms: u64,
    pub max_attempts: u32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            timeout_ms: millis(DEFAULT_QUERY_TIMEOUT),
            max_attempts: DEFAULT_QUERY_ATTEMPTS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    pub url: String,
    /// PEM file with the CA that signed the peer's TLS certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,
    /// Host name expected in the peer's TLS certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_target_name_override: Option<String>,
}

impl PeerConfig {
    pub fn to_handle(&self) -> PeerHandle {
        let handle = PeerHandle::new(self.name.as_str(), self.url.as_str());
        match &self.ssl_target_name_override {
            Some(host) => handle.with_tls_host_override(host.as_str()),
            None => handle,
        }
    }
}

fn default_user() -> String {
    "appUser".to_string()
}

fn default_write_function() -> String {
    DEFAULT_WRITE_FUNCTION.to_string()
}

fn default_query_function() -> String {
    DEFAULT_QUERY_FUNCTION.to_string()
}

fn default_evaluate_timeout_ms() -> u64 {
    millis(DEFAULT_EVALUATE_TIMEOUT)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl ClientConfig {
    /// A config for `channel` and `contract` with default settings and no
    /// peers.
    pub fn new(channel: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: default_user(),
            contract: ContractConfig {
                name: contract.into(),
                write_function: default_write_function(),
                query_function: default_query_function(),
            },
            write: WriteSettings::default(),
            query: QuerySettings::default(),
            evaluate_timeout_ms: default_evaluate_timeout_ms(),
            peers: Vec::new(),
        }
    }

    pub fn with_peer(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.peers.push(PeerConfig {
            name: name.into(),
            url: url.into(),
            tls_ca_cert: None,
            ssl_target_name_override: None,
        });
        self
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SdkError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Every problem found in the config. With `check_files`, TLS CA files
    /// must also exist on disk.
    pub fn problems(&self, check_files: bool) -> Vec<String> {
        let mut problems = Vec::new();

        if self.channel.trim().is_empty() {
            problems.push("channel name is empty".to_string());
        }
        if self.user.trim().is_empty() {
            problems.push("user is empty".to_string());
        }
        if self.contract.name.trim().is_empty() {
            problems.push("contract name is empty".to_string());
        }
        if self.contract.write_function.trim().is_empty() {
            problems.push("contract write_function is empty".to_string());
        }
        if self.contract.query_function.trim().is_empty() {
            problems.push("contract query_function is empty".to_string());
        }
        if self.write.max_attempts == 0 {
            problems.push("write.max_attempts must be at least 1".to_string());
        }
        if self.write.timeout_ms == 0 {
            problems.push("write.timeout_ms must be positive".to_string());
        }
        if self.query.max_attempts == 0 {
            problems.push("query.max_attempts must be at least 1".to_string());
        }
        if self.query.timeout_ms == 0 {
            problems.push("query.timeout_ms must be positive".to_string());
        }
        if self.evaluate_timeout_ms == 0 {
            problems.push("evaluate_timeout_ms must be positive".to_string());
        }

        if self.peers.is_empty() {
            problems.push("no peers configured".to_string());
        }
        let mut seen = HashSet::new();
        for peer in &self.peers {
            if peer.name.trim().is_empty() {
                problems.push(format!("peer with url {} has no name", peer.url));
            } else if !seen.insert(peer.name.as_str()) {
                problems.push(format!("duplicate peer name {}", peer.name));
            }
            if peer.url.trim().is_empty() {
                problems.push(format!("peer {} has no url", peer.name));
            }
            if check_files {
                if let Some(ca) = &peer.tls_ca_cert {
                    if !ca.exists() {
                        problems.push(format!(
                            "peer {}: TLS CA file {} not found",
                            peer.name,
                            ca.display()
                        ));
                    }
                }
            }
        }
        problems
    }

    pub fn validate(&self, check_files: bool) -> SdkResult<()> {
        let problems = self.problems(check_files);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(SdkError::InvalidConfig(problems))
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.contract.name.as_str())
            .with_write_function(self.contract.write_function.as_str())
            .with_query_function(self.contract.query_function.as_str())
    }

    pub fn peer_handles(&self) -> Vec<PeerHandle> {
        self.peers.iter().map(PeerConfig::to_handle).collect()
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write.timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query.timeout_ms)
    }

    pub fn evaluate_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluate_timeout_ms)
    }

    /// A write request carrying this config's timeout and attempt budget.
    pub fn write_request<I, S>(&self, payload: I) -> WriteRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WriteRequest::new(payload)
            .with_timeout(self.write_timeout())
            .with_max_attempts(self.write.max_attempts)
    }

    /// A query request carrying this config's timeout and attempt budget.
    pub fn query_request(&self, key: impl Into<String>) -> QueryRequest {
        QueryRequest::new(key)
            .with_timeout(self.query_timeout())
            .with_max_attempts(self.query.max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
channel = "registry-channel"

[contract]
name = "registry"

[query]
timeout_ms = 3000

[[peers]]
name = "peer0"
url = "grpcs://localhost:7051"
ssl_target_name_override = "peer0.org1.example.com"

[[peers]]
name = "peer1"
url = "grpcs://localhost:8051"
"#;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = ClientConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.user, "appUser");
        assert_eq!(config.contract.write_function, "introducir");
        assert_eq!(config.contract.query_function, "consultar");
        assert_eq!(config.write, WriteSettings { timeout_ms: 9500, max_attempts: 2 });
        assert_eq!(config.query, QuerySettings { timeout_ms: 3000, max_attempts: 2 });
        assert_eq!(config.evaluate_timeout(), Duration::from_millis(12_500));
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn peers_become_handles() {
        let config = ClientConfig::from_toml_str(SAMPLE).unwrap();
        let handles = config.peer_handles();
        assert_eq!(handles.len(), 2);
        assert_eq!(
            handles[0].tls_host_override.as_deref(),
            Some("peer0.org1.example.com")
        );
        assert_eq!(handles[1].tls_host_override, None);
    }

    #[test]
    fn requests_carry_configured_budgets() {
        let config = ClientConfig::from_toml_str(SAMPLE).unwrap();
        let query = config.query_request("k");
        assert_eq!(query.timeout, Duration::from_millis(3000));
        let write = config.write_request(["a"]);
        assert_eq!(write.timeout, Duration::from_millis(9500));
        assert_eq!(write.max_attempts, 2);
    }

    #[test]
    fn validation_reports_every_problem() {
        let mut config = ClientConfig::new(" ", "registry")
            .with_peer("peer0", "grpcs://a")
            .with_peer("peer0", "");
        config.write.max_attempts = 0;
        config.query.timeout_ms = 0;

        let problems = config.problems(false);
        assert_eq!(problems.len(), 5, "{problems:?}");
        assert!(problems.contains(&"channel name is empty".to_string()));
        assert!(problems.contains(&"duplicate peer name peer0".to_string()));
        assert!(problems.contains(&"peer peer0 has no url".to_string()));

        let err = config.validate(false).unwrap_err();
        assert!(matches!(err, SdkError::InvalidConfig(ref p) if p.len() == 5));
    }

    #[test]
    fn empty_peer_list_is_invalid() {
        let problems = ClientConfig::new("ch", "registry").problems(false);
        assert_eq!(problems, vec!["no peers configured".to_string()]);
    }

    #[test]
    fn tls_files_are_checked_on_request() {
        let mut ca = tempfile::NamedTempFile::new().unwrap();
        writeln!(ca, "-----BEGIN CERTIFICATE-----").unwrap();

        let mut config = ClientConfig::new("ch", "registry")
            .with_peer("peer0", "grpcs://a")
            .with_peer("peer1", "grpcs://b");
        config.peers[0].tls_ca_cert = Some(ca.path().to_path_buf());
        config.peers[1].tls_ca_cert = Some(PathBuf::from("/nonexistent/ca.crt"));

        assert!(config.validate(false).is_ok());
        let problems = config.problems(true);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("peer peer1: TLS CA file"));
    }

    #[test]
    fn load_reads_toml_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chronicle.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.channel, "registry-channel");

        let missing = ClientConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, SdkError::ConfigRead { .. }));

        std::fs::write(&path, "channel = [").unwrap();
        assert!(matches!(
            ClientConfig::load(&path).unwrap_err(),
            SdkError::ConfigParse(_)
        ));
    }
}
