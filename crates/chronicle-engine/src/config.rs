use serde::{Deserialize, Serialize};

/// Contract function that stores a record.
pub const DEFAULT_WRITE_FUNCTION: &str = "introducir";
/// Contract function that reads a record back.
pub const DEFAULT_QUERY_FUNCTION: &str = "consultar";

/// Engine-wide defaults applied when a request carries no override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Contract (chaincode) invoked by writes and queries.
    pub contract: String,
    pub write_function: String,
    pub query_function: String,
}

impl EngineConfig {
    pub fn new(contract: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            write_function: DEFAULT_WRITE_FUNCTION.to_string(),
            query_function: DEFAULT_QUERY_FUNCTION.to_string(),
        }
    }

    pub fn with_write_function(mut self, function: impl Into<String>) -> Self {
        self.write_function = function.into();
        self
    }

    pub fn with_query_function(mut self, function: impl Into<String>) -> Self {
        self.query_function = function.into();
        self
    }

    /// Contract targeted by a request, falling back to the default.
    pub fn contract_for<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.contract)
    }
}
