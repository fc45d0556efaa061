use common::{CrustyError, QueryResultType};
use serde::Deserialize;

use std::fs;
use std::path::Path;

/// How query results are printed. Read from the JSON file passed with `--config`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    /// Print the output schema's names before the tuples.
    pub header: bool,
    /// `csv` or `width`.
    pub format: String,
    /// Column width for the `width` format when every output column is unnamed.
    pub width: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            header: true,
            format: "csv".to_string(),
            width: 10,
        }
    }
}

impl CliConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CrustyError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn result_type(&self) -> Result<QueryResultType, CrustyError> {
        match self.format.to_lowercase().as_str() {
            "csv" => Ok(QueryResultType::CSV(self.header)),
            "width" => Ok(QueryResultType::WIDTH(self.header, self.width)),
            other => Err(CrustyError::ValidationError(format!(
                "unknown output format {:?}",
                other
            ))),
        }
    }
}
