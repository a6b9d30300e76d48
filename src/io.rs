//! Loading of JSON network descriptions.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    contractionpath::{paths::SearchConfig, LegPath},
    tensornetwork::tensor::Tensor,
};

/// A network as read from a file: the tensors, optionally a contraction
/// sequence to replay and optionally search settings.
///
/// ```json
/// {
///   "tensors": [
///     {"name": "C", "legs": [1, 0], "shape": ["chi", "chi"]},
///     {"name": "T1", "legs": [0, 2, -1], "shape": ["chi", "chi", "D^2"]}
///   ],
///   "sequence": [[1], [0], [2, 3]],
///   "config": {"cost_model": {"memory": "additive"}, "compare": true}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescription {
    pub tensors: Vec<Tensor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<LegPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SearchConfig>,
}

#[derive(Error, Debug)]
pub enum IoError {
    #[error("cannot read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid network description")]
    Parse(#[from] serde_json::Error),
}

/// Parses a network description from a JSON string.
///
/// # Examples
/// ```
/// # use tnorder::io::parse_network;
/// let description = parse_network(
///     r#"{"tensors": [{"name": "A", "legs": [-1], "shape": [3]}]}"#,
/// ).unwrap();
/// assert_eq!(description.tensors[0].name(), "A");
/// assert!(description.sequence.is_none());
/// ```
pub fn parse_network(json: &str) -> Result<NetworkDescription, IoError> {
    Ok(serde_json::from_str(json)?)
}

/// Reads a network description from a JSON file.
pub fn load_network(path: impl AsRef<Path>) -> Result<NetworkDescription, IoError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_network(&json)
}
