//! Content hashing for package nodes.
//!
//! Leaf files are hashed with BLAKE3 and stored as lowercase hex. Directories are never
//! hashed; they carry the [`NodeHash::Directory`] sentinel instead, which serializes as the
//! reserved string `"DIRECTORY"`.

use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WatchError;

/// Reserved serialized value marking a directory node.
pub const DIRECTORY_SENTINEL: &str = "DIRECTORY";

/// Digest of a node, or the directory marker.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeHash {
    Directory,
    Content(String),
}

impl NodeHash {
    /// Hash arbitrary bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        NodeHash::Content(blake3::hash(data).to_hex().to_string())
    }

    /// Hash a file by path, streaming it in 64 KiB blocks.
    pub fn from_file(path: &Path) -> Result<Self, WatchError> {
        let mut file = std::fs::File::open(path).map_err(WatchError::io(path))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = [0u8; 64 * 1024];

        loop {
            let bytes_read = file.read(&mut buffer).map_err(WatchError::io(path))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(NodeHash::Content(hasher.finalize().to_hex().to_string()))
    }

    /// Hashes `path`, or returns the directory sentinel when it is a directory.
    pub fn of_path(path: &Path) -> Result<Self, WatchError> {
        if path.is_dir() {
            Ok(NodeHash::Directory)
        } else {
            Self::from_file(path)
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, NodeHash::Directory)
    }

    /// The hex digest, or `None` for directories.
    pub fn digest(&self) -> Option<&str> {
        match self {
            NodeHash::Directory => None,
            NodeHash::Content(hex) => Some(hex),
        }
    }
}

impl From<String> for NodeHash {
    fn from(value: String) -> Self {
        if value == DIRECTORY_SENTINEL {
            NodeHash::Directory
        } else {
            NodeHash::Content(value)
        }
    }
}

impl From<NodeHash> for String {
    fn from(value: NodeHash) -> Self {
        match value {
            NodeHash::Directory => DIRECTORY_SENTINEL.to_string(),
            NodeHash::Content(hex) => hex,
        }
    }
}

impl fmt::Debug for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeHash::Directory => write!(f, "NodeHash(DIRECTORY)"),
            NodeHash::Content(hex) => write!(f, "NodeHash({})", hex.get(..16).unwrap_or(hex)),
        }
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeHash::Directory => f.write_str(DIRECTORY_SENTINEL),
            NodeHash::Content(hex) => f.write_str(hex),
        }
    }
}
