//! Object ids and kinds.

use crate::error::StoreError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The id of the empty object. Loading it yields an empty buffer without a
/// backend read; as a directory it is the empty directory, as a file the
/// empty file.
pub const ZERO_OBJ_ID: &str = "0000000000000000000000000000000000000000";

/// Storage namespace an object lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commits,
    Fs,
    Blocks,
}

impl ObjectKind {
    /// Directory name used by the filesystem backend layout.
    pub fn dir_name(self) -> &'static str {
        match self {
            ObjectKind::Commits => "commits",
            ObjectKind::Fs => "fs",
            ObjectKind::Blocks => "blocks",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A 40-character lowercase hex content hash.
///
/// Ids are compared byte-exact; no case folding is applied, matching how the
/// store writes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate a 40-hex id.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        if s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(ObjectId(s.to_owned()))
        } else {
            Err(StoreError::MalformedId(s.to_owned()))
        }
    }

    /// The all-zeros id denoting the empty object.
    pub fn zero() -> Self {
        ObjectId(ZERO_OBJ_ID.to_owned())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == ZERO_OBJ_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `n` hex characters, used for path sharding and display suffixes.
    pub fn prefix(&self, n: usize) -> &str {
        &self.0[..n]
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectId::parse(&s).map_err(|_| serde::de::Error::custom("invalid object id"))
    }
}
