//! Directory objects.

use super::{DirentKind, METADATA_TYPE_DIR, SeafDirent, kind_from_mode};
use crate::error::StoreError;
use crate::obj::{ObjectId, ObjectKind};
use bytes::Buf;
use flate2::read::ZlibDecoder;
use serde::Deserialize;
use tracing::warn;

/// Fixed part of a v0 dirent record: mode (4) + hex id (40) + name_len (4).
const V0_RECORD_FIXED: usize = 48;

/// An immutable directory object.
#[derive(Debug, Clone)]
pub struct SeafDir {
    pub id: ObjectId,
    pub version: u32,
    pub dirents: Vec<SeafDirent>,
}

#[derive(Deserialize)]
struct DirJson {
    dirents: Vec<DirentJson>,
}

#[derive(Deserialize)]
struct DirentJson {
    name: String,
    id: ObjectId,
    mode: u32,
    #[serde(default)]
    mtime: i64,
    #[serde(default)]
    size: i64,
}

impl SeafDir {
    /// The empty directory, produced for the zero id without backend I/O.
    pub fn empty(id: ObjectId, version: u32) -> Self {
        SeafDir {
            id,
            version,
            dirents: Vec::new(),
        }
    }

    /// Decode a directory object in the encoding selected by `version`.
    pub fn decode(id: ObjectId, version: u32, buf: &[u8]) -> Result<Self, StoreError> {
        let dirents = match version {
            0 => parse_dirents_v0(&id, buf)?,
            _ => parse_dirents_v1(&id, buf)?,
        };
        Ok(SeafDir {
            id,
            version,
            dirents,
        })
    }

    /// Byte-exact lookup of a child entry.
    pub fn lookup(&self, name: &str) -> Option<&SeafDirent> {
        self.dirents.iter().find(|d| d.name == name)
    }
}

fn corrupt(id: &ObjectId, reason: impl Into<String>) -> StoreError {
    StoreError::corrupt(ObjectKind::Fs, id, reason)
}

/// v0: uncompressed binary, network byte order.
fn parse_dirents_v0(id: &ObjectId, buf: &[u8]) -> Result<Vec<SeafDirent>, StoreError> {
    let mut cur = buf;
    if cur.remaining() < 4 {
        return Err(corrupt(id, "truncated header"));
    }
    let magic = cur.get_i32();
    if magic != METADATA_TYPE_DIR {
        return Err(corrupt(id, format!("bad magic {magic}")));
    }

    let mut dirents = Vec::new();
    while cur.remaining() >= V0_RECORD_FIXED {
        let mode = cur.get_u32();
        let mut hex_id = [0u8; 40];
        cur.copy_to_slice(&mut hex_id);
        let entry_id = std::str::from_utf8(&hex_id)
            .ok()
            .and_then(|s| ObjectId::parse(s).ok())
            .ok_or_else(|| corrupt(id, "entry id is not hex"))?;
        let name_len = cur.get_i32();
        let name_len = usize::try_from(name_len).map_err(|_| corrupt(id, "negative name length"))?;
        if cur.remaining() < name_len {
            return Err(corrupt(id, "entry name extends past object"));
        }
        let mut name = vec![0u8; name_len];
        cur.copy_to_slice(&mut name);
        let name =
            String::from_utf8(name).map_err(|_| corrupt(id, "entry name is not valid UTF-8"))?;

        match kind_from_mode(mode) {
            Some(kind) => dirents.push(SeafDirent::from_v0(name, kind, entry_id)),
            None => warn!(dir = %id, %name, mode, "skipping dirent with unknown mode"),
        }
    }

    Ok(dirents)
}

/// v1: zlib-compressed JSON.
fn parse_dirents_v1(id: &ObjectId, buf: &[u8]) -> Result<Vec<SeafDirent>, StoreError> {
    let decoder = ZlibDecoder::new(buf);
    let parsed: DirJson = serde_json::from_reader(decoder)
        .map_err(|e| corrupt(id, format!("zlib/json decode: {e}")))?;

    let mut dirents = Vec::with_capacity(parsed.dirents.len());
    for entry in parsed.dirents {
        match kind_from_mode(entry.mode) {
            Some(DirentKind::File) => dirents.push(SeafDirent::from_v1(
                entry.name,
                DirentKind::File,
                entry.id,
                entry.mtime,
                entry.size,
            )),
            Some(DirentKind::Dir) => dirents.push(SeafDirent::from_v1(
                entry.name,
                DirentKind::Dir,
                entry.id,
                entry.mtime,
                0,
            )),
            None => {}
        }
    }
    Ok(dirents)
}
