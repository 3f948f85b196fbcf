//! File objects.

use super::METADATA_TYPE_FILE;
use crate::error::StoreError;
use crate::obj::{ObjectId, ObjectKind};
use bytes::Buf;
use flate2::read::ZlibDecoder;
use serde::Deserialize;

/// An immutable file object: a size and the ordered ids of its blocks.
#[derive(Debug, Clone)]
pub struct SeafFile {
    pub id: ObjectId,
    pub version: u32,
    pub size: u64,
    pub block_ids: Vec<ObjectId>,
}

#[derive(Deserialize)]
struct FileJson {
    size: u64,
    #[serde(default)]
    block_ids: Vec<ObjectId>,
}

impl SeafFile {
    /// The empty file, produced for the zero id without backend I/O.
    pub fn empty(id: ObjectId, version: u32) -> Self {
        SeafFile {
            id,
            version,
            size: 0,
            block_ids: Vec::new(),
        }
    }

    pub fn decode(id: ObjectId, version: u32, buf: &[u8]) -> Result<Self, StoreError> {
        match version {
            0 => Self::decode_v0(id, buf),
            _ => Self::decode_v1(id, buf),
        }
    }

    /// v0: big-endian `{i32 magic, i64 size}` then raw 20-byte block hashes.
    fn decode_v0(id: ObjectId, buf: &[u8]) -> Result<Self, StoreError> {
        let mut cur = buf;
        if cur.remaining() < 12 {
            return Err(corrupt(&id, "truncated header"));
        }
        let magic = cur.get_i32();
        if magic != METADATA_TYPE_FILE {
            return Err(corrupt(&id, format!("bad magic {magic}")));
        }
        let size = cur.get_i64();
        let size = u64::try_from(size).map_err(|_| corrupt(&id, "negative size"))?;

        let mut block_ids = Vec::new();
        while cur.remaining() >= 20 {
            let mut raw = [0u8; 20];
            cur.copy_to_slice(&mut raw);
            // Block ids are stored raw in v0 and addressed as hex everywhere
            // else.
            let block_id = ObjectId::parse(&hex::encode(raw))
                .map_err(|_| corrupt(&id, "unrepresentable block id"))?;
            block_ids.push(block_id);
        }

        Ok(SeafFile {
            id,
            version: 0,
            size,
            block_ids,
        })
    }

    /// v1: zlib-compressed JSON.
    fn decode_v1(id: ObjectId, buf: &[u8]) -> Result<Self, StoreError> {
        let decoder = ZlibDecoder::new(buf);
        let parsed: FileJson = serde_json::from_reader(decoder)
            .map_err(|e| corrupt(&id, format!("zlib/json decode: {e}")))?;
        Ok(SeafFile {
            id,
            version: 1,
            size: parsed.size,
            block_ids: parsed.block_ids,
        })
    }
}

fn corrupt(id: &ObjectId, reason: impl Into<String>) -> StoreError {
    StoreError::corrupt(ObjectKind::Fs, id, reason)
}
