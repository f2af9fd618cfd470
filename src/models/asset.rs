//! Represents a stored binary upload and the fixed-size chunks it is split into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Write state of an asset. Only `Complete` assets are visible to readers.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AssetState {
    /// Metadata written, chunks still arriving.
    Pending,
    /// Every chunk committed and the summary fields are final.
    Complete,
}

/// Descriptor of one stored upload.
///
/// The payload itself lives in `asset_chunks`, keyed by `(asset_id, n)`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub id: Uuid,

    /// Generated, collision-resistant name that keeps the original extension.
    pub filename: String,

    /// Filename supplied by the uploader.
    pub original_name: String,

    /// Multipart field the upload arrived in.
    pub field_name: String,

    /// Free-form status supplied alongside the upload.
    pub status: Option<String>,

    /// MIME type declared by the uploader.
    pub content_type: Option<String>,

    /// Total payload length in bytes.
    pub length: i64,

    /// Maximum byte length of each chunk.
    pub chunk_size: i64,

    /// Number of chunks, `ceil(length / chunk_size)`.
    pub chunk_count: i64,

    /// Hex MD5 of the payload, set on completion.
    pub md5: Option<String>,

    /// Bucket the asset was stored under.
    pub bucket: String,

    pub state: AssetState,

    pub created_at: DateTime<Utc>,
}

/// One fragment of an asset payload.
#[derive(Clone, FromRow, Debug)]
pub struct AssetChunk {
    pub asset_id: Uuid,
    /// 0-based sequence index.
    pub n: i64,
    pub data: Vec<u8>,
}

/// Uploader-supplied descriptors for a new asset.
#[derive(Clone, Debug, Default)]
pub struct AssetUpload {
    pub original_name: String,
    pub field_name: String,
    pub status: Option<String>,
    pub content_type: Option<String>,
}
