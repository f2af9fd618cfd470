//! src/services/asset_service.rs
//!
//! AssetService: binary uploads stored as fixed-size chunks in SQLite.
//!
//! An upload is written in three steps: a `pending` metadata row, the chunks
//! in sequence order, then finalization to `complete` with the length, chunk
//! count and MD5. Readers only ever see `complete` rows, so an interrupted
//! upload is never served. Retrieval hands back a lazy stream that fetches one
//! chunk per poll.

use crate::{
    db::with_retry,
    models::asset::{AssetChunk, AssetMetadata, AssetState, AssetUpload},
};
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use futures::{Stream, StreamExt, pin_mut, stream::BoxStream};
use md5::Context;
use sqlx::SqlitePool;
use std::{io, path::Path, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset `{0}` not found")]
    NotFound(String),
    #[error("asset `{id}` is corrupt: {detail}")]
    CorruptAsset { id: Uuid, detail: String },
    #[error("upload stream failed: {0}")]
    Upload(#[source] io::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type AssetResult<T> = Result<T, AssetError>;

/// Lazy, in-order sequence of an asset's chunks. Not seekable; restart by
/// retrieving again. Dropping it stops all further reads.
pub type AssetStream = BoxStream<'static, AssetResult<Bytes>>;

const ASSET_COLUMNS: &str = "id, filename, original_name, field_name, status, content_type, \
     length, chunk_size, chunk_count, md5, bucket, state, created_at";

/// AssetService provides the chunked blob operations:
/// - Store an upload stream as ordered chunks plus one metadata row
/// - Retrieve metadata and a lazy chunk stream
/// - Delete an asset with all its chunks
/// - Sweep abandoned and unreferenced assets
#[derive(Clone)]
pub struct AssetService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    /// Maximum bytes per chunk.
    chunk_size: usize,

    /// Bucket name recorded on new assets.
    bucket: String,

    /// Attempts for idempotent chunk reads and writes.
    retries: u32,
}

impl AssetService {
    pub fn new(db: Arc<SqlitePool>, chunk_size: usize, bucket: impl Into<String>, retries: u32) -> Self {
        Self {
            db,
            chunk_size: chunk_size.max(1),
            bucket: bucket.into(),
            retries,
        }
    }

    /// Stream an upload into chunks and return its finalized metadata.
    ///
    /// On any failure the pending row and whatever chunks were written are
    /// removed before the error is returned.
    pub async fn store_asset<S>(&self, upload: AssetUpload, stream: S) -> AssetResult<AssetMetadata>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let id = Uuid::new_v4();
        let filename = generated_filename(&upload.original_name);

        sqlx::query(
            "INSERT INTO assets (
                id, filename, original_name, field_name, status, content_type,
                length, chunk_size, chunk_count, md5, bucket, state, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, 0, ?, 0, NULL, ?, ?, ?)",
        )
        .bind(id)
        .bind(&filename)
        .bind(&upload.original_name)
        .bind(&upload.field_name)
        .bind(&upload.status)
        .bind(&upload.content_type)
        .bind(self.chunk_size as i64)
        .bind(&self.bucket)
        .bind(AssetState::Pending)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;

        let reader = StreamReader::new(stream);
        pin_mut!(reader);

        match self.write_chunks(id, ChunkReader::new(reader, self.chunk_size)).await {
            Ok(meta) => {
                info!(
                    %id,
                    filename = %meta.filename,
                    length = meta.length,
                    chunks = meta.chunk_count,
                    "asset stored"
                );
                Ok(meta)
            }
            Err(err) => {
                warn!(%id, error = %err, "asset upload aborted, discarding partial data");
                if let Err(cleanup) = self.remove(id).await {
                    warn!(%id, error = %cleanup, "could not discard partial asset; sweep will reclaim it");
                }
                Err(err)
            }
        }
    }

    async fn write_chunks<R>(&self, id: Uuid, mut chunks: ChunkReader<R>) -> AssetResult<AssetMetadata>
    where
        R: AsyncRead + Unpin,
    {
        let mut digest = Context::new();
        let mut length: i64 = 0;
        let mut n: i64 = 0;

        while let Some(chunk) = chunks.next_chunk().await.map_err(AssetError::Upload)? {
            digest.consume(&chunk);
            length += chunk.len() as i64;

            with_retry(self.retries, "chunk write", || {
                sqlx::query("INSERT OR REPLACE INTO asset_chunks (asset_id, n, data) VALUES (?, ?, ?)")
                    .bind(id)
                    .bind(n)
                    .bind(chunk.as_ref())
                    .execute(&*self.db)
            })
            .await?;
            debug!(%id, n, size = chunk.len(), "chunk written");
            n += 1;
        }

        let meta = sqlx::query_as::<_, AssetMetadata>(&format!(
            "UPDATE assets SET length = ?, chunk_count = ?, md5 = ?, state = ?
             WHERE id = ? AND state = ?
             RETURNING {}",
            ASSET_COLUMNS
        ))
        .bind(length)
        .bind(n)
        .bind(format!("{:x}", digest.compute()))
        .bind(AssetState::Complete)
        .bind(id)
        .bind(AssetState::Pending)
        .fetch_optional(&*self.db)
        .await?;

        meta.ok_or_else(|| AssetError::NotFound(id.to_string()))
    }

    /// Metadata of a complete asset.
    pub async fn get_metadata(&self, id: Uuid) -> AssetResult<AssetMetadata> {
        sqlx::query_as::<_, AssetMetadata>(&format!(
            "SELECT {} FROM assets WHERE id = ? AND state = ?",
            ASSET_COLUMNS
        ))
        .bind(id)
        .bind(AssetState::Complete)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| AssetError::NotFound(id.to_string()))
    }

    /// Metadata plus a lazy stream reproducing the original bytes.
    ///
    /// The chunk set is verified up front: indices must be exactly
    /// `0..chunk_count` and their sizes must add up to `length`.
    pub async fn retrieve_asset(&self, id: Uuid) -> AssetResult<(AssetMetadata, AssetStream)> {
        let meta = self.get_metadata(id).await?;

        let sizes: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT n, length(data) FROM asset_chunks WHERE asset_id = ? ORDER BY n ASC",
        )
        .bind(id)
        .fetch_all(&*self.db)
        .await?;
        verify_chunks(&meta, &sizes)?;

        let stream = chunk_stream(self.db.clone(), id, meta.chunk_count, self.retries);
        Ok((meta, stream))
    }

    /// Remove an asset and all its chunks.
    pub async fn delete_asset(&self, id: Uuid) -> AssetResult<AssetMetadata> {
        let meta = self.get_metadata(id).await?;
        if !self.remove(id).await? {
            return Err(AssetError::NotFound(id.to_string()));
        }
        info!(%id, filename = %meta.filename, "asset deleted");
        Ok(meta)
    }

    /// Delete chunks and metadata in one transaction, whatever the state.
    async fn remove(&self, id: Uuid) -> AssetResult<bool> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM asset_chunks WHERE asset_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM assets WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove pending uploads and unlinked complete assets older than `grace`.
    /// Returns how many assets were removed.
    pub async fn sweep_orphans(&self, grace: Duration) -> AssetResult<u64> {
        let grace = ChronoDuration::from_std(grace).unwrap_or(ChronoDuration::MAX);
        let cutoff = Utc::now().checked_sub_signed(grace).unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        let stale = sqlx::query_scalar::<_, Uuid>(
            "SELECT a.id FROM assets a
             WHERE a.created_at < ?
               AND (a.state = ? OR NOT EXISTS (SELECT 1 FROM items i WHERE i.asset_id = a.id))",
        )
        .bind(cutoff)
        .bind(AssetState::Pending)
        .fetch_all(&*self.db)
        .await?;

        let mut removed = 0;
        for id in stale {
            if self.remove(id).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            warn!(removed, "swept orphaned assets");
        }
        Ok(removed)
    }
}

/// Splits an async reader into `chunk_size` pieces; only the last may be
/// shorter.
pub struct ChunkReader<R> {
    reader: R,
    chunk_size: usize,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Next full chunk, a short final chunk, or `None` at end of input.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buf = Vec::with_capacity(self.chunk_size);
        (&mut self.reader)
            .take(self.chunk_size as u64)
            .read_to_end(&mut buf)
            .await?;
        if buf.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Bytes::from(buf)))
        }
    }
}

/// Random hex name that keeps the original extension, e.g. `3f9c...e1.jpg`.
fn generated_filename(original: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    match Path::new(original).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", token, ext),
        _ => token,
    }
}

fn verify_chunks(meta: &AssetMetadata, sizes: &[(i64, i64)]) -> AssetResult<()> {
    let corrupt = |detail: String| AssetError::CorruptAsset { id: meta.id, detail };

    if sizes.len() as i64 != meta.chunk_count {
        return Err(corrupt(format!(
            "expected {} chunks, found {}",
            meta.chunk_count,
            sizes.len()
        )));
    }
    for (expected, (n, _)) in sizes.iter().enumerate() {
        if *n != expected as i64 {
            return Err(corrupt(format!("chunk {} is missing", expected)));
        }
    }
    let total: i64 = sizes.iter().map(|(_, size)| size).sum();
    if total != meta.length {
        return Err(corrupt(format!(
            "chunks hold {} bytes, metadata declares {}",
            total, meta.length
        )));
    }
    Ok(())
}

/// Pull-driven chunk stream: chunk `n` is only read when the consumer polls
/// for it.
fn chunk_stream(db: Arc<SqlitePool>, id: Uuid, chunk_count: i64, retries: u32) -> AssetStream {
    futures::stream::try_unfold(0i64, move |n| {
        let db = db.clone();
        async move {
            if n >= chunk_count {
                return Ok(None);
            }
            let data = read_chunk(&db, id, n, retries).await?;
            Ok::<_, AssetError>(Some((data, n + 1)))
        }
    })
    .boxed()
}

async fn read_chunk(db: &SqlitePool, id: Uuid, n: i64, retries: u32) -> AssetResult<Bytes> {
    let chunk = with_retry(retries, "chunk read", || {
        sqlx::query_as::<_, AssetChunk>(
            "SELECT asset_id, n, data FROM asset_chunks WHERE asset_id = ? AND n = ?",
        )
        .bind(id)
        .bind(n)
        .fetch_optional(db)
    })
    .await?
    .ok_or_else(|| AssetError::CorruptAsset {
        id,
        detail: format!("chunk {} vanished during read", n),
    })?;
    Ok(Bytes::from(chunk.data))
}
