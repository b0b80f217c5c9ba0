//! Photo administration: upload, move, duplicate and delete.

use serde::Serialize;
use tracing::info;

use crate::datetime::Clock;
use crate::folder::FolderId;
use crate::storage::ObjectStore;
use crate::{FolioError, Result};

/// Default upload ceiling (25 MiB).
pub const DEFAULT_MAX_PHOTO_SIZE: u64 = 25 * 1024 * 1024;

/// Keys touched by a copy-style operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoTransfer {
    pub source_key: String,
    pub destination_key: String,
}

/// Object-store operations on individual photos.
pub struct PhotoService<'a> {
    store: &'a dyn ObjectStore,
    clock: &'a dyn Clock,
    max_size: u64,
}

impl<'a> PhotoService<'a> {
    pub fn new(store: &'a dyn ObjectStore, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            clock,
            max_size: DEFAULT_MAX_PHOTO_SIZE,
        }
    }

    /// Set the upload ceiling in bytes.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Store a photo directly under `folder_id`.
    ///
    /// The content type is guessed from the file extension. Returns the
    /// object key.
    pub async fn upload(
        &self,
        folder_id: &FolderId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let file_name = validate_file_name(file_name)?;
        if bytes.is_empty() {
            return Err(FolioError::InvalidArgument("image is empty".to_string()));
        }
        if bytes.len() as u64 > self.max_size {
            return Err(FolioError::InvalidArgument(format!(
                "image exceeds {} bytes",
                self.max_size
            )));
        }

        let content_type = mime_guess::from_path(file_name).first_or_octet_stream();
        let key = folder_id.child_key(file_name);
        let size = bytes.len();
        self.store.put(&key, bytes, content_type.essence_str()).await?;

        info!(folder_id = %folder_id, size, "Photo uploaded");
        Ok(key)
    }

    /// Move a photo into another folder, keeping its file name.
    pub async fn move_photo(
        &self,
        source_key: &str,
        destination: &FolderId,
    ) -> Result<PhotoTransfer> {
        let (source_key, file_name) = split_source_key(source_key)?;
        let destination_key = destination.child_key(file_name);

        if destination_key != source_key {
            self.store.copy(source_key, &destination_key).await?;
            self.store.delete(source_key).await?;
            info!(destination = %destination, "Photo moved");
        }

        Ok(PhotoTransfer {
            source_key: source_key.to_string(),
            destination_key,
        })
    }

    /// Copy a photo into a folder.
    ///
    /// Without a destination name the copy is called
    /// `<base>-copy-<epoch millis><ext>`.
    pub async fn duplicate_photo(
        &self,
        source_key: &str,
        destination: &FolderId,
        destination_name: Option<&str>,
    ) -> Result<PhotoTransfer> {
        let (source_key, file_name) = split_source_key(source_key)?;

        let destination_name = match destination_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => validate_file_name(name)?.to_string(),
            None => duplicate_file_name(file_name, self.clock.now_millis()),
        };
        let destination_key = destination.child_key(&destination_name);

        self.store.copy(source_key, &destination_key).await?;
        info!(destination = %destination, "Photo duplicated");

        Ok(PhotoTransfer {
            source_key: source_key.to_string(),
            destination_key,
        })
    }

    /// Delete a photo by key.
    pub async fn delete_photo(&self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(FolioError::InvalidArgument("key is required".to_string()));
        }
        self.store.delete(key).await
    }
}

/// Name for a duplicate of `file_name` made at `millis`.
///
/// A leading dot does not start an extension, so `.hidden` keeps its name.
pub fn duplicate_file_name(file_name: &str, millis: i64) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => {
            let (base, ext) = file_name.split_at(dot);
            format!("{base}-copy-{millis}{ext}")
        }
        _ => format!("{file_name}-copy-{millis}"),
    }
}

fn split_source_key(source_key: &str) -> Result<(&str, &str)> {
    let source_key = source_key.trim();
    if source_key.is_empty() {
        return Err(FolioError::InvalidArgument(
            "sourceKey is required".to_string(),
        ));
    }
    let file_name = source_key.rsplit('/').next().unwrap_or_default();
    if file_name.is_empty() {
        return Err(FolioError::InvalidArgument("invalid sourceKey".to_string()));
    }
    Ok((source_key, file_name))
}

fn validate_file_name(file_name: &str) -> Result<&str> {
    let file_name = file_name.trim();
    if file_name.is_empty() {
        return Err(FolioError::InvalidArgument("file name is required".to_string()));
    }
    if file_name.contains('/') || file_name == "." || file_name == ".." {
        return Err(FolioError::InvalidArgument("invalid file name".to_string()));
    }
    Ok(file_name)
}
