//! Folders: sanitized ids and the folder table.

mod id;
mod repository;

pub use id::FolderId;
pub use repository::{Folder, FolderRepository, NewFolder};
