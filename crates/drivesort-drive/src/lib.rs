//! Storage layer: the `Storage` capability, a Google Drive v3 implementation,
//! the dry-run wrapper, folder resolution, and content extraction.

pub mod content;
pub mod dry_run;
mod error;
pub mod folders;
pub mod storage;
pub mod types;

#[cfg(feature = "http")]
pub mod drive;
#[cfg(feature = "http")]
pub mod token;

#[cfg(test)]
mod testing;

pub use content::{ContentKind, acquire_text, decode_text, extract_pdf_text, read_local_text};
pub use dry_run::{DryRunStorage, PlannedMove};
pub use error::DriveError;
pub use folders::FolderResolver;
pub use storage::Storage;
pub use types::DriveFile;

#[cfg(feature = "http")]
pub use drive::GoogleDrive;
