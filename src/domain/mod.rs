pub mod batch;
pub mod cancel;
pub mod config;
pub mod container;
pub mod error;
pub mod file_entry;
pub mod file_name;

pub use batch::{BatchFailure, BatchPolicy, BatchProgress, BatchReport, UploadFile};
pub use cancel::CancelFlag;
pub use config::{CommitterConfig, RemoteApiConfig, RepositoryConfig, StoreConfig, UploadConfig};
pub use container::{ContainerPath, MARKER_NAME};
pub use error::{ErrorKind, StoreError};
pub use file_entry::FileEntry;
pub use file_name::FileName;
