//! repostore: a file store backed by a GitHub repository's contents API.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};

use adapters::{HttpContentService, RetryPolicy, RetryingContentService};
use ports::ContentService;

pub use app::FileStore;
pub use domain::{
    BatchPolicy, BatchReport, CancelFlag, ErrorKind, FileEntry, StoreConfig, StoreError,
    UploadFile,
};

/// File store talking to GitHub with bounded retries.
pub type RemoteFileStore = FileStore<RetryingContentService<HttpContentService>>;

/// Build a store from configuration and the `GITHUB_TOKEN` environment variable.
///
/// `config_path` defaults to `repostore.toml` in the working directory, which
/// may be absent. One cancellation flag is shared by the store and its retry
/// layer.
pub fn open_store(config_path: Option<&Path>) -> Result<RemoteFileStore, StoreError> {
    let config = app::config::load_config(config_path)?;
    let http = HttpContentService::from_env(&config.repository, &config.api)?;
    let cancel = CancelFlag::new();
    let service = RetryingContentService::new(http, RetryPolicy::from_config(&config.api))
        .with_cancel_flag(cancel.clone());

    Ok(FileStore::from_config(service, &config)?.with_cancel_flag(cancel))
}

/// Create the container marker if the container does not exist yet.
pub fn init_container<S: ContentService>(store: &FileStore<S>) -> Result<(), StoreError> {
    store.ensure_container_exists()?;
    println!("✅ Container '{}' is ready", store.container());
    Ok(())
}

/// List the stored files.
pub fn list_files<S: ContentService>(store: &FileStore<S>) -> Result<Vec<FileEntry>, StoreError> {
    store.list()
}

/// Upload local files under their leaf names, one at a time.
///
/// Every file is read before the first upload so a missing local file aborts
/// the batch without committing anything. Progress goes to stderr.
pub fn upload_files<S: ContentService>(
    store: &FileStore<S>,
    paths: &[PathBuf],
) -> Result<BatchReport, StoreError> {
    let files = paths.iter().map(|path| read_upload(path)).collect::<Result<Vec<_>, _>>()?;

    let report = store.put_many_with_progress(&files, |progress| {
        eprintln!("[{}/{}] {}", progress.completed, progress.total, progress.name);
    });

    for entry in &report.uploaded {
        println!("✅ Uploaded {} ({} bytes)", entry.path, entry.size);
    }
    for failure in &report.failures {
        println!("❌ {}: {}", failure.name, failure.error);
    }
    for name in &report.skipped {
        println!("⏭️  Skipped {}", name);
    }
    Ok(report)
}

fn read_upload(path: &Path) -> Result<UploadFile, StoreError> {
    let name = path.file_name().and_then(|name| name.to_str()).ok_or_else(|| {
        StoreError::InvalidName {
            name: path.display().to_string(),
            reason: "local path has no UTF-8 file name".to_string(),
        }
    })?;
    let bytes = std::fs::read(path)?;
    Ok(UploadFile::new(name, bytes))
}

/// Delete a stored file by its logical path, e.g. `files/report.pdf`.
pub fn delete_file<S: ContentService>(store: &FileStore<S>, path: &str) -> Result<(), StoreError> {
    store.delete(path)?;
    println!("✅ Deleted {}", path);
    Ok(())
}

/// Login of the account the configured token belongs to.
pub fn whoami<S: ContentService>(store: &FileStore<S>) -> Result<String, StoreError> {
    store.service().authenticated_user()
}
