//! Shared testing utilities for repostore CLI tests.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const OWNER: &str = "octo";
pub const REPO: &str = "vault";

/// Isolated working directory plus a mock GitHub API server.
#[allow(dead_code)]
pub struct TestContext {
    root: TempDir,
    pub server: mockito::ServerGuard,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        let server = mockito::Server::new();
        Self { root, server }
    }

    pub fn work_dir(&self) -> &Path {
        self.root.path()
    }

    /// Build a command for the compiled `repostore` binary pointed at the mock server.
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("repostore").expect("Failed to locate repostore binary");
        cmd.current_dir(self.work_dir())
            .env("GITHUB_TOKEN", "test-token")
            .env("GITHUB_API_URL", self.server.url())
            .env("REPO_OWNER", OWNER)
            .env("FILE_STORAGE_REPO", REPO)
            .env_remove("FILE_STORAGE_PATH")
            .env_remove("FILE_STORAGE_BRANCH")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Write a local file into the working directory.
    pub fn write_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.work_dir().join(name);
        fs::write(&path, bytes).expect("Failed to write test file");
        path
    }

    /// API path of a contents endpoint for the test repository.
    pub fn contents_path(path: &str) -> String {
        format!("/repos/{}/{}/contents/{}", OWNER, REPO, path)
    }
}
