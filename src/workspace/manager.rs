use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::WorkspaceConfig;
use crate::error::{AppError, Result};
use crate::platform::types::RepoRef;

/// Hands out private working-copy directories under a common base.
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

/// A directory owned by one workflow run.
///
/// The directory and everything in it is removed when this value is dropped,
/// on every exit path, including unwinding.
#[derive(Debug)]
pub struct WorkingCopy {
    path: PathBuf,
}

impl WorkspaceManager {
    pub fn new(config: &WorkspaceConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
        }
    }

    /// Reserve a fresh, not-yet-existing path for a clone of `repo`.
    pub async fn acquire(&self, repo: &RepoRef) -> Result<WorkingCopy> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| AppError::Workspace(format!("Failed to create workspace dir: {e}")))?;

        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f");
        let path = self.base_dir.join(format!(
            "{}__{}__{stamp}__{}",
            repo.organization,
            repo.name,
            std::process::id()
        ));

        // Leftover from a crashed run with the same stamp; start clean.
        if path.exists() {
            force_remove(&path)
                .map_err(|e| AppError::Workspace(format!("Failed to clean workspace: {e}")))?;
        }

        Ok(WorkingCopy { path })
    }
}

impl WorkingCopy {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkingCopy {
    fn drop(&mut self) {
        match force_remove(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed working copy"),
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove working copy"
            ),
        }
    }
}

/// Remove a directory tree, clearing read-only permissions that block removal.
pub fn force_remove(path: &Path) -> std::io::Result<()> {
    if std::fs::symlink_metadata(path).is_err() {
        return Ok(());
    }

    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(first) => {
            tracing::debug!(
                path = %path.display(),
                error = %first,
                "Retrying removal after clearing read-only bits"
            );
            make_writable(path);
            std::fs::remove_dir_all(path)
        }
    }
}

fn make_writable(root: &Path) {
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if entry.path_is_symlink() {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            let mut perms = meta.permissions();
            set_owner_writable(&mut perms, meta.is_dir());
            let _ = std::fs::set_permissions(entry.path(), perms);
        }
    }
}

#[cfg(unix)]
fn set_owner_writable(perms: &mut std::fs::Permissions, is_dir: bool) {
    use std::os::unix::fs::PermissionsExt;

    let extra = if is_dir { 0o700 } else { 0o600 };
    perms.set_mode(perms.mode() | extra);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn set_owner_writable(perms: &mut std::fs::Permissions, _is_dir: bool) {
    perms.set_readonly(false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn repo() -> RepoRef {
        RepoRef::new("acme", "terraform-dns")
    }

    #[tokio::test]
    async fn test_acquire_reserves_unique_paths_under_base() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(&WorkspaceConfig {
            base_dir: tmp.path().join("ws"),
        });

        let a = manager.acquire(&repo()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let b = manager.acquire(&repo()).await.unwrap();

        assert!(a.path().starts_with(tmp.path().join("ws")));
        assert!(!a.path().exists());
        assert_ne!(a.path(), b.path());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("acme__terraform-dns__"));
    }

    #[tokio::test]
    async fn test_drop_removes_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(&WorkspaceConfig {
            base_dir: tmp.path().to_path_buf(),
        });

        let copy = manager.acquire(&repo()).await.unwrap();
        let path = copy.path().to_path_buf();
        fs::create_dir_all(path.join("modules/dns")).unwrap();
        fs::write(path.join("modules/dns/main.tf"), "locals {}\n").unwrap();

        drop(copy);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_force_remove_handles_read_only_entries() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("clone");
        let objects = root.join(".git/objects/ab");
        fs::create_dir_all(&objects).unwrap();
        let packed = objects.join("cdef");
        fs::write(&packed, "blob").unwrap();
        fs::set_permissions(&packed, fs::Permissions::from_mode(0o444)).unwrap();
        fs::set_permissions(&objects, fs::Permissions::from_mode(0o555)).unwrap();

        force_remove(&root).unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_force_remove_missing_path_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(force_remove(&tmp.path().join("absent")).is_ok());
    }
}
