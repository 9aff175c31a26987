use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Directories that never hold configuration we own.
const SKIPPED_DIRS: &[&str] = &[".git", ".terraform"];

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Recursively list files under `root` with the given extension, sorted by path.
pub fn find_config_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == extension))
        .map(|e| e.into_path())
        .collect();

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_finds_nested_files_with_extension() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("env/prod")).unwrap();
        fs::write(tmp.path().join("main.tf"), "").unwrap();
        fs::write(tmp.path().join("env/prod/dns.tf"), "").unwrap();
        fs::write(tmp.path().join("README.md"), "").unwrap();
        fs::write(tmp.path().join("vars.tfvars"), "").unwrap();

        let files = find_config_files(tmp.path(), "tf");
        assert_eq!(
            files,
            vec![tmp.path().join("env/prod/dns.tf"), tmp.path().join("main.tf")]
        );
    }

    #[test]
    fn test_skips_git_and_terraform_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::create_dir_all(tmp.path().join(".terraform/modules/dns")).unwrap();
        fs::write(tmp.path().join(".git/hooks.tf"), "").unwrap();
        fs::write(tmp.path().join(".terraform/modules/dns/main.tf"), "").unwrap();

        assert!(find_config_files(tmp.path(), "tf").is_empty());
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(find_config_files(&tmp.path().join("absent"), "tf").is_empty());
    }
}
