//! Project file loader.
//!
//! Materialises a project tree as [`FileRecord`]s for whole-project
//! analysis (dependency graph construction). Respects `.gitignore` and
//! skips hidden entries, binary files, and unreadable files.

use std::path::Path;

use ignore::WalkBuilder;

use crate::models::FileRecord;

use super::DiffError;

/// Load every text file under `root` whose extension is in `extensions`.
///
/// Directories whose name appears in `exclude_dirs` are not descended
/// into. Paths in the returned records are absolute.
pub fn load_files(
    root: &Path,
    extensions: &[String],
    exclude_dirs: &[String],
) -> Result<Vec<FileRecord>, DiffError> {
    if !root.exists() {
        return Err(DiffError::NotFound(root.display().to_string()));
    }
    let root = root.canonicalize().map_err(|source| DiffError::Unreadable {
        path: root.display().to_string(),
        source,
    })?;

    let excluded: Vec<String> = exclude_dirs.to_vec();
    let walker = WalkBuilder::new(&root)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && excluded.iter().any(|d| entry.file_name() == d.as_str()))
        })
        .build();

    let mut records = Vec::new();
    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let matches_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        if !matches_ext {
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => records.push(FileRecord::new(path.to_path_buf(), content)),
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "skipping unreadable file");
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn load_nonexistent_root() {
        let result = load_files(Path::new("/tmp/revlens_does_not_exist_12345"), &exts(&["js"]), &[]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[test]
    fn load_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.js"), "export const a = 1;").unwrap();
        std::fs::write(dir.path().join("b.TS"), "export const b = 2;").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# notes").unwrap();

        let records = load_files(dir.path(), &exts(&["js", "ts"]), &[]).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.path.is_absolute()));
    }

    #[test]
    fn load_skips_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.js"), "require('./lib');").unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules").join("dep.js"), "x").unwrap();

        let records = load_files(dir.path(), &exts(&["js"]), &exts(&["node_modules"])).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].path.ends_with("index.js"));
    }

    #[test]
    fn load_skips_hidden_and_binary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("visible.py"), "print(1)").unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::write(dir.path().join(".hidden").join("secret.py"), "x = 1").unwrap();
        std::fs::write(dir.path().join("blob.py"), [0xFF, 0xFE, 0x00]).unwrap();

        let records = load_files(dir.path(), &exts(&["py"]), &[]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "print(1)");
    }
}
