//! Filesystem helpers for export artefacts built on `cap-std` and `camino`.
//!
//! Every helper resolves a capability directory for the parent of the target
//! and operates on the final component through it, so writes never follow a
//! path outside the directory that was opened.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Create (or truncate) the file at `path`, creating missing parents first.
pub fn create_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_parent(path)?;
    dir.create(name.as_str())
}

/// Open an existing file for reading.
pub fn open_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    let (dir, name) = open_parent(path)?;
    dir.open(name.as_str())
}

/// Return whether `path` exists and is a regular file.
///
/// A missing file or parent reports `Ok(false)`.
pub fn is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = match open_parent(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Ensure the parent directory for `path` exists.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = split_anchor(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)
}

fn open_parent(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Split a directory path into an ambient anchor (root, drive, or `.`) and
/// the remaining relative components.
fn split_anchor(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (anchor, relative) = match std_parent.components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let anchor = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(anchor.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (anchor, relative)
        }
        Some(Component::RootDir) => {
            let anchor = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(anchor.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (anchor, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&anchor, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;
    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::io::{Read, Write};
    use tempfile::TempDir;

    #[fixture]
    fn root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        (dir, path)
    }

    #[rstest]
    fn create_file_builds_missing_parents(root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = root;
        let target = base.join("nested/deeper/export.txt");
        let mut file = create_file(&target).expect("create file");
        file.write_all(b"a|b\n").expect("write");
        drop(file);
        assert!(is_file(&target).expect("inspect file"));
    }

    #[rstest]
    fn create_file_truncates_existing_content(root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = root;
        let target = base.join("export.txt");
        create_file(&target)
            .and_then(|mut file| file.write_all(b"old contents that are long"))
            .expect("first write");
        create_file(&target)
            .and_then(|mut file| file.write_all(b"new"))
            .expect("second write");
        let mut contents = String::new();
        open_file(&target)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .expect("read back");
        assert_eq!(contents, "new");
    }

    #[rstest]
    fn is_file_reports_missing_paths(root: (TempDir, Utf8PathBuf)) {
        let (_guard, base) = root;
        assert!(!is_file(&base.join("absent.txt")).expect("inspect"));
        assert!(!is_file(&base.join("absent/child.txt")).expect("inspect"));
        assert!(!is_file(&base).expect("directories are not files"));
    }
}
