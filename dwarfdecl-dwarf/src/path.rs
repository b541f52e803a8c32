//! Lexical path helpers shared by the loader and the reconstruction engine.
//!
//! Everything here works on `/`-separated strings and never touches the
//! filesystem: the paths come from debugging information of a foreign build
//! and usually do not exist on the machine doing the analysis.

use std::path::{Component, Path, PathBuf};

/// Resolve directory string from DWARF directory index.
pub(crate) fn directory_from_index<T: AsRef<str>>(
    dwarf_version: u16,
    comp_dir: &str,
    directories: &[T],
    directory_index: u64,
) -> String {
    let resolve_relative = |entry: &str| {
        if entry.is_empty() {
            comp_dir.trim().to_string()
        } else if Path::new(entry).is_absolute() || comp_dir.trim().is_empty() {
            entry.to_string()
        } else {
            join_paths(comp_dir.trim(), entry)
        }
    };

    // DWARF 5 stores the compilation directory as entry 0; older versions
    // keep it implicit and start the table at index 1.
    let slot = if dwarf_version >= 5 {
        Some(directory_index as usize)
    } else {
        directory_index.checked_sub(1).map(|idx| idx as usize)
    };

    match slot.and_then(|idx| directories.get(idx)) {
        Some(value) => resolve_relative(value.as_ref()),
        None => {
            if slot.is_some() {
                tracing::debug!(
                    "directory_from_index fallback (DWARF v{}): dir_index={}, comp_dir='{}'",
                    dwarf_version,
                    directory_index,
                    comp_dir
                );
            }
            comp_dir.to_string()
        }
    }
}

/// Join directory and filename into a normalized path (no filesystem checks).
pub fn join_paths(left: &str, right: &str) -> String {
    if right.starts_with('/') || left.is_empty() {
        return normalize(right);
    }
    normalize(&format!("{}/{}", left.trim_end_matches('/'), right))
}

/// Resolve a full file path using DWARF directory information.
pub(crate) fn resolve_file_path<T: AsRef<str>>(
    dwarf_version: u16,
    comp_dir: &str,
    directories: &[T],
    directory_index: u64,
    filename: &str,
) -> String {
    if filename.is_empty() {
        return String::new();
    }

    if Path::new(filename).is_absolute() {
        return normalize(filename);
    }

    let directory = directory_from_index(dwarf_version, comp_dir, directories, directory_index);

    if directory.is_empty() {
        normalize(filename)
    } else {
        join_paths(&directory, filename)
    }
}

/// Lexically normalize a path: backslashes become `/`, `.` segments and
/// duplicate separators disappear, and `..` cancels the preceding segment.
///
/// A `..` that would climb above the root of an absolute path is dropped,
/// while leading `..` segments of a relative path are kept.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    if path.is_empty() {
        return String::new();
    }

    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Longest common leading sequence of path components.
///
/// Returns an empty string when the paths cannot share a prefix (one is
/// absolute and the other relative) or when nothing is shared between two
/// relative paths.
pub fn common_path(left: &str, right: &str) -> String {
    let left = normalize(left);
    let right = normalize(right);
    if left.is_empty() || right.is_empty() {
        return String::new();
    }
    let absolute = left.starts_with('/');
    if absolute != right.starts_with('/') {
        return String::new();
    }

    let shared: Vec<&str> = left
        .split('/')
        .filter(|s| !s.is_empty())
        .zip(right.split('/').filter(|s| !s.is_empty()))
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a)
        .collect();

    let joined = shared.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Express `path` relative to `base`, inserting `..` segments where `path`
/// lies outside of `base`.
///
/// Returns `None` when one path is absolute and the other is not.
pub fn relative_to(path: &str, base: &str) -> Option<String> {
    let path = normalize(path);
    let base = normalize(base);
    if path.starts_with('/') != base.starts_with('/') {
        return None;
    }

    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    let base_parts: Vec<&str> = base.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    let shared = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; base_parts.len() - shared];
    parts.extend_from_slice(&path_parts[shared..]);
    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}

/// Whether a relative path produced by [`relative_to`] leaves its base.
pub fn escapes_base(relative: &str) -> bool {
    relative == ".." || relative.starts_with("../")
}

/// Turn a relative output path into a native path under `root`.
pub fn under_root(root: &Path, relative: &str) -> PathBuf {
    let mut buf = root.to_path_buf();
    for comp in Path::new(relative).components() {
        match comp {
            Component::Normal(part) => buf.push(part),
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a/b/../c/./d.h"), "/a/c/d.h");
        assert_eq!(normalize("C:\\src\\foo.h"), "C:/src/foo.h");
        assert_eq!(normalize("/../x"), "/x");
        assert_eq!(normalize("../x/../../y"), "../../y");
        assert_eq!(normalize("a/.."), ".");
        assert_eq!(normalize("//a//b/"), "/a/b");
    }

    #[test]
    fn test_directory_from_index_versions() {
        let dirs = vec!["/usr/include", "include"];
        // DWARF 4 is 1-based with index 0 meaning the compilation directory
        assert_eq!(directory_from_index(4, "/build", &dirs, 0), "/build");
        assert_eq!(directory_from_index(4, "/build", &dirs, 1), "/usr/include");
        assert_eq!(directory_from_index(4, "/build", &dirs, 2), "/build/include");
        // DWARF 5 is 0-based
        assert_eq!(directory_from_index(5, "/build", &dirs, 0), "/usr/include");
        assert_eq!(directory_from_index(5, "/build", &dirs, 7), "/build");
    }

    #[test]
    fn test_resolve_file_path() {
        let dirs = vec!["src"];
        assert_eq!(
            resolve_file_path(4, "/build", &dirs, 1, "../include/foo.h"),
            "/build/include/foo.h"
        );
        assert_eq!(resolve_file_path(4, "/build", &dirs, 1, "/abs/x.h"), "/abs/x.h");
        assert_eq!(resolve_file_path(4, "/build", &dirs, 1, ""), "");
    }

    #[test]
    fn test_common_path() {
        assert_eq!(common_path("/src/proj/a.cpp", "/src/proj"), "/src/proj");
        assert_eq!(common_path("/src/proj", "/src/other"), "/src");
        assert_eq!(common_path("/a", "/b"), "/");
        assert_eq!(common_path("rel/a", "/abs"), "");
        assert_eq!(common_path("", "/abs"), "");
        // Component-wise, not character-wise
        assert_eq!(common_path("/src/projA", "/src/projB"), "/src");
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(relative_to("/src/proj/a/b.h", "/src/proj").as_deref(), Some("a/b.h"));
        assert_eq!(
            relative_to("/usr/include/stdio.h", "/src/proj").as_deref(),
            Some("../../usr/include/stdio.h")
        );
        assert_eq!(relative_to("/src/proj", "/src/proj").as_deref(), Some("."));
        assert_eq!(relative_to("/a/b.h", "/").as_deref(), Some("a/b.h"));
        assert_eq!(relative_to("a/b.h", "/src"), None);
        assert!(escapes_base("../x.h"));
        assert!(!escapes_base("..x/y.h"));
    }

    #[test]
    fn test_under_root() {
        let root = Path::new("/tmp/out");
        assert_eq!(under_root(root, "a/b.h"), PathBuf::from("/tmp/out/a/b.h"));
        assert_eq!(under_root(root, "./a/../b.h"), PathBuf::from("/tmp/out/a/b.h"));
    }
}
