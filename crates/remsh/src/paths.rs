//! Remote path helpers
//!
//! Remote paths are `/`-separated, absolute and case-sensitive. They never touch
//! the local filesystem, so these work on strings rather than `std::path`.

/// Resolve a path relative to the working directory.
///
/// Absolute paths are returned normalized; relative paths are joined to `cwd`
/// first.
///
/// ```ignore
/// assert_eq!(resolve("/docs", "a/../b.txt"), "/docs/b.txt");
/// assert_eq!(resolve("/docs", "/tmp"), "/tmp");
/// ```
pub fn resolve(cwd: &str, path: &str) -> String {
    if path.starts_with('/') {
        normalize(path)
    } else {
        normalize(&format!("{cwd}/{path}"))
    }
}

/// Normalize a path: collapse repeated slashes, drop `.`, apply `..`, strip any
/// trailing slash. Relative input is treated as rooted at `/`.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }

    format!("/{}", parts.join("/"))
}

/// Parent directory of a normalized path. The root has no parent.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last component of a normalized path (empty for the root).
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Join a name onto a normalized directory path.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// True when `path` lies strictly below `dir`.
pub fn is_descendant(path: &str, dir: &str) -> bool {
    if dir == "/" {
        return path != "/";
    }
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("//a///b/"), "/a/b");
        assert_eq!(normalize("/a/./b/../c"), "/a/c");
        assert_eq!(normalize("/.."), "/");
        assert_eq!(normalize("a/b"), "/a/b");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        assert_eq!(resolve("/docs", "report.txt"), "/docs/report.txt");
        assert_eq!(resolve("/docs", "../tmp/x"), "/tmp/x");
        assert_eq!(resolve("/docs", "/abs"), "/abs");
        assert_eq!(resolve("/", "."), "/");
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent("/a/b"), Some("/a"));
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/"), None);
        assert_eq!(file_name("/a/b.txt"), "b.txt");
        assert_eq!(file_name("/"), "");
    }

    #[test]
    fn test_descendant() {
        assert!(is_descendant("/a/b", "/a"));
        assert!(!is_descendant("/ab", "/a"));
        assert!(!is_descendant("/a", "/a"));
        assert!(is_descendant("/a", "/"));
        assert!(!is_descendant("/", "/"));
    }

    #[test]
    fn test_case_sensitive() {
        assert_ne!(normalize("/Docs"), normalize("/docs"));
    }
}
