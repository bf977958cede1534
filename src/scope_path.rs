use std::path::Path;

pub fn normalize(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }
    normalized
}

pub fn normalize_path(path: &Path) -> String {
    normalize(&path.to_string_lossy())
}

/// Parent directory of a normalized path, or `None` at a filesystem root.
pub fn parent_of(path: &str) -> Option<String> {
    let normalized = normalize(path);
    let idx = normalized.rfind('/')?;
    if idx == 0 {
        if normalized.len() > 1 {
            return Some("/".to_string());
        }
        return None;
    }
    Some(normalized[..idx].to_string())
}

/// Last path segment, used as the default display name of a folder.
pub fn display_name(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => normalized,
    }
}

pub fn is_within_scope(path: &str, root: &str) -> bool {
    let path = normalize(path);
    let root = normalize(root);

    if path == root {
        return true;
    }

    if root == "/" {
        return path.starts_with('/');
    }

    if cfg!(windows) {
        let path_lower = path.to_ascii_lowercase();
        let root_lower = root.to_ascii_lowercase();
        return path_lower.starts_with(&(root_lower + "/"));
    }

    path.starts_with(&(root + "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_slashes() {
        assert_eq!(normalize("/foo/bar/"), "/foo/bar");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn normalize_converts_backslashes() {
        assert_eq!(normalize("C:\\Users\\test"), "C:/Users/test");
    }

    #[test]
    fn parent_of_walks_up_one_level() {
        assert_eq!(parent_of("/a/b/c").as_deref(), Some("/a/b"));
        assert_eq!(parent_of("/a").as_deref(), Some("/"));
        assert_eq!(parent_of("/"), None);
        assert_eq!(parent_of("relative"), None);
    }

    #[test]
    fn display_name_is_last_segment() {
        assert_eq!(display_name("/photos/2024/"), "2024");
        assert_eq!(display_name("/"), "/");
    }

    #[test]
    fn within_scope_child_path() {
        assert!(is_within_scope("/foo/bar/baz", "/foo/bar"));
        assert!(is_within_scope("/foo/bar/", "/foo/bar"));
        assert!(!is_within_scope("/foo/barbaz", "/foo/bar"));
        assert!(!is_within_scope("/foo/other", "/foo/bar"));
    }
}
