use uuid::Uuid;

pub type Id = String;

/// Returns the final segment of a hierarchical backend path.
///
/// `"/xyz/openbmc_project/inventory/system/cpu0"` yields `"cpu0"`. A path that
/// ends in a separator (or is empty) yields an empty string, which callers
/// treat as an invalid identity.
pub fn stable_id(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Joins a backend path and a relative segment with exactly one separator.
pub fn join_path(base: &str, segment: &str) -> String {
    let base = base.trim_end_matches('/');
    let segment = segment.trim_start_matches('/');
    format!("{}/{}", base, segment)
}

/// True when `path` equals `root` or lies strictly below it.
pub fn is_within(path: &str, root: &str) -> bool {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return path.starts_with('/');
    }
    path == root
        || path
            .strip_prefix(root)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

/// Number of path segments `path` sits below `root`; `None` when outside it.
pub fn depth_below(path: &str, root: &str) -> Option<usize> {
    if !is_within(path, root) {
        return None;
    }
    let rest = &path[root.trim_end_matches('/').len()..];
    Some(rest.split('/').filter(|segment| !segment.is_empty()).count())
}

pub fn generate_request_id() -> Id {
    Uuid::new_v4().to_string()
}
