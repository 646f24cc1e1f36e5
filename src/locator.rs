use std::fmt::Write;

use crate::attributes::ATTRIBUTES_FILE;

/// Canonical form of a node path: no leading, trailing or repeated separators.
/// The container root is the empty string.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(segment);
    }
    out
}

/// Join a normalized node path and a child name.
pub(crate) fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_owned()
    } else {
        format!("{path}/{name}")
    }
}

/// Backend path of a node's `attributes.json`.
pub fn attributes_path(path: &str) -> String {
    join(&normalize_path(path), ATTRIBUTES_FILE)
}

/// Backend path of the block at `grid_position` in the dataset at `dataset_path`.
///
/// Grid coordinates become path segments in axis order.
/// No bounds checking is done; positions outside the grid name objects which do not exist.
pub fn block_path(dataset_path: &str, grid_position: &[i64]) -> String {
    let mut s = normalize_path(dataset_path);
    s.reserve(grid_position.len() * 2);
    for idx in grid_position {
        if !s.is_empty() {
            s.push('/');
        }
        // writing to a String cannot fail
        let _ = write!(s, "{idx}");
    }
    s
}
