//! Helpers for `/`-separated remote paths.
//!
//! Remote paths never go through [`std::path::Path`]: the local platform's
//! separator rules must not leak into paths sent to the server.

/// Joins a child name or relative path onto a remote base path.
///
/// Empty segments are dropped, so `join("/mc/", "/mods")` is `/mc/mods`. The
/// result keeps a leading `/` only when `base` had one.
#[must_use]
pub fn join(base: &str, child: &str) -> String {
    let absolute = base.starts_with('/');
    let segments: Vec<&str> = base
        .split('/')
        .chain(child.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Normalizes a relative path from a push batch or removal request.
///
/// Backslashes become `/`, repeated separators collapse, `.` segments and
/// leading/trailing separators are removed.
#[must_use]
pub fn normalize_relative(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns the segments of a remote path, ignoring empty and `.` segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
}
