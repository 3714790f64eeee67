//! Minimal scanning of unified diffs.
//!
//! The news check only needs to know which paths a pull request touches and
//! whether each file was added or removed, so this reads just the per-file
//! header lines of the `.diff` body GitHub serves. It is not a general diff
//! parser.

/// One file touched by a diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffFile {
    /// The path on the target side (or the source side for removed files),
    /// without the `a/`/`b/` prefix.
    pub path: String,
    /// The file is newly added (`/dev/null` on the source side).
    pub is_added: bool,
    /// The file is removed (`/dev/null` on the target side).
    pub is_removed: bool,
}

fn strip_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

/// Collects the files touched by a unified diff.
pub fn scan(diff: &str) -> Vec<DiffFile> {
    let mut files: Vec<DiffFile> = Vec::new();

    for line in diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            // `diff --git a/<path> b/<path>`; paths with spaces are rare in
            // news directories and GitHub quotes the exotic ones, so the
            // final whitespace split is good enough here.
            let path = rest
                .split_whitespace()
                .next_back()
                .map(strip_prefix)
                .unwrap_or_default();
            files.push(DiffFile {
                path: path.to_owned(),
                is_added: false,
                is_removed: false,
            });
        } else if let Some(current) = files.last_mut() {
            if line.starts_with("--- /dev/null") {
                current.is_added = true;
            } else if line.starts_with("+++ /dev/null") {
                current.is_removed = true;
            } else if let Some(target) = line.strip_prefix("+++ b/") {
                current.path = target.to_owned();
            }
        }
    }

    files
}
