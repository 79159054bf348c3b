//! Record file naming inside a collection directory

use std::path::{Path, PathBuf};

/// Replace filesystem-unsafe characters with `_` so any record id maps to a
/// valid single path component.
pub fn sanitize_filename(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// File name for a record id: `<sanitized-id>.md`
pub fn record_filename(id: &str) -> String {
    format!("{}.md", sanitize_filename(id))
}

/// Full path of a record file inside a collection directory
pub fn record_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(record_filename(id))
}

/// Record id a file name maps back to, when nothing was sanitized away:
/// the stem of a `.md` file. Non-markdown files are ignored entirely.
pub fn id_from_filename(name: &str) -> Option<&str> {
    name.strip_suffix(".md").filter(|stem| !stem.is_empty())
}
