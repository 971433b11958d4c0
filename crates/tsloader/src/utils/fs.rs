use std::path::Path;
use std::path::PathBuf;

/// Walks up from `dir` and returns the first directory that contains
/// `filename`. For dir = /a/b and filename = package.json, checks
/// /a/b/package.json, /a/package.json and /package.json in that order.
pub fn has_file_in_file_tree(
  dir: Option<&Path>,
  filename: &str,
) -> Option<PathBuf> {
  let mut dir = dir;
  while let Some(d) = dir {
    if d.join(filename).exists() {
      return Some(d.to_path_buf());
    }
    dir = d.parent();
  }
  None
}

/// Appends `.{extension}` to the path without touching an existing one,
/// `/a/b.d` -> `/a/b.d.ts`
pub fn with_appended_extension(path: PathBuf, extension: &str) -> PathBuf {
  let mut path = path.into_os_string();
  path.push(".");
  path.push(extension);
  path.into()
}
