//! Path resolution (spec §4.4.1): '/'-separated, literal (no filesystem traversal); `.` and
//! `..` collapse syntactically against a working directory before lookup ever touches the
//! tree. A `..` above the root is an error. Results are always absolute.

use crate::error::{Result, TreeError};

pub const MAX_NAME_LEN: usize = 255;

/// Syntactically collapse `.` / `..` components of `path` against `cwd`, both already
/// absolute, without touching the tree. A `..` that would climb above `/` is rejected (spec
/// §4.4.1: "A `..` above the root is an error").
pub fn normalize(cwd: &str, path: &str) -> Result<String> {
    let absolute = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd.trim_end_matches('/'), path)
    };

    let mut stack: Vec<&str> = Vec::new();
    for component in absolute.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                if stack.pop().is_none() {
                    return Err(TreeError::PathEscapesRoot(path.to_string()));
                }
            }
            other => stack.push(other),
        }
    }

    Ok(format!("/{}", stack.join("/")))
}

/// Split a normalized absolute path into its directory components, in order, with no empty
/// components. `/` itself yields an empty vector.
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

/// Validate one filename component: non-empty, no embedded `/`, and within the post-
/// translation length budget (spec §4.4.1: "names ≤ 255 bytes post-translation").
pub fn validate_component(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(TreeError::InvalidComponent(name.to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(TreeError::NameTooLong(name.to_string(), MAX_NAME_LEN));
    }
    Ok(())
}

/// Two independent working directories are tracked by callers (spec §4.4.1): `wdi` for the
/// image side, `wdx` for the disk side. This type is a thin cwd-tracker; path lookup itself
/// happens in [`crate::tree::Tree`].
#[derive(Debug, Clone)]
pub struct WorkingDirectories {
    pub wdi: String,
    pub wdx: std::path::PathBuf,
}

impl Default for WorkingDirectories {
    fn default() -> Self {
        Self { wdi: "/".to_string(), wdx: std::path::PathBuf::from("/") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_dot_collapses_against_cwd() {
        assert_eq!(normalize("/a/b", "../c").unwrap(), "/a/c");
    }

    #[test]
    fn dot_dot_above_root_is_error() {
        assert!(normalize("/", "../x").is_err());
    }

    #[test]
    fn resolution_is_idempotent() {
        let once = normalize("/", "/a/./b/../c").unwrap();
        let twice = normalize("/", &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn absolute_path_ignores_cwd() {
        assert_eq!(normalize("/somewhere", "/x/y").unwrap(), "/x/y");
    }
}
