//! Validation of caller-supplied identifiers and paths.
//!
//! Nothing a caller sends reaches a command line or a filesystem lookup
//! without passing through one of these checks first.

use lazy_static::lazy_static;
use regex::Regex;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

use crate::error::{AgentError, Result};

/// Services the agent may inspect or control.
pub const AUTHORIZED_SERVICES: &[&str] = &["nodered", "ssh", "vncserver"];

/// Upper bound for path inputs, in bytes.
pub const MAX_PATH_LEN: usize = 4096;

lazy_static! {
    // Word characters, dots, plus and hyphens; must not look like an option or a hidden file.
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.+-]{0,63}$").expect("identifier pattern is valid");
}

/// Check a service, binary or package name against the identifier pattern.
pub fn validate_identifier<'a>(kind: &str, name: &'a str) -> Result<&'a str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(AgentError::validation_error(format!(
            "invalid {} name: only letters, digits, '_', '.', '+' and '-' are allowed (max 64)",
            kind
        )))
    }
}

pub fn is_authorized_service(name: &str) -> bool {
    AUTHORIZED_SERVICES.contains(&name)
}

/// Authorized service names in sorted order.
pub fn authorized_services() -> Vec<&'static str> {
    let mut services = AUTHORIZED_SERVICES.to_vec();
    services.sort_unstable();
    services
}

/// Why a path was refused.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// The raw input is unusable (empty, too long, control characters).
    #[error("invalid path: {0}")]
    Invalid(&'static str),
    /// The path resolved to somewhere outside the confinement root.
    #[error("path is outside the allowed root")]
    OutsideRoot,
    /// The filesystem refused to resolve the path.
    #[error("could not resolve path: {0}")]
    Unresolvable(#[source] io::Error),
}

/// Resolves caller paths and keeps them under a fixed root directory.
#[derive(Debug, Clone)]
pub struct PathConfinement {
    root: PathBuf,
}

impl PathConfinement {
    /// Confine paths to `root`, which must exist. The root is canonicalized once here.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: std::fs::canonicalize(root)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `input` to an absolute path inside the root.
    ///
    /// Relative inputs are taken relative to the root. The path is walked one
    /// component at a time: `..` pops, and every prefix that exists on disk is
    /// canonicalized, so symlinks are dereferenced wherever they appear.
    /// Components that do not exist yet are kept as given. The result must
    /// still lie under the root.
    pub fn resolve(&self, input: &str) -> std::result::Result<PathBuf, PathError> {
        check_raw_path(input)?;

        let candidate = self.root.join(input);
        let mut path = PathBuf::new();

        for component in candidate.components() {
            match component {
                Component::Prefix(_) | Component::RootDir => path.push(component),
                Component::CurDir => {}
                Component::ParentDir => {
                    path.pop();
                }
                Component::Normal(part) => {
                    path.push(part);
                    path = canonicalize_existing(path)?;
                }
            }
        }

        if path.starts_with(&self.root) {
            Ok(path)
        } else {
            Err(PathError::OutsideRoot)
        }
    }
}

/// Canonicalize `path` if it exists, otherwise hand it back unchanged.
fn canonicalize_existing(path: PathBuf) -> std::result::Result<PathBuf, PathError> {
    match std::fs::canonicalize(&path) {
        Ok(canonical) => Ok(canonical),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            // A dangling symlink has no target to check against the root.
            if std::fs::symlink_metadata(&path).is_ok() {
                Err(PathError::Unresolvable(e))
            } else {
                Ok(path)
            }
        }
        Err(e) => Err(PathError::Unresolvable(e)),
    }
}

fn check_raw_path(input: &str) -> std::result::Result<(), PathError> {
    if input.is_empty() {
        return Err(PathError::Invalid("path is empty"));
    }
    if input.len() > MAX_PATH_LEN {
        return Err(PathError::Invalid("path is too long"));
    }
    if input.chars().any(char::is_control) {
        return Err(PathError::Invalid("path contains control characters"));
    }
    Ok(())
}
