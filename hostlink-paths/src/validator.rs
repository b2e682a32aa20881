use std::fs::{self, Metadata};
use std::io;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use tracing::debug;

use crate::roots::system_roots;
use crate::verdict::{PathVerdict, RejectReason};

/// Checks candidate user-data directories against a list of protected roots
/// and the directory's own attributes.
#[derive(Debug, Clone, Default)]
pub struct PathValidator {
    roots: Vec<PathBuf>,
}

impl PathValidator {
    /// Validator protecting the platform's system directories.
    pub fn system() -> Self {
        Self::with_roots(system_roots())
    }

    pub fn with_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut validator = Self::default();
        for root in roots {
            validator.add_root(root);
        }
        validator
    }

    pub fn add_root(&mut self, root: PathBuf) {
        let root = normalize(&root);
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn check(&self, path: &Path) -> PathVerdict {
        let verdict = self.evaluate(path);
        debug!(path = %path.display(), %verdict, "checked path");
        verdict
    }

    /// Creates `path` and any missing parents, then checks it. Nothing is
    /// created when the path is malformed or lexically inside a protected
    /// root.
    pub fn prepare(&self, path: &Path) -> PathVerdict {
        let absolute = match self.screen(path) {
            Ok(absolute) => absolute,
            Err(verdict) => {
                debug!(path = %path.display(), %verdict, "refused to create path");
                return verdict;
            }
        };
        if let Err(e) = fs::create_dir_all(&absolute) {
            let verdict = PathVerdict::Rejected(RejectReason::CreateFailed(e.to_string()));
            debug!(path = %path.display(), %verdict, "could not create path");
            return verdict;
        }
        self.check(path)
    }

    /// Malformed input and lexical containment, before any filesystem
    /// access. Yields the normalized absolute path.
    fn screen(&self, path: &Path) -> Result<PathBuf, PathVerdict> {
        let raw = path.as_os_str();
        if raw.is_empty() {
            return Err(PathVerdict::Indeterminate("empty path".to_string()));
        }
        if raw.to_string_lossy().contains('\0') {
            return Err(PathVerdict::Indeterminate("path contains a NUL byte".to_string()));
        }

        let absolute = match std::path::absolute(path) {
            Ok(absolute) => normalize(&absolute),
            Err(e) => return Err(PathVerdict::Indeterminate(e.to_string())),
        };
        match self.protecting(&absolute) {
            Some(root) => Err(PathVerdict::Rejected(RejectReason::ProtectedRoot(root))),
            None => Ok(absolute),
        }
    }

    fn evaluate(&self, path: &Path) -> PathVerdict {
        let absolute = match self.screen(path) {
            Ok(absolute) => absolute,
            Err(verdict) => return verdict,
        };

        let metadata = match fs::metadata(&absolute) {
            Ok(metadata) => metadata,
            Err(e) => return io_verdict(e),
        };

        // Links may point back into a protected root.
        match fs::canonicalize(&absolute) {
            Ok(canonical) => {
                if let Some(root) = self.protecting(&canonical) {
                    return PathVerdict::Rejected(RejectReason::ProtectedRoot(root));
                }
            }
            Err(e) => return io_verdict(e),
        }

        attribute_verdict(&metadata)
    }

    /// The root containing `path`, comparing both the root as configured
    /// and its canonical form.
    fn protecting(&self, path: &Path) -> Option<PathBuf> {
        self.roots
            .iter()
            .find(|root| {
                contains(root, path)
                    || fs::canonicalize(root).is_ok_and(|canonical| contains(&canonical, path))
            })
            .cloned()
    }
}

fn io_verdict(e: io::Error) -> PathVerdict {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied | io::ErrorKind::NotADirectory => {
            PathVerdict::Rejected(RejectReason::Missing)
        }
        _ => PathVerdict::Indeterminate(e.to_string()),
    }
}

fn attribute_verdict(metadata: &Metadata) -> PathVerdict {
    if !metadata.is_dir() {
        return PathVerdict::Rejected(RejectReason::NotADirectory);
    }
    if metadata.permissions().readonly() {
        return PathVerdict::Rejected(RejectReason::ReadOnly);
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        const FILE_ATTRIBUTE_READONLY: u32 = 0x1;
        const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;
        let attributes = metadata.file_attributes();
        if attributes & FILE_ATTRIBUTE_READONLY != 0 {
            return PathVerdict::Rejected(RejectReason::ReadOnly);
        }
        if attributes & FILE_ATTRIBUTE_SYSTEM != 0 {
            return PathVerdict::Rejected(RejectReason::SystemAttribute);
        }
    }
    PathVerdict::Acceptable
}

/// Resolves `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(out.components().next_back(), Some(Component::RootDir | Component::Prefix(_)) | None) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Separator-terminated comparison key, so `/System` never prefixes
/// `/SystemX`.
fn containment_key(path: &Path) -> String {
    let mut key: String = path
        .to_string_lossy()
        .chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect();
    if !key.ends_with(MAIN_SEPARATOR) {
        key.push(MAIN_SEPARATOR);
    }
    if cfg!(windows) {
        key = key.to_lowercase();
    }
    key
}

fn contains(root: &Path, path: &Path) -> bool {
    containment_key(path).starts_with(&containment_key(root))
}
