//! File writer for generated modules.
//!
//! Generated files are never merged: a target that already exists is a
//! [`WriteError::DestinationExists`] unless `--force` is given. Each file is
//! opened in its own scope so the handle is released on every exit path.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::WriteError;

/// Name of the file that marks a directory as a Python package.
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Result of a write operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// A new file was written.
    Created {
        /// Path to the written file.
        path: PathBuf,
        /// Number of bytes written.
        bytes: usize,
    },
    /// An existing file was replaced (`--force`, or an edited aggregation file).
    Overwritten { path: PathBuf, bytes: usize },
    /// Dry run - content was not written.
    DryRun {
        /// Content that would have been written.
        content: String,
        /// Path where content would have been written.
        path: PathBuf,
        /// Whether the write would replace an existing file.
        existed: bool,
    },
}

/// File writer with dry-run and force support.
#[derive(Debug, Clone, Copy)]
pub struct FileWriter {
    /// Whether to run in dry-run mode.
    dry_run: bool,
    /// Whether existing generated files may be replaced.
    force: bool,
}

impl FileWriter {
    /// Create a new file writer.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            force: false,
        }
    }

    /// Allow replacing existing files.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Fail on the first target that already exists, before anything is
    /// written. A no-op under `--force`.
    pub fn preflight<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> Result<(), WriteError> {
        if self.force {
            return Ok(());
        }
        match paths.into_iter().find(|path| path.exists()) {
            Some(path) => Err(WriteError::DestinationExists {
                path: path.to_path_buf(),
            }),
            None => Ok(()),
        }
    }

    /// Write a generated file, refusing to replace an existing one unless
    /// forced.
    ///
    /// In dry-run mode, returns the content without writing.
    pub fn write_new(&self, path: &Path, content: &str) -> Result<WriteResult, WriteError> {
        let existed = path.exists();
        if self.dry_run {
            return Ok(WriteResult::DryRun {
                content: content.to_string(),
                path: path.to_path_buf(),
                existed,
            });
        }
        if existed && !self.force {
            return Err(WriteError::DestinationExists {
                path: path.to_path_buf(),
            });
        }

        create_parent(path)?;
        let mut options = OpenOptions::new();
        if self.force {
            options.write(true).create(true).truncate(true);
        } else {
            options.write(true).create_new(true);
        }
        write_with(&options, path, content)?;

        Ok(if existed {
            WriteResult::Overwritten {
                path: path.to_path_buf(),
                bytes: content.len(),
            }
        } else {
            WriteResult::Created {
                path: path.to_path_buf(),
                bytes: content.len(),
            }
        })
    }

    /// Replace the content of an existing file, such as an edited
    /// aggregation module.
    pub fn rewrite(&self, path: &Path, content: &str) -> Result<WriteResult, WriteError> {
        if self.dry_run {
            return Ok(WriteResult::DryRun {
                content: content.to_string(),
                path: path.to_path_buf(),
                existed: true,
            });
        }

        let mut options = OpenOptions::new();
        options.write(true).truncate(true);
        write_with(&options, path, content)?;

        Ok(WriteResult::Overwritten {
            path: path.to_path_buf(),
            bytes: content.len(),
        })
    }

    /// Add an empty `__init__.py` to every directory between `root` and
    /// the file at `relative`, skipping the ones that already have it.
    /// Returns the marker files that were (or in dry-run, would be) created.
    pub fn ensure_packages(&self, root: &Path, relative: &Path) -> Result<Vec<PathBuf>, WriteError> {
        let mut created = Vec::new();
        let mut dir = PathBuf::from(root);
        let components: Vec<_> = relative.parent().into_iter().flat_map(Path::components).collect();
        for component in components {
            dir.push(component);
            let marker = dir.join(PACKAGE_MARKER);
            if marker.exists() {
                continue;
            }
            if !self.dry_run {
                std::fs::create_dir_all(&dir).map_err(|e| WriteError::CreateDir {
                    path: dir.clone(),
                    source: e,
                })?;
                let mut options = OpenOptions::new();
                options.write(true).create_new(true);
                match write_with(&options, &marker, "") {
                    Ok(()) => {}
                    Err(WriteError::DestinationExists { .. }) => continue,
                    Err(e) => return Err(e),
                }
            }
            created.push(marker);
        }
        Ok(created)
    }
}

impl WriteResult {
    /// Get the path associated with this result.
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Created { path, .. }
            | WriteResult::Overwritten { path, .. }
            | WriteResult::DryRun { path, .. } => path,
        }
    }

    /// Check if the write happened (not dry-run).
    pub fn was_written(&self) -> bool {
        !matches!(self, WriteResult::DryRun { .. })
    }

    /// Get the number of bytes written (0 for dry-run).
    pub fn bytes(&self) -> usize {
        match self {
            WriteResult::Created { bytes, .. } | WriteResult::Overwritten { bytes, .. } => *bytes,
            WriteResult::DryRun { .. } => 0,
        }
    }

    /// Whether the target existed before this write.
    pub fn replaced_existing(&self) -> bool {
        match self {
            WriteResult::Created { .. } => false,
            WriteResult::Overwritten { .. } => true,
            WriteResult::DryRun { existed, .. } => *existed,
        }
    }
}

fn create_parent(path: &Path) -> Result<(), WriteError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| WriteError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Open `path` with `options`, write `content` and close the handle before
/// returning, whether or not the write succeeded.
fn write_with(options: &OpenOptions, path: &Path, content: &str) -> Result<(), WriteError> {
    let write_error = |e: std::io::Error| WriteError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = options.open(path).map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => WriteError::DestinationExists {
            path: path.to_path_buf(),
        },
        _ => write_error(e),
    })?;
    file.write_all(content.as_bytes()).map_err(write_error)?;
    file.flush().map_err(write_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_new_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.py");
        let content = "class Book:\n    pass\n";

        let writer = FileWriter::new(false);
        let result = writer.write_new(&path, content).unwrap();

        assert!(matches!(result, WriteResult::Created { .. }));
        assert_eq!(result.bytes(), content.len());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db/models/book.py");

        let writer = FileWriter::new(false);
        let result = writer.write_new(&path, "x = 1\n").unwrap();

        assert!(result.was_written());
        assert!(path.exists());
    }

    #[test]
    fn test_existing_file_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.py");
        std::fs::write(&path, "original\n").unwrap();

        let writer = FileWriter::new(false);
        let err = writer.write_new(&path, "replacement\n").unwrap_err();

        assert!(matches!(err, WriteError::DestinationExists { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original\n");
    }

    #[test]
    fn test_force_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.py");
        std::fs::write(&path, "a much longer original line\n").unwrap();

        let writer = FileWriter::new(false).with_force(true);
        let result = writer.write_new(&path, "short\n").unwrap();

        assert!(matches!(result, WriteResult::Overwritten { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short\n");
    }

    #[test]
    fn test_preflight_names_first_existing_target() {
        let dir = TempDir::new().unwrap();
        let free = dir.path().join("a.py");
        let taken = dir.path().join("b.py");
        std::fs::write(&taken, "").unwrap();

        let writer = FileWriter::new(false);
        let err = writer
            .preflight([free.as_path(), taken.as_path()])
            .unwrap_err();
        assert!(matches!(err, WriteError::DestinationExists { ref path } if path == &taken));

        assert!(writer.with_force(true).preflight([taken.as_path()]).is_ok());
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.py");
        let content = "class Book:\n    pass\n";

        let writer = FileWriter::new(true);
        let result = writer.write_new(&path, content).unwrap();

        assert!(!result.was_written());
        assert!(!path.exists());
        if let WriteResult::DryRun {
            content: dry_content,
            existed,
            ..
        } = result
        {
            assert_eq!(dry_content, content);
            assert!(!existed);
        }
    }

    #[test]
    fn test_rewrite_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.py");
        std::fs::write(&path, "app = FastAPI()\napp.include_router(a_router)\n").unwrap();

        let result = FileWriter::new(false).rewrite(&path, "app = FastAPI()\n").unwrap();
        assert!(result.replaced_existing());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "app = FastAPI()\n");
    }

    #[test]
    fn test_ensure_packages() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("db")).unwrap();
        std::fs::write(root.join("db").join(PACKAGE_MARKER), "from x import Base\n").unwrap();

        let writer = FileWriter::new(false);
        let created = writer
            .ensure_packages(root, Path::new("db/models/book.py"))
            .unwrap();

        assert_eq!(created, vec![root.join("db/models").join(PACKAGE_MARKER)]);
        assert_eq!(
            std::fs::read_to_string(root.join("db").join(PACKAGE_MARKER)).unwrap(),
            "from x import Base\n"
        );
        assert!(!root.join(PACKAGE_MARKER).exists());

        let again = writer
            .ensure_packages(root, Path::new("db/models/book.py"))
            .unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_ensure_packages_dry_run() {
        let dir = TempDir::new().unwrap();
        let created = FileWriter::new(true)
            .ensure_packages(dir.path(), Path::new("api/book/routes.py"))
            .unwrap();
        assert_eq!(created.len(), 2);
        assert!(!dir.path().join("api").exists());
    }
}
