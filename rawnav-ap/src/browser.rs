//! Directory browser backing the console `ls` and `cd` commands

use crate::playback::playlist::{compare_names, is_hidden};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One listed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Tracks the current directory of the console
#[derive(Debug, Clone)]
pub struct Browser {
    cwd: PathBuf,
}

impl Browser {
    pub fn new(start_dir: impl AsRef<Path>) -> io::Result<Self> {
        let cwd = fs::canonicalize(start_dir)?;
        if !cwd.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", cwd.display()),
            ));
        }
        Ok(Self { cwd })
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Resolve a user argument against the current directory
    pub fn resolve(&self, arg: &str) -> PathBuf {
        let path = Path::new(arg);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Directories first, then files; each group sorted case-insensitively
    pub fn list(&self) -> io::Result<Vec<BrowserEntry>> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.cwd)? {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name) {
                continue;
            }
            let path = entry.path();
            let is_dir = path.is_dir();
            let item = BrowserEntry { name, path, is_dir };
            if is_dir {
                dirs.push(item);
            } else {
                files.push(item);
            }
        }

        dirs.sort_by(|a, b| compare_names(&a.path, &b.path));
        files.sort_by(|a, b| compare_names(&a.path, &b.path));
        dirs.extend(files);
        Ok(dirs)
    }

    /// Change directory; `..` moves to the parent
    pub fn change_dir(&mut self, arg: &str) -> io::Result<&Path> {
        let target = if arg == ".." {
            self.cwd.parent().map(Path::to_path_buf).unwrap_or_else(|| self.cwd.clone())
        } else {
            fs::canonicalize(self.resolve(arg))?
        };
        if !target.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", target.display()),
            ));
        }
        self.cwd = target;
        Ok(&self.cwd)
    }
}
