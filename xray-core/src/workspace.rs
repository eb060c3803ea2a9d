//! # Workspace Files
//!
//! Discovery and packaging of files in a build's working directory: glob
//! expansion for result files, single-file lookup, recursive collection of
//! Cucumber feature files, and zip packing/unpacking.

use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use glob::{MatchOptions, Pattern};
use thiserror::Error;
use tracing::{debug, warn};
use zip::read::ZipArchive;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ConfigurationError;

/// Errors raised while reading or writing workspace files
#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("0 files found. Please make sure the path provided is valid and is not a directory")]
  NoMatches(String),

  #[error("Invalid glob expression '{pattern}': {reason}")]
  InvalidPattern { pattern: String, reason: String },

  #[error("File path is a directory or the file doesn't exist: {}", .0.display())]
  NotAFile(PathBuf),

  #[error("The path is not a folder: {}", .0.display())]
  NotAFolder(PathBuf),

  #[error("I/O error on {}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("Zip archive error")]
  Zip(#[from] zip::result::ZipError),
}

/// Reject paths that try to reach above the workspace
pub fn check_path_traversal(path: &str) -> Result<(), ConfigurationError> {
  if path.contains("../") {
    return Err(ConfigurationError::PathTraversal(path.to_string()));
  }
  Ok(())
}

/// The working directory of one build
#[derive(Debug, Clone)]
pub struct Workspace {
  root: PathBuf,
}

impl Workspace {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Resolve a path relative to the workspace. Absolute paths are kept.
  pub fn resolve(&self, path: &str) -> PathBuf {
    self.root.join(path.trim())
  }

  /// Expand a glob expression into the matching files, sorted by path.
  ///
  /// Relative expressions are evaluated against the workspace. Directories
  /// never match. Zero matches is an error.
  pub fn glob(&self, expression: &str) -> Result<Vec<PathBuf>, WorkspaceError> {
    let expression = expression.trim();
    let full = if Path::new(expression).is_absolute() {
      expression.to_string()
    } else {
      let root = Pattern::escape(&self.root.to_string_lossy());
      format!("{}/{}", root.trim_end_matches('/'), expression)
    };

    let options = MatchOptions {
      case_sensitive: true,
      require_literal_separator: true,
      require_literal_leading_dot: false,
    };

    let entries = glob::glob_with(&full, options).map_err(|e| WorkspaceError::InvalidPattern {
      pattern: expression.to_string(),
      reason: e.msg.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries
      .filter_map(|entry| match entry {
        Ok(path) => Some(path),
        Err(e) => {
          warn!("Skipping unreadable path {}: {}", e.path().display(), e.error());
          None
        }
      })
      .filter(|path| path.is_file())
      .collect();
    files.sort();

    if files.is_empty() {
      return Err(WorkspaceError::NoMatches(expression.to_string()));
    }

    for file in &files {
      debug!("File found: {}", file.display());
    }
    Ok(files)
  }

  /// Resolve exactly one existing file
  pub fn resolve_file(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
    let file = self.resolve(path);
    if !file.is_file() {
      return Err(WorkspaceError::NotAFile(file));
    }
    Ok(file)
  }

  /// Read a workspace file
  pub fn read(&self, path: &Path) -> Result<Vec<u8>, WorkspaceError> {
    fs::read(path).map_err(|source| WorkspaceError::Io {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Collect every `*.feature` file below a folder, recursively.
  ///
  /// With `last_modified` set, only files modified within that many minutes
  /// are kept.
  pub fn feature_files(&self, folder: &str, last_modified: Option<u64>) -> Result<Vec<PathBuf>, WorkspaceError> {
    let folder = self.resolve(folder);
    if !folder.is_dir() {
      return Err(WorkspaceError::NotAFolder(folder));
    }

    // A window reaching past the epoch has no cutoff
    let cutoff = last_modified
      .and_then(|minutes| SystemTime::now().checked_sub(Duration::from_secs(minutes.saturating_mul(60))));

    let mut files = Vec::new();
    collect_features(&folder, cutoff, &mut files)?;
    files.sort();
    Ok(files)
  }

  /// Pack files into a zip archive, naming entries by their path relative to `base`
  pub fn zip(&self, base: &Path, files: &[PathBuf]) -> Result<Vec<u8>, WorkspaceError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
      let name = file
        .strip_prefix(base)
        .unwrap_or(file)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

      writer.start_file(name, options)?;
      let content = self.read(file)?;
      writer.write_all(&content).map_err(|source| WorkspaceError::Io {
        path: file.clone(),
        source,
      })?;
    }

    Ok(writer.finish()?.into_inner())
  }

  /// Extract a zip archive into a folder of the workspace.
  ///
  /// Entries whose names would escape the folder are skipped.
  pub fn unzip(&self, bytes: &[u8], folder: &str) -> Result<Vec<PathBuf>, WorkspaceError> {
    let target = self.resolve(folder);
    fs::create_dir_all(&target).map_err(|source| WorkspaceError::Io {
      path: target.clone(),
      source,
    })?;

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut written = Vec::new();

    for i in 0..archive.len() {
      let mut entry = archive.by_index(i)?;
      let Some(relative) = entry.enclosed_name() else {
        warn!("Skipping zip entry outside the target folder: {}", entry.name());
        continue;
      };
      let path = target.join(relative);

      if entry.is_dir() {
        fs::create_dir_all(&path).map_err(|source| WorkspaceError::Io { path, source })?;
        continue;
      }

      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| WorkspaceError::Io {
          path: parent.to_path_buf(),
          source,
        })?;
      }

      let mut content = Vec::new();
      entry.read_to_end(&mut content).map_err(|source| WorkspaceError::Io {
        path: path.clone(),
        source,
      })?;
      fs::write(&path, content).map_err(|source| WorkspaceError::Io {
        path: path.clone(),
        source,
      })?;
      written.push(path);
    }

    Ok(written)
  }
}

fn collect_features(dir: &Path, cutoff: Option<SystemTime>, files: &mut Vec<PathBuf>) -> Result<(), WorkspaceError> {
  let io_error = |source| WorkspaceError::Io {
    path: dir.to_path_buf(),
    source,
  };

  for entry in fs::read_dir(dir).map_err(io_error)? {
    let entry = entry.map_err(io_error)?;
    let file_type = entry.file_type().map_err(io_error)?;
    let path = entry.path();

    if file_type.is_dir() {
      collect_features(&path, cutoff, files)?;
      continue;
    }

    // Symlinked folders may loop back into the tree
    if file_type.is_symlink() && path.is_dir() {
      debug!("Skipping symlinked folder {}", path.display());
      continue;
    }

    if path.extension().is_none_or(|ext| ext != "feature") {
      continue;
    }

    if let Some(cutoff) = cutoff {
      let modified = fs::metadata(&path).and_then(|m| m.modified()).map_err(io_error)?;
      if modified < cutoff {
        continue;
      }
    }

    files.push(path);
  }

  Ok(())
}
