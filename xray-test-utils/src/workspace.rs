//! Temporary build workspaces for testing

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

/// RAII guard for a temporary build workspace
///
/// The directory and everything written into it is removed when the guard
/// is dropped.
pub struct WorkspaceGuard {
  temp_dir: TempDir,
}

impl Default for WorkspaceGuard {
  fn default() -> Self {
    Self::new()
  }
}

impl WorkspaceGuard {
  /// Create an empty workspace
  pub fn new() -> Self {
    Self {
      temp_dir: TempDir::new().expect("Failed to create temp workspace"),
    }
  }

  /// Root of the workspace
  pub fn path(&self) -> &Path {
    self.temp_dir.path()
  }

  /// Write a file relative to the workspace root, creating parent directories
  pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = self.temp_dir.path().join(relative);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write workspace file");
    path
  }

  /// Write a file and set its modification time to `age` in the past
  pub fn write_aged(&self, relative: &str, content: impl AsRef<[u8]>, age: Duration) -> PathBuf {
    let path = self.write(relative, content);
    let modified = SystemTime::now() - age;
    let file = fs::File::options()
      .write(true)
      .open(&path)
      .expect("Failed to open workspace file");
    file.set_modified(modified).expect("Failed to set modification time");
    path
  }

  /// Create a directory relative to the workspace root
  pub fn mkdir(&self, relative: &str) -> PathBuf {
    let path = self.temp_dir.path().join(relative);
    fs::create_dir_all(&path).expect("Failed to create workspace directory");
    path
  }

  /// Read a file relative to the workspace root
  pub fn read(&self, relative: &str) -> String {
    fs::read_to_string(self.temp_dir.path().join(relative)).expect("Failed to read workspace file")
  }
}
