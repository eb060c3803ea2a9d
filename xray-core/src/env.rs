//! # Build Environment
//!
//! Variable expansion against the build environment, and the sinks that
//! receive a task's output variables.
//!
//! A sink receives one [`EnvironmentInjection`] per task: a set of variables
//! to upsert and a set of keys to remove, applied as a single unit.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, PoisonError, RwLock};

use regex::{Captures, Regex};
use tracing::debug;

static VARIABLE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

static UNRESOLVED_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\$\{[^}]*\}").unwrap()
});

/// Expand `${NAME}` and `$NAME` references. References to undefined
/// variables are left as they are.
pub fn expand_variables(value: &str, env: &HashMap<String, String>) -> String {
  VARIABLE_REFERENCE
    .replace_all(value, |caps: &Captures<'_>| {
      let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or_default();
      match env.get(name) {
        Some(resolved) => resolved.clone(),
        None => caps[0].to_string(),
      }
    })
    .into_owned()
}

/// Quote a value for a POSIX shell: wrap it in single quotes and turn each
/// embedded `'` into `'\''`.
pub fn shell_quote(value: &str) -> String {
  format!("'{}'", value.replace('\'', r"'\''"))
}

/// True when a value is blank or still holds an unresolved `${NAME}` reference
pub fn is_unresolved(value: &str) -> bool {
  value.trim().is_empty() || UNRESOLVED_REFERENCE.is_match(value)
}

/// Variables to set and keys to remove, applied together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentInjection {
  pub upserts: BTreeMap<String, String>,
  pub removals: BTreeSet<String>,
}

impl EnvironmentInjection {
  pub fn new(upserts: BTreeMap<String, String>, removals: BTreeSet<String>) -> Self {
    Self { upserts, removals }
  }
}

/// Receives the output variables of a task
pub trait EnvironmentSink: Send + Sync {
  /// Apply an injection as a single unit
  fn apply(&self, injection: EnvironmentInjection) -> io::Result<()>;
}

/// An in-memory build environment shared between tasks of one build
#[derive(Debug, Default)]
pub struct BuildEnvironment {
  vars: RwLock<HashMap<String, String>>,
}

impl BuildEnvironment {
  pub fn new(vars: HashMap<String, String>) -> Self {
    Self {
      vars: RwLock::new(vars),
    }
  }

  /// Seed from the current process environment
  pub fn from_process() -> Self {
    Self::new(std::env::vars().collect())
  }

  /// Copy of all variables
  pub fn snapshot(&self) -> HashMap<String, String> {
    self.vars.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Value of one variable
  pub fn get(&self, key: &str) -> Option<String> {
    self.vars.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
  }

  /// Expand references in a value against the current variables
  pub fn expand(&self, value: &str) -> String {
    let vars = self.vars.read().unwrap_or_else(PoisonError::into_inner);
    expand_variables(value, &vars)
  }
}

impl EnvironmentSink for BuildEnvironment {
  fn apply(&self, injection: EnvironmentInjection) -> io::Result<()> {
    let mut vars = self.vars.write().unwrap_or_else(PoisonError::into_inner);
    for key in &injection.removals {
      vars.remove(key);
    }
    vars.extend(injection.upserts);
    Ok(())
  }
}

/// A dotenv-style file of `KEY='VALUE'` lines that a shell can source
#[derive(Debug, Clone)]
pub struct DotenvFile {
  path: PathBuf,
}

impl DotenvFile {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl EnvironmentSink for DotenvFile {
  fn apply(&self, injection: EnvironmentInjection) -> io::Result<()> {
    let existing = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
      Err(e) => return Err(e),
    };

    let mut content = String::new();
    for line in existing.lines() {
      let key = line.split_once('=').map(|(k, _)| k.trim());
      let replaced = key.is_some_and(|k| injection.removals.contains(k) || injection.upserts.contains_key(k));
      if !replaced {
        content.push_str(line);
        content.push('\n');
      }
    }

    for (key, value) in &injection.upserts {
      // Values are single-line in a dotenv file
      content.push_str(&format!("{key}={}\n", shell_quote(&value.replace('\n', "\\n"))));
    }

    debug!(
      upserts = injection.upserts.len(),
      removals = injection.removals.len(),
      "Writing environment to {}",
      self.path.display()
    );
    fs::write(&self.path, content)
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  #[test]
  fn test_expand_both_reference_styles() {
    let vars = env(&[("BUILD_NUMBER", "42"), ("PROJECT", "CALC")]);

    assert_eq!(expand_variables("reports/${BUILD_NUMBER}/*.xml", &vars), "reports/42/*.xml");
    assert_eq!(expand_variables("$PROJECT-$BUILD_NUMBER", &vars), "CALC-42");
  }

  #[test]
  fn test_undefined_references_are_kept() {
    let vars = env(&[]);

    assert_eq!(expand_variables("${TEST_EXEC}", &vars), "${TEST_EXEC}");
    assert_eq!(expand_variables("$HOME/x", &vars), "$HOME/x");
    assert_eq!(expand_variables("no references", &vars), "no references");
  }

  #[test]
  fn test_is_unresolved() {
    assert!(is_unresolved(""));
    assert!(is_unresolved("  "));
    assert!(is_unresolved("${TEST_EXEC}"));
    assert!(!is_unresolved("CALC-12"));
  }

  #[test]
  fn test_build_environment_applies_removals_then_upserts() {
    let build = BuildEnvironment::new(env(&[("A", "1"), ("B", "2")]));

    build
      .apply(EnvironmentInjection::new(
        BTreeMap::from([("B".to_string(), "3".to_string()), ("C".to_string(), "4".to_string())]),
        BTreeSet::from(["A".to_string(), "B".to_string()]),
      ))
      .unwrap();

    assert_eq!(build.get("A"), None);
    assert_eq!(build.get("B").as_deref(), Some("3"));
    assert_eq!(build.get("C").as_deref(), Some("4"));
    assert_eq!(build.expand("${C}"), "4");
  }

  #[test]
  fn test_dotenv_file_replaces_previous_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("xray.env");
    fs::write(&path, "KEEP=yes\nXRAY_TESTS=OLD-1\nSTALE=1\n").unwrap();

    let sink = DotenvFile::new(&path);
    sink
      .apply(EnvironmentInjection::new(
        BTreeMap::from([("XRAY_TESTS".to_string(), "NEW-1".to_string())]),
        BTreeSet::from(["STALE".to_string()]),
      ))
      .unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "KEEP=yes\nXRAY_TESTS='NEW-1'\n");
  }

  #[test]
  fn test_dotenv_file_created_when_missing() {
    let dir = TempDir::new().unwrap();
    let sink = DotenvFile::new(dir.path().join("new.env"));

    sink
      .apply(EnvironmentInjection::new(
        BTreeMap::from([("X".to_string(), "line1\nline2".to_string())]),
        BTreeSet::new(),
      ))
      .unwrap();

    assert_eq!(fs::read_to_string(sink.path()).unwrap(), "X='line1\\nline2'\n");
  }

  #[test]
  fn test_shell_quote() {
    assert_eq!(shell_quote("CALC-1;CALC-2"), "'CALC-1;CALC-2'");
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
    assert_eq!(shell_quote(""), "''");
  }

  #[cfg(unix)]
  #[test]
  fn test_dotenv_file_can_be_sourced() {
    let dir = TempDir::new().unwrap();
    let sink = DotenvFile::new(dir.path().join("xray.env"));
    let raw = r#"{"key": "EXEC-1"};{"key": "it's $HOME `EXEC-2`"}"#;

    sink
      .apply(EnvironmentInjection::new(
        BTreeMap::from([("XRAY_RAW_RESPONSE".to_string(), raw.to_string())]),
        BTreeSet::new(),
      ))
      .unwrap();

    let output = std::process::Command::new("sh")
      .arg("-c")
      .arg(r#". "$1" && printf %s "$XRAY_RAW_RESPONSE""#)
      .arg("sh")
      .arg(sink.path())
      .output()
      .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), raw);
  }
}
