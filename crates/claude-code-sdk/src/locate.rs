use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::{ClaudeSdkError, Result};

/// Environment variable naming an explicit `claude` binary.
pub const CLI_PATH_ENV: &str = "CLAUDE_CLI_PATH";

const CLI_NAME: &str = "claude";

const INSTALL_HINT: &str =
    "Claude Code not found. Install with: npm install -g @anthropic-ai/claude-code";

const RUNTIME_HINT: &str = "Claude Code requires a JavaScript runtime. Please install one:

* Install Node.js then run: npm install -g @anthropic-ai/claude-code
* Install Deno then run: deno install -g @anthropic-ai/claude-code
* Install Bun then run: bun install -g @anthropic-ai/claude-code";

/// One-shot filesystem lookup for the `claude` executable.
///
/// Candidates, first hit wins:
///
/// 1. the override path (normally `$CLAUDE_CLI_PATH`), if that file exists
/// 2. `claude` in any directory of the search path (normally `$PATH`)
/// 3. the fallback candidates, in order
///
/// The fallback list is install-location folklore rather than anything the
/// CLI promises, so callers may replace it with [`CliLocator::with_fallbacks`].
#[derive(Debug, Clone, Default)]
pub struct CliLocator {
    override_path: Option<PathBuf>,
    search_path: Option<OsString>,
    fallbacks: Vec<PathBuf>,
}

impl CliLocator {
    /// Locator configured from the process environment.
    pub fn from_env() -> Self {
        CliLocator {
            override_path: std::env::var_os(CLI_PATH_ENV).map(PathBuf::from),
            search_path: std::env::var_os("PATH"),
            fallbacks: default_fallbacks(home::home_dir().as_deref()),
        }
    }

    pub fn with_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<PathBuf>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn fallbacks(&self) -> &[PathBuf] {
        &self.fallbacks
    }

    /// Resolve the binary, or fail with [`ClaudeSdkError::CliNotFound`].
    pub fn locate(&self) -> Result<PathBuf> {
        if let Some(path) = self.override_path.as_ref().filter(|p| p.exists()) {
            return Ok(path.clone());
        }

        if let Some(path) = self.find_on_search_path(CLI_NAME) {
            return Ok(path);
        }

        if let Some(path) = self.fallbacks.iter().find(|p| p.exists()) {
            return Ok(path.clone());
        }

        let has_runtime = ["node", "bun", "deno"]
            .iter()
            .any(|rt| self.find_on_search_path(rt).is_some());
        let hint = if has_runtime { INSTALL_HINT } else { RUNTIME_HINT };
        tracing::debug!(has_runtime, "claude binary not found");
        Err(ClaudeSdkError::not_found(hint, None))
    }

    fn find_on_search_path(&self, name: &str) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref().filter(|p| !p.is_empty())?;
        let cwd = std::env::current_dir().unwrap_or_default();
        which::which_in(name, Some(search_path), cwd).ok()
    }
}

/// Well-known install locations, relative to `home` where applicable.
///
/// Without a home directory only the absolute candidates remain.
pub fn default_fallbacks(home: Option<&Path>) -> Vec<PathBuf> {
    let Some(home) = home else {
        return vec![PathBuf::from("/usr/local/bin/claude")];
    };
    vec![
        home.join(".npm-global/bin/claude"),
        PathBuf::from("/usr/local/bin/claude"),
        home.join(".local/bin/claude"),
        home.join("node_modules/.bin/claude"),
        home.join(".yarn/bin/claude"),
        home.join(".bun/bin/claude"),
        home.join(".deno/bin/claude"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn nothing_found_is_cli_not_found() {
        let locator = CliLocator::default().with_search_path("");
        let err = locator.locate().unwrap_err();
        assert!(matches!(err, ClaudeSdkError::CliNotFound { .. }));
        assert!(err.is_connection_error());
        assert!(err.to_string().contains("@anthropic-ai/claude-code"));
    }

    /// Home-relative candidates only, so the host's install never leaks in.
    fn home_fallbacks(home: &Path) -> Vec<PathBuf> {
        vec![
            home.join(".npm-global/bin/claude"),
            home.join(".local/bin/claude"),
            home.join(".bun/bin/claude"),
        ]
    }

    #[test]
    fn missing_override_and_fallbacks_are_skipped() {
        let dir = TempDir::new().unwrap();
        let err = CliLocator::default()
            .with_override(dir.path().join("nope"))
            .with_search_path("")
            .with_fallbacks(home_fallbacks(dir.path()))
            .locate()
            .unwrap_err();
        assert!(matches!(err, ClaudeSdkError::CliNotFound { .. }));
    }

    #[test]
    fn override_wins_when_it_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("my-claude");
        std::fs::write(&path, "").unwrap();
        let located = CliLocator::default().with_override(&path).locate().unwrap();
        assert_eq!(located, path);
    }

    #[cfg(unix)]
    #[test]
    fn search_path_is_scanned() {
        let empty = TempDir::new().unwrap();
        let bin = TempDir::new().unwrap();
        let expected = executable(bin.path(), "claude");
        let search = std::env::join_paths([empty.path(), bin.path()]).unwrap();

        let located = CliLocator::default()
            .with_search_path(search)
            .locate()
            .unwrap();
        assert_eq!(located, expected);
    }

    #[test]
    fn first_existing_fallback_wins() {
        let home = TempDir::new().unwrap();
        let fallbacks = home_fallbacks(home.path());
        let bun = home.path().join(".bun/bin/claude");
        std::fs::create_dir_all(bun.parent().unwrap()).unwrap();
        std::fs::write(&bun, "").unwrap();

        let located = CliLocator::default()
            .with_search_path("")
            .with_fallbacks(fallbacks)
            .locate()
            .unwrap();
        assert_eq!(located, bun);
    }

    #[cfg(unix)]
    #[test]
    fn runtime_present_gives_install_hint() {
        let bin = TempDir::new().unwrap();
        executable(bin.path(), "node");
        let err = CliLocator::default()
            .with_search_path(bin.path())
            .locate()
            .unwrap_err();
        assert_eq!(err.to_string(), INSTALL_HINT);
    }

    #[test]
    fn no_runtime_gives_runtime_hint() {
        let err = CliLocator::default().locate().unwrap_err();
        assert_eq!(err.to_string(), RUNTIME_HINT);
    }

    #[test]
    fn default_fallbacks_are_home_relative() {
        let fallbacks = default_fallbacks(Some(Path::new("/home/u")));
        assert_eq!(fallbacks[0], PathBuf::from("/home/u/.npm-global/bin/claude"));
        assert_eq!(fallbacks[1], PathBuf::from("/usr/local/bin/claude"));
        assert_eq!(fallbacks.len(), 7);
    }

    #[test]
    fn no_home_keeps_only_absolute_fallbacks() {
        let fallbacks = default_fallbacks(None);
        assert_eq!(fallbacks, vec![PathBuf::from("/usr/local/bin/claude")]);
        assert!(fallbacks.iter().all(|p| p.is_absolute()));
    }
}
