//! Bearer credentials kept in a file between command invocations.

use consult_core::session::CredentialsProvider;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads the bearer token from a file on every call.
///
/// Invalidation deletes the file, so the next invocation starts signed out.
#[derive(Debug, Clone)]
pub struct TokenFileSession {
    path: PathBuf,
}

impl TokenFileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stores `token`, replacing any previous one.
    pub fn sign_in(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token.trim())
    }

    pub fn is_signed_in(&self) -> bool {
        self.bearer_token().is_some()
    }
}

impl CredentialsProvider for TokenFileSession {
    fn bearer_token(&self) -> Option<String> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let token = contents.trim();
        (!token.is_empty()).then(|| token.to_owned())
    }

    fn invalidate(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::warn!(path = %self.path.display(), "session expired; sign in again"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(path = %self.path.display(), "failed to clear session: {}", e),
        }
    }
}
