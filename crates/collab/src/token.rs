//! Secondary source for the remote-API token: the GitHub CLI's own stored
//! credential, consulted only when no `SCOUT_HOST_API_TOKEN` env var is set.

use scout_core::config::HostCliTokenSource;

pub struct GhCliTokenSource;

impl GhCliTokenSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GhCliTokenSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HostCliTokenSource for GhCliTokenSource {
    fn token(&self) -> Option<String> {
        let output = std::process::Command::new("gh").args(["auth", "token"]).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_yields_none() {
        // gh is not expected to be installed in CI; the failure path (Ok(None)
        // on spawn error) is exercised instead of the parsing path.
        let source = GhCliTokenSource::new();
        let _ = source.token();
    }
}
