//! Command implementations for phabstack.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, and the session both commands open against the current
//! repository.

mod reorg;
mod submit;

use crate::cancel::CancelFlag;
use crate::cli::Command;
use crate::conduit::{HttpConduit, Phabricator};
use crate::config::Config;
use crate::error::Result;
use crate::git::get_repo_root;
use crate::vcs::GitVcs;
use std::path::{Path, PathBuf};

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command, cancel: &CancelFlag) -> Result<()> {
    match command {
        Command::Submit(args) => submit::cmd_submit(args, cancel),
        Command::Reorg(args) => reorg::cmd_reorg(args, cancel),
    }
}

/// Repository, configuration and server connection of one command run.
pub(crate) struct Session {
    pub root: PathBuf,
    pub config: Config,
    pub vcs: GitVcs,
    pub phab: Phabricator<HttpConduit>,
}

impl Session {
    /// Open a session for the repository containing the current directory.
    pub(crate) fn open() -> Result<Self> {
        Self::open_at(".")
    }

    pub(crate) fn open_at<P: AsRef<Path>>(cwd: P) -> Result<Self> {
        let root = get_repo_root(cwd)?;
        let config = Config::discover(&root)?;
        let conduit = HttpConduit::new(config.require_url()?, &config.api_token()?)?;

        Ok(Self {
            vcs: GitVcs::new(&root),
            phab: Phabricator::new(conduit),
            root,
            config,
        })
    }

    /// `base` if given, the configured default otherwise.
    pub(crate) fn base(&self, base: Option<String>) -> String {
        base.unwrap_or_else(|| self.config.default_base())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{API_TOKEN_ENV, CONFIG_FILE_NAME};
    use crate::error::PhabError;
    use crate::test_support::{DirGuard, create_test_repo};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_session_opens_from_repo_subdirectory() {
        let temp_dir = create_test_repo();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "phabricator_url: https://phab.example.com\napi_token: api-secret\nmain_branch: trunk\n",
        )
        .unwrap();
        let nested = temp_dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let _guard = DirGuard::new(&nested);
        // SAFETY: serialised with the other tests touching the environment.
        unsafe { std::env::remove_var(API_TOKEN_ENV) };

        let session = Session::open().unwrap();

        assert_eq!(
            session.root.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
        assert_eq!(session.config.main_branch, "trunk");
        assert_eq!(session.base(None), "origin/trunk");
        assert_eq!(session.base(Some("HEAD~2".to_string())), "HEAD~2");
    }

    #[test]
    #[serial]
    fn test_session_requires_phabricator_url() {
        let temp_dir = create_test_repo();

        let result = Session::open_at(temp_dir.path());

        assert!(matches!(result, Err(PhabError::UserError(ref msg)) if msg.contains("phabricator_url")));
    }

    #[test]
    fn test_session_outside_repository_is_user_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();

        let result = Session::open_at(temp_dir.path());

        assert!(matches!(result, Err(PhabError::UserError(_))));
    }
}
