use crate::conduit::ConduitApi;
use crate::error::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // The process cwd is global; serialise changes even without #[serial].
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Repository on `main` with one commit adding `README.md`.
pub(crate) fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    git(path, &["init"]);
    // Deterministic default branch regardless of the host's git config.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);
    git(path, &["config", "commit.gpgsign", "false"]);

    std::fs::write(path.join("README.md"), "# Test\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-m", "Initial commit"]);

    temp_dir
}

/// Stage everything and commit with `message`.
pub(crate) fn commit_all(repo_dir: &Path, message: &str) {
    git(repo_dir, &["add", "-A"]);
    git(repo_dir, &["commit", "-m", message]);
}

fn git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }
}

type Handler = Box<dyn Fn(&str, &Value) -> Result<Value> + Send + Sync>;

/// Scripted [`ConduitApi`] recording every call it receives.
pub(crate) struct FakeConduit {
    handler: Handler,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeConduit {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call so far, in order.
    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    /// Arguments of every call to `method`, in order.
    pub(crate) fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| name == method)
            .map(|(_, args)| args)
            .collect()
    }
}

impl ConduitApi for FakeConduit {
    fn call(&self, method: &str, args: Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), args.clone()));
        (self.handler)(method, &args)
    }
}
