//! Shared test utilities for integration tests.
//!
//! Not all helpers are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use hermod::error::{HookError, LlmError};
use hermod::hooks::runner::{HookRunOutput, HookRunner};
use hermod::llm::client::{Completion, CompletionClient};
use hermod::secrets::SecretEncryptor;

/// A test git repository builder.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new git repository in a temp directory with an initial commit.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open config");
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();

            let sig = Signature::now("Test User", "test@example.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
                .unwrap();
        }
        Self { dir, repo }
    }

    /// Write a file relative to the repository root.
    pub fn write_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Stage and commit a file, returning the commit OID.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> Oid {
        self.write_file(name, content);
        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let parent = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
            .unwrap()
    }

    /// Message of the commit HEAD points at.
    pub fn head_message(&self) -> String {
        self.repo
            .head()
            .unwrap()
            .peel_to_commit()
            .unwrap()
            .message()
            .unwrap()
            .to_string()
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> usize {
        let mut walk = self.repo.revwalk().unwrap();
        walk.push_head().unwrap();
        walk.count()
    }
}

/// A hook runner that replays scripted outputs, one per invocation.
///
/// The last output repeats once the script is exhausted.
pub struct ScriptedHookRunner {
    outputs: Mutex<VecDeque<HookRunOutput>>,
    last: HookRunOutput,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedHookRunner {
    pub fn new(outputs: Vec<(&str, i32)>) -> Self {
        let queue: VecDeque<HookRunOutput> = outputs
            .into_iter()
            .map(|(text, code)| HookRunOutput {
                output: text.to_string(),
                exit_code: code,
            })
            .collect();
        let last = queue
            .back()
            .cloned()
            .unwrap_or_else(|| HookRunOutput {
                output: String::new(),
                exit_code: 0,
            });
        Self {
            outputs: Mutex::new(queue),
            last,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HookRunner for ScriptedHookRunner {
    async fn run(&self, path: &str) -> Result<HookRunOutput, HookError> {
        self.calls.lock().unwrap().push(path.to_string());
        let mut outputs = self.outputs.lock().unwrap();
        Ok(outputs.pop_front().unwrap_or_else(|| self.last.clone()))
    }
}

/// A completion client that replays scripted responses.
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<String, ()>>>,
    pub calls: Mutex<usize>,
}

impl ScriptedClient {
    /// `Ok(text)` yields a completion; `Err(())` yields an empty response.
    pub fn new(responses: Vec<Result<&str, ()>>) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            calls: Mutex::new(0),
        }
    }

    pub fn always(text: &str) -> Self {
        Self::new(vec![Ok(text)])
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _system: &str, _user: &str) -> Result<Completion, LlmError> {
        *self.calls.lock().unwrap() += 1;
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(Completion {
                raw: text.clone(),
                text,
            }),
            // Err entries and an exhausted script both read as an empty response.
            Some(Err(())) | None => Ok(Completion {
                text: String::new(),
                raw: String::new(),
            }),
        }
    }
}

/// An encryptor that records which paths it was asked to encrypt.
#[derive(Default)]
pub struct RecordingEncryptor {
    pub encrypted: Mutex<Vec<String>>,
}

#[async_trait]
impl SecretEncryptor for RecordingEncryptor {
    async fn encrypt(&self, path: &str) -> Result<(), hermod::error::SecretError> {
        self.encrypted.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
