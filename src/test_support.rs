//! Shared fixtures for kiln tests: a scaffolded temp workspace plus fake
//! generation and storage collaborators, so the pipeline runs end-to-end
//! without network access.

use crate::generate::{GenerateError, ModelParams, TextGenerator};
use crate::publish::{ObjectStore, StoreError};
use crate::workspace::Workspace;
use std::cell::RefCell;
use std::fs;
use tempfile::TempDir;

/// A temp directory scaffolded with the kiln workspace layout.
pub(crate) struct TestWorkspace {
    // Held so the directory outlives the fixture.
    _dir: TempDir,
    pub workspace: Workspace,
}

pub(crate) fn create_test_workspace() -> TestWorkspace {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::resolve_from(dir.path());
    fs::create_dir_all(&workspace.prompts_dir).unwrap();
    fs::create_dir_all(&workspace.templates_dir).unwrap();
    TestWorkspace {
        _dir: dir,
        workspace,
    }
}

impl TestWorkspace {
    pub fn write_template(&self, name: &str, content: &str) {
        fs::write(self.workspace.templates_dir.join(name), content).unwrap();
    }

    pub fn write_config(&self, name: &str, json: &str) {
        fs::write(self.workspace.prompts_dir.join(name), json).unwrap();
    }
}

/// How a [`FakeGenerator`] responds.
pub(crate) enum GeneratorBehavior {
    /// Return the prompt itself as the generated text.
    Echo,
    /// Return a fixed reply.
    Reply(String),
    /// Fail with an access error.
    DenyAccess,
    /// Fail with a quota error.
    Throttle,
}

/// Recording [`TextGenerator`] fake.
pub(crate) struct FakeGenerator {
    behavior: GeneratorBehavior,
    calls: RefCell<Vec<String>>,
}

impl FakeGenerator {
    pub fn echoing() -> Self {
        Self::with_behavior(GeneratorBehavior::Echo)
    }

    pub fn replying(reply: impl Into<String>) -> Self {
        Self::with_behavior(GeneratorBehavior::Reply(reply.into()))
    }

    pub fn denying_access() -> Self {
        Self::with_behavior(GeneratorBehavior::DenyAccess)
    }

    pub fn throttling() -> Self {
        Self::with_behavior(GeneratorBehavior::Throttle)
    }

    fn with_behavior(behavior: GeneratorBehavior) -> Self {
        Self {
            behavior,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Prompts this fake has been asked to generate from.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl TextGenerator for FakeGenerator {
    fn generate(
        &self,
        prompt: &str,
        _model_id: &str,
        _params: &ModelParams,
    ) -> Result<String, GenerateError> {
        self.calls.borrow_mut().push(prompt.to_string());
        match &self.behavior {
            GeneratorBehavior::Echo => Ok(prompt.to_string()),
            GeneratorBehavior::Reply(reply) => Ok(reply.clone()),
            GeneratorBehavior::DenyAccess => {
                Err(GenerateError::Access("HTTP 403: denied".to_string()))
            }
            GeneratorBehavior::Throttle => {
                Err(GenerateError::Quota("HTTP 429: throttled".to_string()))
            }
        }
    }
}

/// One recorded `put` call.
#[derive(Debug, Clone)]
pub(crate) struct PutRecord {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// How a [`RecordingStore`] responds.
enum StoreBehavior {
    Succeed,
    DenyAccess,
}

/// Recording [`ObjectStore`] fake.
pub(crate) struct RecordingStore {
    behavior: StoreBehavior,
    puts: RefCell<Vec<PutRecord>>,
}

impl RecordingStore {
    pub fn succeeding() -> Self {
        Self {
            behavior: StoreBehavior::Succeed,
            puts: RefCell::new(Vec::new()),
        }
    }

    pub fn denying_access() -> Self {
        Self {
            behavior: StoreBehavior::DenyAccess,
            puts: RefCell::new(Vec::new()),
        }
    }

    /// Every `put` this fake has received, including denied ones.
    pub fn puts(&self) -> Vec<PutRecord> {
        self.puts.borrow().clone()
    }
}

impl ObjectStore for RecordingStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        match self.behavior {
            StoreBehavior::Succeed => {
                self.puts.borrow_mut().push(PutRecord {
                    key: key.to_string(),
                    bytes: bytes.to_vec(),
                    content_type: content_type.to_string(),
                });
                Ok(())
            }
            StoreBehavior::DenyAccess => {
                Err(StoreError::AccessDenied("HTTP 403: denied".to_string()))
            }
        }
    }
}
