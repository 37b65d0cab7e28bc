//! Pipeline orchestration: drives each prompt config through
//! validation, rendering, generation, and publication, and aggregates
//! per-config outcomes for the batch.
//!
//! Configs are processed sequentially in the order supplied and share no
//! mutable state; a failure marks that config Failed and the batch moves
//! on. Collaborators (generator, store) are injected so tests can run the
//! whole pipeline against fakes.

use crate::error::{KilnError, Result};
use crate::events::{Event, EventAction, RunLog};
use crate::generate::TextGenerator;
use crate::paths;
use crate::prompt::{PromptConfig, RenderedPrompt, Strictness, template};
use crate::publish::{ObjectStore, PublishedArtifact, Publisher};
use crate::settings::Settings;
use crate::workspace::Workspace;
use serde_json::json;
use std::fmt;
use std::fs;

/// Stages a config moves through during a run.
///
/// `Pending → Validating → Rendering → Generating → Publishing → Done`,
/// with `Failed` terminal from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Validating,
    Rendering,
    Generating,
    Publishing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Pending => write!(f, "pending"),
            Stage::Validating => write!(f, "validating"),
            Stage::Rendering => write!(f, "rendering"),
            Stage::Generating => write!(f, "generating"),
            Stage::Publishing => write!(f, "publishing"),
            Stage::Done => write!(f, "done"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one config in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOutcome {
    /// The config reached Done.
    Success {
        config: String,
        destination_key: String,
    },
    /// The config failed at `stage`.
    Failure {
        config: String,
        stage: Stage,
        kind: &'static str,
        message: String,
    },
}

/// Aggregate record for one batch run.
#[derive(Debug, Default)]
pub struct RunResult {
    pub outcomes: Vec<ConfigOutcome>,
}

impl RunResult {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ConfigOutcome::Success { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Drives prompt configs through the pipeline stages.
pub struct Pipeline<'a> {
    workspace: &'a Workspace,
    settings: &'a Settings,
    generator: &'a dyn TextGenerator,
    store: &'a dyn ObjectStore,
    log: RunLog,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        workspace: &'a Workspace,
        settings: &'a Settings,
        generator: &'a dyn TextGenerator,
        store: &'a dyn ObjectStore,
    ) -> Self {
        let log = RunLog::new(workspace.events_path());
        Self {
            workspace,
            settings,
            generator,
            store,
            log,
        }
    }

    /// Process a batch of config names (relative to `prompts/`), in order.
    ///
    /// A failing config is recorded and the batch continues. Only event-log
    /// write failures abort the run itself.
    pub fn run(&self, names: &[String]) -> Result<RunResult> {
        self.log.append(
            &Event::new(EventAction::RunStart)
                .with_details(json!({"configs": names.len(), "prefix": self.settings.prefix})),
        )?;

        let mut result = RunResult::default();
        for name in names {
            println!("Processing {}", name);
            let mut stage = Stage::Pending;

            let processed = self.process(name, &mut stage);

            match processed {
                Ok(artifact) => {
                    println!(
                        "  ok {} ({} bytes)",
                        artifact.destination_key, artifact.byte_len
                    );
                    result.outcomes.push(ConfigOutcome::Success {
                        config: name.clone(),
                        destination_key: artifact.destination_key,
                    });
                }
                Err(err) => {
                    let failed_at = stage;
                    stage = Stage::Failed;
                    eprintln!("  x {} failed while {}: {}", name, failed_at, err);
                    self.log.append(
                        &Event::new(EventAction::ConfigFailed)
                            .with_config(name.clone())
                            .with_details(json!({
                                "stage": failed_at.to_string(),
                                "state": stage.to_string(),
                                "kind": err.kind(),
                                "message": err.to_string(),
                            })),
                    )?;
                    result.outcomes.push(ConfigOutcome::Failure {
                        config: name.clone(),
                        stage: failed_at,
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                }
            }
        }

        self.log.append(
            &Event::new(EventAction::RunComplete).with_details(
                json!({"succeeded": result.succeeded(), "failed": result.failed()}),
            ),
        )?;

        Ok(result)
    }

    /// Drive one config through the stages, advancing `stage` as it goes.
    fn process(&self, name: &str, stage: &mut Stage) -> Result<PublishedArtifact> {
        *stage = Stage::Validating;
        let config = self.load_and_validate(name)?;

        *stage = Stage::Rendering;
        let rendered = self.render(name, &config)?;

        *stage = Stage::Generating;
        let content = self.generate(name, &config, &rendered)?;

        *stage = Stage::Publishing;
        let artifact = self.publish(name, &config, &content)?;

        *stage = Stage::Done;
        Ok(artifact)
    }

    fn load_and_validate(&self, name: &str) -> Result<PromptConfig> {
        let path = paths::resolve(&self.workspace.prompts_dir, name)?;
        let raw = fs::read_to_string(&path).map_err(|e| {
            KilnError::UserError(format!("failed to read config '{}': {}", path.display(), e))
        })?;
        let config = PromptConfig::from_json(&raw)?;

        self.log.append(
            &Event::new(EventAction::Validate)
                .with_config(name)
                .with_details(json!({
                    "template": config.template,
                    "output_name": config.output_name,
                    "model_id": config.model_id,
                })),
        )?;
        Ok(config)
    }

    fn render(&self, name: &str, config: &PromptConfig) -> Result<RenderedPrompt> {
        let template_path = paths::resolve(&self.workspace.templates_dir, &config.template)?;
        let content = template::load_template(&template_path)?;

        let mode = if self.settings.strict_variables {
            Strictness::Strict
        } else {
            Strictness::Loose
        };
        let rendered = template::render(&content, &config.variables, mode)?;

        if !rendered.missing.is_empty() {
            eprintln!(
                "  warning: unresolved variables in '{}': {}",
                config.template,
                rendered.missing.join(", ")
            );
        }

        self.log.append(
            &Event::new(EventAction::Render)
                .with_config(name)
                .with_details(json!({
                    "template": config.template,
                    "bytes": rendered.text.len(),
                    "used": rendered.used,
                    "missing": rendered.missing,
                })),
        )?;
        Ok(rendered)
    }

    fn generate(
        &self,
        name: &str,
        config: &PromptConfig,
        rendered: &RenderedPrompt,
    ) -> Result<String> {
        let content = self
            .generator
            .generate(&rendered.text, &config.model_id, &config.model_params)
            .map_err(KilnError::from)?;

        self.log.append(
            &Event::new(EventAction::Generate)
                .with_config(name)
                .with_details(json!({
                    "model_id": config.model_id,
                    "bytes": content.len(),
                })),
        )?;
        Ok(content)
    }

    fn publish(
        &self,
        name: &str,
        config: &PromptConfig,
        content: &str,
    ) -> Result<PublishedArtifact> {
        let publisher = Publisher::new(
            self.store,
            &self.workspace.outputs_dir,
            &self.settings.prefix,
        );
        let artifact = publisher.publish(content, config)?;

        self.log.append(
            &Event::new(EventAction::Publish)
                .with_config(name)
                .with_details(json!({
                    "key": artifact.destination_key,
                    "bytes": artifact.byte_len,
                })),
        )?;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeGenerator, RecordingStore, create_test_workspace};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn settings() -> Settings {
        Settings::default()
    }

    #[test]
    fn end_to_end_html_artifact() {
        let fixture = create_test_workspace();
        fixture.write_template("greet.txt", "Hello, $name!");
        fixture.write_config(
            "greet.json",
            r#"{"template": "greet.txt", "output_name": "hello", "variables": {"name": "Ada"}}"#,
        );

        let generator = FakeGenerator::echoing();
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["greet.json"])).unwrap();

        assert!(result.is_success());
        assert_eq!(
            result.outcomes[0],
            ConfigOutcome::Success {
                config: "greet.json".to_string(),
                destination_key: "beta/outputs/hello.html".to_string(),
            }
        );

        // The generator saw the fully rendered prompt.
        assert_eq!(generator.calls(), vec!["Hello, Ada!".to_string()]);

        // The store got a wrapped HTML document containing the text verbatim.
        let puts = store.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].key, "beta/outputs/hello.html");
        assert_eq!(puts[0].content_type, "text/html");
        let body = String::from_utf8(puts[0].bytes.clone()).unwrap();
        assert!(body.starts_with("<!DOCTYPE html>"));
        assert!(body.contains("Hello, Ada!"));

        // And the artifact was mirrored locally.
        let local = fixture.workspace.outputs_dir.join("hello.html");
        assert_eq!(fs::read_to_string(local).unwrap(), body);
    }

    #[test]
    fn markdown_artifact_is_byte_identical_to_generated_text() {
        let fixture = create_test_workspace();
        fixture.write_template("notes.txt", "Summarize $topic");
        fixture.write_config(
            "notes.json",
            r#"{"template": "notes.txt", "output_name": "notes", "output_format": "md",
                "variables": {"topic": "the release"}}"#,
        );

        let generator = FakeGenerator::replying("# Release\n\nraw *markdown* body\n");
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["notes.json"])).unwrap();

        assert!(result.is_success());
        let puts = store.puts();
        assert_eq!(puts[0].key, "beta/outputs/notes.md");
        assert_eq!(puts[0].content_type, "text/markdown");
        assert_eq!(puts[0].bytes, b"# Release\n\nraw *markdown* body\n");
    }

    #[test]
    fn traversal_config_name_is_rejected_before_any_read() {
        let fixture = create_test_workspace();
        let generator = FakeGenerator::echoing();
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["../../etc/passwd"])).unwrap();

        match &result.outcomes[0] {
            ConfigOutcome::Failure { stage, kind, .. } => {
                assert_eq!(*stage, Stage::Validating);
                assert_eq!(*kind, "path_traversal");
            }
            other => panic!("expected Failure, got {:?}", other),
        }
        assert!(generator.calls().is_empty());
    }

    #[test]
    fn traversal_template_reference_is_rejected_before_any_read() {
        let fixture = create_test_workspace();
        fixture.write_config(
            "evil.json",
            r#"{"template": "../../etc/passwd", "output_name": "x", "variables": {}}"#,
        );

        let generator = FakeGenerator::echoing();
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["evil.json"])).unwrap();

        match &result.outcomes[0] {
            ConfigOutcome::Failure { stage, kind, .. } => {
                assert_eq!(*stage, Stage::Validating);
                assert_eq!(*kind, "config_validation");
            }
            other => panic!("expected Failure, got {:?}", other),
        }
        assert!(generator.calls().is_empty());
    }

    #[test]
    fn strict_mode_fails_rendering_before_generation() {
        let fixture = create_test_workspace();
        fixture.write_template("greet.txt", "Hello, $name!");
        fixture.write_config(
            "greet.json",
            r#"{"template": "greet.txt", "output_name": "hello", "variables": {}}"#,
        );

        let generator = FakeGenerator::echoing();
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["greet.json"])).unwrap();

        match &result.outcomes[0] {
            ConfigOutcome::Failure {
                stage,
                kind,
                message,
                ..
            } => {
                assert_eq!(*stage, Stage::Rendering);
                assert_eq!(*kind, "missing_variable");
                assert!(message.contains("'name'"));
            }
            other => panic!("expected Failure, got {:?}", other),
        }
        assert!(generator.calls().is_empty());
        assert!(store.puts().is_empty());
    }

    #[test]
    fn loose_mode_leaves_placeholder_and_proceeds() {
        let fixture = create_test_workspace();
        fixture.write_template("greet.txt", "Hello, $name!");
        fixture.write_config(
            "greet.json",
            r#"{"template": "greet.txt", "output_name": "hello", "output_format": "md",
                "variables": {}}"#,
        );

        let generator = FakeGenerator::echoing();
        let store = RecordingStore::succeeding();
        let settings = Settings {
            strict_variables: false,
            ..Settings::default()
        };
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["greet.json"])).unwrap();

        assert!(result.is_success());
        assert_eq!(generator.calls(), vec!["Hello, $name!".to_string()]);
        assert_eq!(store.puts()[0].bytes, b"Hello, $name!");
    }

    #[test]
    fn quota_failure_is_recorded_at_generating_stage() {
        let fixture = create_test_workspace();
        fixture.write_template("greet.txt", "Hi");
        fixture.write_config(
            "greet.json",
            r#"{"template": "greet.txt", "output_name": "hello", "variables": {}}"#,
        );

        let generator = FakeGenerator::throttling();
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["greet.json"])).unwrap();

        match &result.outcomes[0] {
            ConfigOutcome::Failure { stage, kind, .. } => {
                assert_eq!(*stage, Stage::Generating);
                assert_eq!(*kind, "generation_quota");
            }
            other => panic!("expected Failure, got {:?}", other),
        }
        assert!(store.puts().is_empty());
    }

    #[test]
    fn access_failure_is_recorded_at_generating_stage() {
        let fixture = create_test_workspace();
        fixture.write_template("greet.txt", "Hi");
        fixture.write_config(
            "greet.json",
            r#"{"template": "greet.txt", "output_name": "hello", "variables": {}}"#,
        );

        let generator = FakeGenerator::denying_access();
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["greet.json"])).unwrap();

        match &result.outcomes[0] {
            ConfigOutcome::Failure { stage, kind, .. } => {
                assert_eq!(*stage, Stage::Generating);
                assert_eq!(*kind, "generation_access");
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[test]
    fn publish_failure_after_generation_is_a_distinct_partial_failure() {
        let fixture = create_test_workspace();
        fixture.write_template("greet.txt", "Hi");
        fixture.write_config(
            "greet.json",
            r#"{"template": "greet.txt", "output_name": "hello", "variables": {}}"#,
        );

        let generator = FakeGenerator::echoing();
        let store = RecordingStore::denying_access();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["greet.json"])).unwrap();

        match &result.outcomes[0] {
            ConfigOutcome::Failure { stage, kind, .. } => {
                assert_eq!(*stage, Stage::Publishing);
                assert_eq!(*kind, "publish");
            }
            other => panic!("expected Failure, got {:?}", other),
        }
        // Content was generated; only persistence failed.
        assert_eq!(generator.calls().len(), 1);
    }

    #[test]
    fn failing_config_does_not_abort_the_batch() {
        let fixture = create_test_workspace();
        fixture.write_template("greet.txt", "Hi $name");
        fixture.write_config("bad.json", "{not json");
        fixture.write_config(
            "good.json",
            r#"{"template": "greet.txt", "output_name": "ok", "output_format": "md",
                "variables": {"name": "Ada"}}"#,
        );

        let generator = FakeGenerator::echoing();
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline
            .run(&names(&["bad.json", "good.json"]))
            .unwrap();

        assert_eq!(result.total(), 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.succeeded(), 1);
        assert!(matches!(
            result.outcomes[0],
            ConfigOutcome::Failure {
                stage: Stage::Validating,
                ..
            }
        ));
        assert!(matches!(result.outcomes[1], ConfigOutcome::Success { .. }));
    }

    #[test]
    fn missing_config_file_fails_at_validating() {
        let fixture = create_test_workspace();
        let generator = FakeGenerator::echoing();
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        let result = pipeline.run(&names(&["absent.json"])).unwrap();

        match &result.outcomes[0] {
            ConfigOutcome::Failure { stage, kind, .. } => {
                assert_eq!(*stage, Stage::Validating);
                assert_eq!(*kind, "user_error");
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[test]
    fn successful_run_logs_the_full_event_sequence() {
        let fixture = create_test_workspace();
        fixture.write_template("greet.txt", "Hi");
        fixture.write_config(
            "greet.json",
            r#"{"template": "greet.txt", "output_name": "hello", "variables": {}}"#,
        );

        let generator = FakeGenerator::echoing();
        let store = RecordingStore::succeeding();
        let settings = settings();
        let pipeline = Pipeline::new(&fixture.workspace, &settings, &generator, &store);

        pipeline.run(&names(&["greet.json"])).unwrap();

        let content = fs::read_to_string(fixture.workspace.events_path()).unwrap();
        let actions: Vec<String> = content
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["action"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            actions,
            vec![
                "run_start",
                "validate",
                "render",
                "generate",
                "publish",
                "run_complete"
            ]
        );
    }

    #[test]
    fn stage_display_names() {
        assert_eq!(Stage::Pending.to_string(), "pending");
        assert_eq!(Stage::Validating.to_string(), "validating");
        assert_eq!(Stage::Rendering.to_string(), "rendering");
        assert_eq!(Stage::Generating.to_string(), "generating");
        assert_eq!(Stage::Publishing.to_string(), "publishing");
        assert_eq!(Stage::Done.to_string(), "done");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
