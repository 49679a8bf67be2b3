use std::sync::Arc;

use crate::errors::HandrailResult;
use crate::guidance::matcher::ElementMatcher;
use crate::guidance::parser::parse_steps;
use crate::guidance::store::StepStore;
use crate::guidance::types::{
    AnnotatedElement, MatchOutcome, PreviewOutcome, ResolveOutcome, StepPreview,
};

/// Orchestrates one resolution flow: load the active instruction block,
/// parse it, match the requested step, record the outcome. Holds no state
/// across calls; every call reloads from the store.
pub struct StepRunner {
    store: Arc<StepStore>,
    matcher: ElementMatcher,
}

impl StepRunner {
    pub fn new(store: Arc<StepStore>, matcher: ElementMatcher) -> Self {
        Self { store, matcher }
    }

    /// Resolves the step at `step_index` (0-indexed) against `candidates`
    /// and records the resolution under the 1-indexed step number. An index
    /// past the last step reports completion without consulting the matcher.
    pub async fn resolve_step(
        &self,
        key: &str,
        candidates: &[AnnotatedElement],
        step_index: usize,
    ) -> HandrailResult<ResolveOutcome> {
        let Some(instructions) = self.store.read_active_instructions(key) else {
            return Ok(ResolveOutcome::NoInstructions);
        };

        let steps = parse_steps(&instructions);
        if step_index >= steps.len() {
            tracing::info!(key = %key, total_steps = steps.len(), "all steps completed");
            return Ok(ResolveOutcome::Completed {
                total_steps: steps.len(),
            });
        }

        let step_text = &steps[step_index];
        tracing::info!(key = %key, step = step_index + 1, total = steps.len(), "processing step");

        let outcome = self.matcher.match_step(step_text, candidates).await?;
        let selected_element = selection_of(outcome, step_index + 1);

        self.store
            .upsert_resolution(key, step_index + 1, step_text, selected_element.clone())?;

        Ok(ResolveOutcome::Resolved {
            step_number: step_index + 1,
            total_steps: steps.len(),
            step_text: step_text.clone(),
            selected_element,
        })
    }

    /// Matches every step without persisting anything. Garbled replies
    /// yield steps with no selection; backend transport failures abort the
    /// run. Matches run strictly in step order, one at a time.
    pub async fn preview_all_steps(
        &self,
        key: &str,
        candidates: &[AnnotatedElement],
    ) -> HandrailResult<PreviewOutcome> {
        let Some(instructions) = self.store.read_active_instructions(key) else {
            return Ok(PreviewOutcome::NoInstructions);
        };

        let steps = parse_steps(&instructions);
        let mut previews = Vec::with_capacity(steps.len());

        for (i, step_text) in steps.iter().enumerate() {
            tracing::info!(key = %key, step = i + 1, total = steps.len(), "previewing step");
            let outcome = self.matcher.match_step(step_text, candidates).await?;
            previews.push(StepPreview {
                step_number: i + 1,
                step_text: step_text.clone(),
                selected_element: selection_of(outcome, i + 1),
            });
        }

        Ok(PreviewOutcome::Steps(previews))
    }
}

fn selection_of(outcome: MatchOutcome, step_number: usize) -> Option<AnnotatedElement> {
    match outcome {
        MatchOutcome::Matched(element) => Some(element),
        MatchOutcome::NoInteraction => None,
        MatchOutcome::ParseFailed(raw) => {
            tracing::warn!(step = step_number, raw = %raw, "unusable match reply, treating as no selection");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::config::RoleEntry;
    use crate::errors::HandrailError;
    use crate::reasoning::service::{ReasoningRequest, ReasoningService};

    const KEY: &str = "guidance.json";
    const SUBMIT_REPLY: &str = r#"{"id": "ai-1", "tag": "button", "text": "Submit"}"#;

    struct ScriptedService {
        replies: Mutex<VecDeque<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedService {
        fn replying(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Self::replying(&[])
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReasoningService for ScriptedService {
        async fn invoke(&self, _request: ReasoningRequest) -> HandrailResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.lock().unwrap().pop_front() {
                Some(text) => Ok(text),
                None => Err(HandrailError::Reasoning("backend unavailable".to_string())),
            }
        }
    }

    fn select_role() -> RoleEntry {
        RoleEntry {
            models: vec!["openai/gpt-4o-mini".to_string()],
            tool_servers: Vec::new(),
            max_steps: 1,
        }
    }

    fn submit_button() -> AnnotatedElement {
        AnnotatedElement {
            id: "ai-1".to_string(),
            tag: "button".to_string(),
            text: "Submit".to_string(),
        }
    }

    fn runner_with(
        service: Arc<ScriptedService>,
    ) -> (tempfile::TempDir, Arc<StepStore>, StepRunner) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StepStore::new(dir.path().to_path_buf()));
        let matcher = ElementMatcher::new(service, select_role());
        let runner = StepRunner::new(store.clone(), matcher);
        (dir, store, runner)
    }

    #[tokio::test]
    async fn test_missing_instructions_report_without_consulting_matcher() {
        let service = ScriptedService::replying(&["null"]);
        let (_dir, _store, runner) = runner_with(service.clone());

        let outcome = runner.resolve_step(KEY, &[submit_button()], 0).await.unwrap();
        assert_eq!(outcome, ResolveOutcome::NoInstructions);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_submit_flow() {
        let service = ScriptedService::replying(&[SUBMIT_REPLY, "null"]);
        let (_dir, store, runner) = runner_with(service.clone());
        store
            .append_instructions(KEY, "1. Click the red Submit button\n2. Check your email")
            .unwrap();
        let candidates = vec![submit_button()];

        let first = runner.resolve_step(KEY, &candidates, 0).await.unwrap();
        assert_eq!(
            first,
            ResolveOutcome::Resolved {
                step_number: 1,
                total_steps: 2,
                step_text: "1. Click the red Submit button".to_string(),
                selected_element: Some(submit_button()),
            }
        );

        let second = runner.resolve_step(KEY, &candidates, 1).await.unwrap();
        assert_eq!(
            second,
            ResolveOutcome::Resolved {
                step_number: 2,
                total_steps: 2,
                step_text: "2. Check your email".to_string(),
                selected_element: None,
            }
        );

        let third = runner.resolve_step(KEY, &candidates, 2).await.unwrap();
        assert_eq!(third, ResolveOutcome::Completed { total_steps: 2 });
        assert_eq!(service.calls(), 2);

        let history = store.read_resolution_history(KEY);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].selected_element, Some(submit_button()));
        assert_eq!(history[1].selected_element, None);
    }

    #[tokio::test]
    async fn test_index_past_last_step_completes_without_matching() {
        let service = ScriptedService::failing();
        let (_dir, store, runner) = runner_with(service.clone());
        store.append_instructions(KEY, "1. Click X").unwrap();

        let outcome = runner.resolve_step(KEY, &[submit_button()], 5).await.unwrap();
        assert_eq!(outcome, ResolveOutcome::Completed { total_steps: 1 });
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_garbled_reply_resolves_to_no_selection_and_persists() {
        let service = ScriptedService::replying(&["I think you want the submit button"]);
        let (_dir, store, runner) = runner_with(service);
        store.append_instructions(KEY, "1. Click Submit").unwrap();

        let outcome = runner.resolve_step(KEY, &[submit_button()], 0).await.unwrap();
        match outcome {
            ResolveOutcome::Resolved {
                selected_element, ..
            } => assert_eq!(selected_element, None),
            other => panic!("expected a resolved step, got {:?}", other),
        }

        let history = store.read_resolution_history(KEY);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].step_number, 1);
        assert_eq!(history[0].selected_element, None);
    }

    #[tokio::test]
    async fn test_rerunning_a_step_replaces_its_record() {
        let service = ScriptedService::replying(&[SUBMIT_REPLY, "null"]);
        let (_dir, store, runner) = runner_with(service);
        store.append_instructions(KEY, "1. Click Submit").unwrap();
        let candidates = vec![submit_button()];

        runner.resolve_step(KEY, &candidates, 0).await.unwrap();
        runner.resolve_step(KEY, &candidates, 0).await.unwrap();

        let history = store.read_resolution_history(KEY);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].selected_element, None);
    }

    #[tokio::test]
    async fn test_resolution_targets_latest_instruction_block() {
        let service = ScriptedService::replying(&["null"]);
        let (_dir, store, runner) = runner_with(service);
        store.append_instructions(KEY, "1. Old step").unwrap();
        store
            .append_instructions(KEY, "1. New step\n2. Another")
            .unwrap();

        let outcome = runner.resolve_step(KEY, &[], 0).await.unwrap();
        match outcome {
            ResolveOutcome::Resolved {
                step_text,
                total_steps,
                ..
            } => {
                assert_eq!(step_text, "1. New step");
                assert_eq!(total_steps, 2);
            }
            other => panic!("expected a resolved step, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_backend_failure_aborts_and_persists_nothing() {
        let service = ScriptedService::failing();
        let (_dir, store, runner) = runner_with(service);
        store.append_instructions(KEY, "1. Click Submit").unwrap();

        let result = runner.resolve_step(KEY, &[submit_button()], 0).await;
        assert!(matches!(result, Err(HandrailError::Reasoning(_))));
        assert!(store.read_resolution_history(KEY).is_empty());
    }

    #[tokio::test]
    async fn test_preview_matches_every_step_in_order_without_persisting() {
        let service = ScriptedService::replying(&[SUBMIT_REPLY, "null", "garbage reply"]);
        let (_dir, store, runner) = runner_with(service.clone());
        store
            .append_instructions(KEY, "1. Click Submit\n2. Read the banner\n3. Click Done")
            .unwrap();

        let outcome = runner
            .preview_all_steps(KEY, &[submit_button()])
            .await
            .unwrap();
        let previews = match outcome {
            PreviewOutcome::Steps(previews) => previews,
            other => panic!("expected previews, got {:?}", other),
        };

        assert_eq!(previews.len(), 3);
        assert_eq!(previews[0].step_number, 1);
        assert_eq!(previews[0].selected_element, Some(submit_button()));
        assert_eq!(previews[1].selected_element, None);
        assert_eq!(previews[2].selected_element, None);
        assert_eq!(service.calls(), 3);

        assert!(store.read_resolution_history(KEY).is_empty());
    }

    #[tokio::test]
    async fn test_preview_without_instructions() {
        let service = ScriptedService::failing();
        let (_dir, _store, runner) = runner_with(service.clone());

        let outcome = runner.preview_all_steps(KEY, &[]).await.unwrap();
        assert_eq!(outcome, PreviewOutcome::NoInstructions);
        assert_eq!(service.calls(), 0);
    }
}
