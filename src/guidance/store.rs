use std::path::{Component, Path, PathBuf};

use chrono::Utc;

use crate::errors::{HandrailError, HandrailResult};
use crate::guidance::types::{AnnotatedElement, GuidanceRecord, ResolutionRecord};

/// Owns the persisted guidance record for each storage key.
///
/// Every operation is a whole-record cycle: load, modify, overwrite. There is
/// no locking or transaction, so concurrent writers to the same key must be
/// serialized by the caller (one active session per key).
pub struct StepStore {
    data_dir: PathBuf,
}

impl StepStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Keys are plain relative paths under the data directory. Backslash
    /// and colon are Windows path syntax (`\x` and `C:x` re-target a join
    /// there), so keys carrying either are rejected on every platform.
    fn record_path(&self, key: &str) -> HandrailResult<PathBuf> {
        let rel = Path::new(key);
        let escapes = key.is_empty()
            || key.contains(['\\', ':'])
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(HandrailError::Storage(format!(
                "record key '{key}' escapes the data directory"
            )));
        }
        Ok(self.data_dir.join(rel))
    }

    fn load(&self, key: &str) -> HandrailResult<GuidanceRecord> {
        let path = self.record_path(key)?;
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn persist(&self, key: &str, record: &GuidanceRecord) -> HandrailResult<()> {
        let path = self.record_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), "record persisted");
        Ok(())
    }

    /// Appends one instruction block, initializing a fresh record when the
    /// key is missing or unreadable. Corruption is logged and treated as
    /// empty state, so earlier content under a corrupt key is lost.
    pub fn append_instructions(&self, key: &str, text: &str) -> HandrailResult<()> {
        let mut record = match self.load(key) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "record missing or unreadable, starting fresh");
                GuidanceRecord::default()
            }
        };
        record.instructions.push(text.to_string());
        self.persist(key, &record)?;
        tracing::info!(key = %key, blocks = record.instructions.len(), "instruction block appended");
        Ok(())
    }

    /// Last appended instruction block, or `None` when the record is missing,
    /// unreadable, or holds no usable block. Empty text counts as absent.
    pub fn read_active_instructions(&self, key: &str) -> Option<String> {
        let record = match self.load(key) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "no readable record for key");
                return None;
            }
        };
        let active = record
            .instructions
            .last()
            .filter(|text| !text.is_empty())
            .cloned();
        if active.is_none() {
            tracing::warn!(key = %key, "record holds no instruction blocks");
        }
        active
    }

    /// Records the resolution for one step, replacing any earlier resolution
    /// with the same step number. Fails when the record is unreadable; there
    /// must already be an instruction set to attach resolutions to.
    pub fn upsert_resolution(
        &self,
        key: &str,
        step_number: usize,
        step_text: &str,
        selected_element: Option<AnnotatedElement>,
    ) -> HandrailResult<()> {
        let mut record = match self.load(key) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "cannot record resolution, record unreadable");
                return Err(HandrailError::Storage(format!(
                    "cannot record resolution for '{key}': {e}"
                )));
            }
        };

        let resolution = ResolutionRecord {
            step_number,
            step_text: step_text.to_string(),
            selected_element,
            timestamp: Utc::now(),
        };

        match record
            .selected_elements
            .iter()
            .position(|r| r.step_number == step_number)
        {
            Some(i) => record.selected_elements[i] = resolution,
            None => record.selected_elements.push(resolution),
        }

        self.persist(key, &record)?;
        tracing::info!(key = %key, step = step_number, "resolution recorded");
        Ok(())
    }

    /// Every recorded resolution for the key, in insertion order. Empty when
    /// the record is missing or unreadable.
    pub fn read_resolution_history(&self, key: &str) -> Vec<ResolutionRecord> {
        match self.load(key) {
            Ok(record) => record.selected_elements,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "no readable record for key");
                Vec::new()
            }
        }
    }
}
