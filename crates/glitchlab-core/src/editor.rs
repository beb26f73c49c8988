use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::buffer::{PixelBuffer, Selection};
use crate::commands::{EffectHistory, SnapshotPolicy};
use crate::effects::{EffectRecord, EffectType, Parameters};
use crate::error::{CoreError, Result};
use crate::pipeline::{EffectContext, EffectRegistry};

/// Editor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub snapshot_policy: SnapshotPolicy,
    /// Seeds the random source for stochastic effects. `None` seeds from
    /// entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Empty,
    Loaded,
    Modified,
}

#[derive(Debug, Clone)]
struct Session {
    original: PixelBuffer,
    current: PixelBuffer,
}

/// One editing session over a single image: the original, the current
/// result and the history that links them.
pub struct Editor {
    registry: EffectRegistry,
    settings: EditorSettings,
    session: Option<Session>,
    history: EffectHistory,
    rng: ChaCha8Rng,
    /// Seed the next committed record receives, and the one previews use.
    pending_seed: u64,
}

impl Editor {
    pub fn new(settings: EditorSettings) -> Self {
        Self::with_registry(settings, EffectRegistry::with_builtins())
    }

    pub fn with_registry(settings: EditorSettings, registry: EffectRegistry) -> Self {
        let mut rng = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let pending_seed = rng.next_u64();
        Self {
            registry,
            history: EffectHistory::new(settings.snapshot_policy),
            settings,
            session: None,
            rng,
            pending_seed,
        }
    }

    /// Replace the image being edited. History is cleared.
    pub fn load(&mut self, buffer: PixelBuffer) {
        tracing::info!(width = buffer.width(), height = buffer.height(), "image loaded");
        self.session = Some(Session {
            current: buffer.clone(),
            original: buffer,
        });
        self.history = EffectHistory::new(self.settings.snapshot_policy);
    }

    /// Apply an effect to the current buffer and record it. Returns the new
    /// record's id.
    pub fn apply(
        &mut self,
        effect_type: EffectType,
        parameters: Parameters,
        selections: Vec<Selection>,
    ) -> Result<Uuid> {
        let record = EffectRecord::with_parameters(effect_type, parameters).selections(selections);
        self.apply_record(record)
    }

    /// Apply a prepared record. Records without a seed get the pending one.
    #[tracing::instrument(level = "debug", skip_all, fields(effect = %record.effect_type))]
    pub fn apply_record(&mut self, mut record: EffectRecord) -> Result<Uuid> {
        let session = self.session.as_mut().ok_or(CoreError::NoImageLoaded)?;
        let seeded_here = record.seed.is_none();
        if seeded_here {
            record.seed = Some(self.pending_seed);
        }
        let id = record.id;
        session.current = self.history.apply(&self.registry, &session.current, record)?;
        if seeded_here {
            self.pending_seed = self.rng.next_u64();
        }
        tracing::debug!(%id, depth = self.history.len(), "effect applied");
        Ok(id)
    }

    /// Compute an effect against the current buffer without committing
    /// anything. Uses the seed the next `apply` will use.
    pub fn preview(
        &self,
        effect_type: EffectType,
        parameters: &Parameters,
        selections: &[Selection],
    ) -> Result<PixelBuffer> {
        let session = self.session.as_ref().ok_or(CoreError::NoImageLoaded)?;
        self.registry.execute(
            effect_type,
            &session.current,
            parameters,
            selections,
            &EffectContext::seeded(self.pending_seed),
        )
    }

    /// Revert the last applied effect.
    pub fn undo(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(CoreError::NoImageLoaded)?;
        let description = self.history.undo_description().map(str::to_string);
        session.current = self.history.undo(&self.registry, &session.original)?;
        tracing::info!(effect = description.as_deref().unwrap_or(""), "undo");
        Ok(())
    }

    /// Drop every effect and return to the original image.
    pub fn reset(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(CoreError::NoImageLoaded)?;
        session.current = session.original.clone();
        self.history.clear();
        tracing::info!("reset to original");
        Ok(())
    }

    /// Rebuild the current buffer from the original and the history.
    pub fn replay(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(CoreError::NoImageLoaded)?;
        session.current = self.history.replay(&self.registry, &session.original)?;
        Ok(())
    }

    /// Remove one effect from anywhere in the history and replay the rest.
    pub fn remove_effect(&mut self, id: Uuid) -> Result<EffectRecord> {
        let session = self.session.as_mut().ok_or(CoreError::NoImageLoaded)?;
        let removed = self.history.remove(id)?;
        session.current = self.history.replay(&self.registry, &session.original)?;
        tracing::info!(effect = removed.description(), "effect removed");
        Ok(removed)
    }

    pub fn state(&self) -> EditorState {
        match (&self.session, self.history.is_empty()) {
            (None, _) => EditorState::Empty,
            (Some(_), true) => EditorState::Loaded,
            (Some(_), false) => EditorState::Modified,
        }
    }

    pub fn current(&self) -> Option<&PixelBuffer> {
        self.session.as_ref().map(|s| &s.current)
    }

    pub fn original(&self) -> Option<&PixelBuffer> {
        self.session.as_ref().map(|s| &s.original)
    }

    pub fn history(&self) -> &EffectHistory {
        &self.history
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}
