//! Data-driven game balance
//!
//! Every playtested constant from [`crate::consts`] can be overridden here,
//! either in code or from a JSON document shipped next to the page.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::{Error, Result};

/// How remote peers are diffed against the body registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Use the added/removed lists carried by change notifications
    #[default]
    Push,
    /// Diff the snapshot against the registry every tick. Cannot see an add
    /// and a remove that land in the same tick (the counts cancel out).
    Pull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player_radius: f32,
    pub remote_opacity: f32,

    pub min_scale: f32,
    pub max_scale: f32,
    pub shrink_step: f32,
    pub grow_step: f32,
    pub recover_step: f32,
    pub recover_interval_ms: f64,
    pub scale_debounce_ms: f64,

    pub attraction_k: f32,
    pub steer_gain: f32,

    pub initial_ambient: usize,
    pub ambient_batch: usize,
    pub ambient_cap: usize,
    pub ambient_spawn_delay_ms: f64,

    pub reconcile_mode: ReconcileMode,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player_radius: PLAYER_RADIUS,
            remote_opacity: REMOTE_OPACITY,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            shrink_step: SHRINK_STEP,
            grow_step: GROW_STEP,
            recover_step: RECOVER_STEP,
            recover_interval_ms: RECOVER_INTERVAL_MS,
            scale_debounce_ms: SCALE_DEBOUNCE_MS,
            attraction_k: ATTRACTION_K,
            steer_gain: STEER_GAIN,
            initial_ambient: INITIAL_AMBIENT,
            ambient_batch: AMBIENT_BATCH,
            ambient_cap: AMBIENT_CAP,
            ambient_spawn_delay_ms: AMBIENT_SPAWN_DELAY_MS,
            reconcile_mode: ReconcileMode::Push,
        }
    }
}

impl Tuning {
    /// Parse and validate a tuning document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning =
            serde_json::from_str(json).map_err(|e| Error::InvalidTuning(e.to_string()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_scale > 0.0 && self.min_scale < 1.0 && self.max_scale >= 1.0) {
            return Err(Error::InvalidTuning(format!(
                "scale limits must satisfy 0 < min < 1 <= max (got {} / {})",
                self.min_scale, self.max_scale
            )));
        }
        if self.shrink_step <= 0.0 || self.grow_step <= 0.0 || self.recover_step <= 0.0 {
            return Err(Error::InvalidTuning("scale steps must be positive".into()));
        }
        if self.player_radius <= 0.0 {
            return Err(Error::InvalidTuning("player radius must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.remote_opacity) {
            return Err(Error::InvalidTuning("remote opacity must be within 0..=1".into()));
        }
        if self.recover_interval_ms < 0.0
            || self.scale_debounce_ms < 0.0
            || self.ambient_spawn_delay_ms < 0.0
        {
            return Err(Error::InvalidTuning("intervals cannot be negative".into()));
        }
        Ok(())
    }

    /// Clamp a scale into the configured limits. Never panics, even when the
    /// limits are inverted; the upper limit wins then.
    #[inline]
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.max(self.min_scale).min(self.max_scale)
    }
}
