//! Title text growth and the elapsed-time score
//!
//! The session opens with the title text growing faster every tick. Once it
//! passes the ceiling the text resets and starts showing the score, and every
//! tenth second the world gets a little busier.

use crate::Tuning;
use crate::consts::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPhase {
    /// Title text is growing
    Growing,
    /// Text shows the elapsed score
    ScoreDisplay,
}

#[derive(Debug, Clone)]
pub struct GrowthPolicy {
    pub phase: GrowthPhase,
    pub text: String,
    pub text_size: f32,
    pub text_alpha: f32,
    pub score: u64,
    step: f32,
    ambient_batch: usize,
    ambient_cap: usize,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::from_tuning(&Tuning::default())
    }
}

impl GrowthPolicy {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            phase: GrowthPhase::Growing,
            text: String::from(" Run !"),
            text_size: TEXT_START_SIZE,
            text_alpha: 0.1,
            score: 0,
            step: 1.0,
            ambient_batch: tuning.ambient_batch,
            ambient_cap: tuning.ambient_cap,
        }
    }

    pub fn is_showing_score(&self) -> bool {
        self.phase == GrowthPhase::ScoreDisplay
    }

    /// Advance one tick at engine `timestamp` (ms).
    ///
    /// Returns how many ambient bodies to request.
    pub fn advance(&mut self, timestamp: f64, ambient_spawned: usize) -> usize {
        match self.phase {
            GrowthPhase::Growing => {
                self.text_alpha = 0.5;
                self.text_size += self.step;
                self.step += 1.1;
                if self.text_size > TEXT_CEILING {
                    self.phase = GrowthPhase::ScoreDisplay;
                    self.text_size = SCORE_TEXT_SIZE;
                    self.text_alpha = 0.2;
                    self.text.clear();
                    log::info!("Title done, showing score");
                }
                0
            }
            GrowthPhase::ScoreDisplay => {
                let next = (timestamp.max(0.0) / 1000.0).floor() as u64;
                let mut request = 0;
                if next != self.score && next > 0 && next % SCORE_MILESTONE_SECS == 0 {
                    self.text_size += SCORE_TEXT_GROWTH;
                    if ambient_spawned < self.ambient_cap {
                        request = self.ambient_batch;
                    }
                }
                self.text = next.to_string();
                self.score = next;
                request
            }
        }
    }
}
