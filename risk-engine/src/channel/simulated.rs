//! Simulated analysis channel.
//!
//! Cycles through five risk stages, `frames_per_stage` frames each, so a
//! demo shows the verdict climbing from low to very high and wrapping
//! around. Every value carries a small random jitter.

use super::{AnalysisChannel, ChannelConfig, ChannelMode, Frame, VideoFeatures, VideoVerdict};
use crate::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

struct Stage {
    base_risk: f64,
    reason: &'static str,
    face_count: u32,
    eye_contact: f64,
}

static STAGES: [Stage; 5] = [
    Stage {
        base_risk: 0.15,
        reason: "Low risk: Normal video patterns detected",
        face_count: 1,
        eye_contact: 0.8,
    },
    Stage {
        base_risk: 0.35,
        reason: "Slight risk: Some unusual patterns in audio",
        face_count: 1,
        eye_contact: 0.6,
    },
    Stage {
        base_risk: 0.55,
        reason: "Medium risk: Unusual video angle and reduced eye contact",
        face_count: 1,
        eye_contact: 0.3,
    },
    Stage {
        base_risk: 0.75,
        reason: "High risk: Multiple scam indicators detected",
        face_count: 2,
        eye_contact: 0.1,
    },
    Stage {
        base_risk: 0.9,
        reason: "Very high risk: Multiple strong scam indicators",
        face_count: 0,
        eye_contact: 0.0,
    },
];

/// Local stand-in for the analysis server
pub struct SimulatedChannel {
    frames_seen: u64,
    frames_per_stage: u64,
    jitter: f64,
    rng: StdRng,
}

impl SimulatedChannel {
    /// Create from the channel configuration
    pub fn new(config: &ChannelConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            frames_seen: 0,
            frames_per_stage: config.frames_per_stage.max(1),
            jitter: config.jitter.clamp(0.0, 0.5),
            rng,
        }
    }

    fn stage(&self) -> &'static Stage {
        let index = (self.frames_seen / self.frames_per_stage) % STAGES.len() as u64;
        &STAGES[index as usize]
    }

    fn verdict(&mut self) -> VideoVerdict {
        let stage = self.stage();
        let jitter = if self.jitter > 0.0 {
            self.rng.gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        let confidence = (stage.base_risk + jitter).clamp(0.0, 1.0);

        let sub_score = |offset: f64, spread: f64, rng: &mut StdRng| {
            (confidence + offset + rng.gen::<f64>() * spread).clamp(0.1, 0.95)
        };
        let visual = sub_score(-0.1, 0.2, &mut self.rng);
        let audio = sub_score(0.05, 0.15, &mut self.rng);
        let text = sub_score(-0.05, 0.1, &mut self.rng);

        VideoVerdict {
            is_scam: confidence > 0.5,
            confidence,
            visual_confidence: Some(visual),
            audio_confidence: Some(audio),
            text_confidence: Some(text),
            reason: Some(stage.reason.to_string()),
            features: VideoFeatures {
                face_count: stage.face_count,
                face_ratio: 0.3 + self.rng.gen::<f64>() * 0.4,
                eye_contact: stage.eye_contact,
                edge_density: 0.2 + confidence * 0.6,
            },
        }
    }
}

#[async_trait]
impl AnalysisChannel for SimulatedChannel {
    fn mode(&self) -> ChannelMode {
        ChannelMode::Simulated
    }

    async fn analyze(&mut self, _frame: &Frame) -> Result<VideoVerdict> {
        let verdict = self.verdict();
        self.frames_seen += 1;
        Ok(verdict)
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
