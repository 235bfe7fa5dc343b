//! Drag-to-dismiss gesture tracking.
//!
//! Progress is a pure function of the total translation reported by the
//! gesture recognizer; nothing is integrated between samples. The only state
//! carried across callbacks is the content frame captured when the drag began.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::config::DismissOptions;
use crate::geometry::{Rect, Size, Vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GesturePhase {
    Began,
    Changed,
    Ended,
    Cancelled,
}

/// One callback from the pan recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DismissSample {
    /// Total translation since the gesture began.
    #[serde(default)]
    pub translation: Vector,
    #[serde(default)]
    pub velocity: Vector,
    pub phase: GesturePhase,
}

impl DismissSample {
    pub fn new(phase: GesturePhase, translation: Vector, velocity: Vector) -> Self {
        Self {
            translation,
            velocity,
            phase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Commit,
    SnapBack,
}

/// Outcome of a finished drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub decision: Decision,
    pub progress: f64,
    /// Frame to restore on snap-back.
    pub initial_frame: Rect,
    /// Where the content was when the finger lifted.
    pub final_frame: Rect,
    /// Time the content would take to leave at the release velocity.
    pub estimate: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DismissUpdate {
    /// Drag accepted; the close affordance should hide.
    Began { initial_frame: Rect },
    /// Live feedback while the finger moves.
    Moved {
        progress: f64,
        content_frame: Rect,
        background_alpha: f64,
    },
    Released(Release),
}

/// `max(|dx| / (w·f), |dy| / (h·f))`, clamped to `[0, 1]`.
pub fn dismiss_progress(translation: Vector, screen: Size, travel_factor: f64) -> f64 {
    if screen.is_degenerate() || travel_factor <= 0.0 {
        return 0.0;
    }
    let horizontal = translation.dx.abs() / (screen.width * travel_factor);
    let vertical = translation.dy.abs() / (screen.height * travel_factor);
    let progress = horizontal.max(vertical);
    if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct DismissGesture {
    options: DismissOptions,
    initial_frame: Option<Rect>,
}

impl DismissGesture {
    pub fn new(options: DismissOptions) -> Self {
        Self {
            options,
            initial_frame: None,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.initial_frame.is_some()
    }

    /// Feed one recognizer callback. `current_frame` is the content frame at
    /// the time of the callback; it is only read on `Began`.
    ///
    /// Samples that arrive without a preceding `Began` are ignored.
    pub fn handle(
        &mut self,
        sample: &DismissSample,
        current_frame: Rect,
        screen: Size,
    ) -> Option<DismissUpdate> {
        let progress = dismiss_progress(sample.translation, screen, self.options.travel_factor);
        match sample.phase {
            GesturePhase::Began => {
                self.initial_frame = Some(current_frame);
                debug!(frame = ?current_frame, "dismiss drag began");
                Some(DismissUpdate::Began {
                    initial_frame: current_frame,
                })
            }
            GesturePhase::Changed => {
                let initial = self.initial_frame?;
                let content_frame = initial.translated(sample.translation);
                trace!(progress, "dismiss drag moved");
                Some(DismissUpdate::Moved {
                    progress,
                    content_frame,
                    background_alpha: 1.0 - progress,
                })
            }
            GesturePhase::Ended | GesturePhase::Cancelled => {
                let initial = self.initial_frame.take()?;
                let decision = if progress > self.options.commit_threshold {
                    Decision::Commit
                } else {
                    Decision::SnapBack
                };
                let estimate = self.release_estimate(sample.translation, sample.velocity);
                debug!(
                    progress,
                    ?decision,
                    estimate_ms = estimate.as_millis() as u64,
                    "dismiss drag released"
                );
                Some(DismissUpdate::Released(Release {
                    decision,
                    progress,
                    initial_frame: initial,
                    final_frame: initial.translated(sample.translation),
                    estimate,
                }))
            }
        }
    }

    /// Drop an in-progress drag without producing a release.
    pub fn reset(&mut self) {
        self.initial_frame = None;
    }

    fn release_estimate(&self, translation: Vector, velocity: Vector) -> Duration {
        let fallback = self.options.fallback_release;
        if velocity.dy == 0.0 || !velocity.dy.is_finite() {
            return fallback;
        }
        let secs = (translation.dy * 3.0 / velocity.dy.abs()).abs();
        match Duration::try_from_secs_f64(secs) {
            Ok(estimate) if estimate <= self.options.max_release_estimate => estimate,
            _ => fallback,
        }
    }
}
