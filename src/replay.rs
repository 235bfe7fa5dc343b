//! Scripted, headless presentations.
//!
//! A scenario lists the gestures a user would perform; the replay feeds them
//! to a real event loop with a [`TokioHost`] and reports what happened.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bitmap::Image;
use crate::config::Configuration;
use crate::dismiss::{DismissSample, GesturePhase};
use crate::events::ViewerEvent;
use crate::geometry::{Point, Rect, Size, Vector};
use crate::presentation::{
    self, PhaseChange, PresentRequest, PresentationObserver, PresentationPhase,
};
use crate::tasks::fetch::ImageSource;
use crate::tasks::viewer::{self, TokioHost};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Scenario {
    pub viewport: Size,
    #[serde(default)]
    pub source_frame: Option<Rect>,
    /// Parsed by [`Scenario::full_image_source`].
    #[serde(default)]
    pub full_image_url: Option<String>,
    /// How long to wait for the viewer to finish after the last step.
    #[serde(default = "Scenario::default_settle", with = "humantime_serde")]
    pub settle: Duration,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    fn default_settle() -> Duration {
        Duration::from_secs(2)
    }

    pub fn full_image_source(&self) -> Result<Option<Url>> {
        self.full_image_url
            .as_deref()
            .map(|url| Url::parse(url).with_context(|| format!("parsing full-image-url {url:?}")))
            .transpose()
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    Wait {
        #[serde(with = "humantime_serde")]
        duration: Duration,
    },
    Pan {
        phase: GesturePhase,
        #[serde(default)]
        translation: Vector,
        #[serde(default)]
        velocity: Vector,
    },
    /// A complete drag: began, one move, then ended.
    Drag {
        translation: Vector,
        #[serde(default)]
        velocity: Vector,
    },
    DoubleTap {
        at: Point,
    },
    Pinch {
        scale: f64,
        anchor: Point,
    },
    Scroll {
        by: Vector,
    },
    Resize {
        size: Size,
        #[serde(default, with = "humantime_serde")]
        transition: Option<Duration>,
    },
    Close,
}

impl Step {
    fn events(&self) -> Vec<ViewerEvent> {
        match *self {
            Step::Wait { .. } | Step::Resize { .. } => Vec::new(),
            Step::Pan {
                phase,
                translation,
                velocity,
            } => vec![ViewerEvent::Pan(DismissSample::new(phase, translation, velocity))],
            Step::Drag {
                translation,
                velocity,
            } => vec![
                ViewerEvent::Pan(DismissSample::new(
                    GesturePhase::Began,
                    Vector::ZERO,
                    Vector::ZERO,
                )),
                ViewerEvent::Pan(DismissSample::new(
                    GesturePhase::Changed,
                    translation,
                    velocity,
                )),
                ViewerEvent::Pan(DismissSample::new(
                    GesturePhase::Ended,
                    translation,
                    velocity,
                )),
            ],
            Step::DoubleTap { at } => vec![ViewerEvent::DoubleTap(at)],
            Step::Pinch { scale, anchor } => vec![ViewerEvent::Pinch { scale, anchor }],
            Step::Scroll { by } => vec![ViewerEvent::Scroll(by)],
            Step::Close => vec![ViewerEvent::CloseTapped],
        }
    }
}

#[derive(Debug, Default)]
struct LifecycleCounts {
    will_present: AtomicUsize,
    did_dismiss: AtomicUsize,
}

struct CountingObserver(Arc<LifecycleCounts>);

impl PresentationObserver for CountingObserver {
    fn will_present(&mut self) {
        self.0.will_present.fetch_add(1, Ordering::SeqCst);
    }

    fn did_dismiss(&mut self) {
        self.0.did_dismiss.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub phases: Vec<PhaseChange>,
    pub final_phase: PresentationPhase,
    pub will_present: usize,
    pub did_dismiss: usize,
    /// Sizes of the images the host displayed, initial image first.
    pub displayed: Vec<Size>,
    pub overlay_visible: bool,
}

pub async fn run(
    cfg: Configuration,
    scenario: Scenario,
    image: Image,
    source: Arc<dyn ImageSource>,
) -> Result<ReplayReport> {
    let full_image_source = scenario.full_image_source()?;
    let (events_tx, events_rx) = mpsc::channel::<ViewerEvent>(64);
    let (viewport_tx, viewport_rx) = watch::channel(scenario.viewport);
    let counts = Arc::new(LifecycleCounts::default());
    let cancel = CancellationToken::new();

    let mut request = PresentRequest::new(image).with_observer(CountingObserver(counts.clone()));
    if let Some(frame) = scenario.source_frame {
        request = request.with_source_frame(frame);
    }
    if let Some(url) = full_image_source {
        request = request.with_full_image_source(url);
    }

    let host = TokioHost::new(viewport_rx, events_tx.clone(), source);
    let mut controller = presentation::PresentationController::new(host, cfg);
    let initial = controller.present(request);
    let mut handle = tokio::spawn(viewer::run(controller, events_rx, cancel.clone()));

    for step in &scenario.steps {
        match step {
            Step::Wait { duration } => sleep(*duration).await,
            Step::Resize { size, transition } => {
                let _ = viewport_tx.send(*size);
                let _ = events_tx
                    .send(ViewerEvent::ViewportChanged {
                        size: *size,
                        transition: *transition,
                    })
                    .await;
            }
            other => {
                for event in other.events() {
                    if events_tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    let outcome = match timeout(scenario.settle, &mut handle).await {
        Ok(joined) => joined.context("viewer task panicked")?,
        Err(_) => {
            info!("viewer still active after scenario; stopping loop");
            cancel.cancel();
            handle.await.context("viewer task panicked")?
        }
    };

    let mut phases: Vec<PhaseChange> = initial.into_iter().collect();
    phases.extend(outcome.phases);
    let final_phase = outcome.controller.phase();
    if final_phase != PresentationPhase::Idle {
        warn!(phase = ?final_phase, "replay ended before the viewer was dismissed");
    }
    let host = outcome.controller.host();
    Ok(ReplayReport {
        phases,
        final_phase,
        will_present: counts.will_present.load(Ordering::SeqCst),
        did_dismiss: counts.did_dismiss.load(Ordering::SeqCst),
        displayed: host.displayed().to_vec(),
        overlay_visible: host.overlay_visible(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scenario_yaml() {
        let yaml = r#"
viewport: { width: 400, height: 800 }
source-frame: { x: 10, y: 10, width: 50, height: 50 }
full-image-url: "https://example.invalid/full.jpg"
settle: 500ms
steps:
  - action: wait
    duration: 300ms
  - action: double-tap
    at: { x: 100, y: 200 }
  - action: drag
    translation: { dx: 0, dy: 150 }
    velocity: { dx: 0, dy: 900 }
  - action: resize
    size: { width: 800, height: 400 }
    transition: 200ms
  - action: close
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.viewport, Size::new(400.0, 800.0));
        assert_eq!(scenario.source_frame, Some(Rect::new(10.0, 10.0, 50.0, 50.0)));
        assert_eq!(scenario.settle, Duration::from_millis(500));
        assert_eq!(
            scenario.full_image_source().unwrap().map(String::from),
            Some("https://example.invalid/full.jpg".to_string())
        );
        assert_eq!(scenario.steps.len(), 5);
        assert!(matches!(
            scenario.steps[0],
            Step::Wait { duration } if duration == Duration::from_millis(300)
        ));
        assert_eq!(scenario.steps[2].events().len(), 3);
        assert!(matches!(
            scenario.steps[3],
            Step::Resize { transition: Some(d), .. } if d == Duration::from_millis(200)
        ));
        assert!(matches!(scenario.steps[4], Step::Close));
    }

    #[test]
    fn settle_defaults_to_two_seconds() {
        let scenario: Scenario =
            serde_yaml::from_str("viewport: { width: 1, height: 1 }").unwrap();
        assert_eq!(scenario.settle, Duration::from_secs(2));
        assert!(scenario.steps.is_empty());
        assert!(scenario.full_image_source().unwrap().is_none());
    }

    #[test]
    fn malformed_full_image_url_is_reported() {
        let yaml = r#"
viewport: { width: 400, height: 800 }
full-image-url: "not a url"
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        let err = scenario.full_image_source().unwrap_err();
        assert!(format!("{err:#}").contains("full-image-url"));
    }
}
