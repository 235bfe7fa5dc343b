use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::bitmap::Image;
use crate::events::ViewerEvent;
use crate::geometry::Size;
use crate::presentation::{
    AnimationRequest, FetchRequest, Host, OverlayScene, PhaseChange, PresentationController,
    PresentationPhase, TimerId,
};
use crate::tasks::fetch::{self, ImageSource};

/// Route one event to the matching controller callback.
pub fn dispatch<H: Host>(
    controller: &mut PresentationController<H>,
    event: ViewerEvent,
) -> Option<PhaseChange> {
    match event {
        ViewerEvent::Pan(sample) => controller.on_pan(&sample),
        ViewerEvent::DoubleTap(at) => {
            controller.on_double_tap(at);
            None
        }
        ViewerEvent::Pinch { scale, anchor } => {
            controller.on_pinch(scale, anchor);
            None
        }
        ViewerEvent::Scroll(delta) => {
            controller.on_scroll(delta);
            None
        }
        ViewerEvent::CloseTapped => controller.on_close_tapped(),
        ViewerEvent::ViewportChanged { size, transition } => {
            controller.on_viewport_changed(size, transition);
            None
        }
        ViewerEvent::AnimationFinished { id, finished } => {
            controller.on_animation_finished(id, finished)
        }
        ViewerEvent::TimerFired(id) => {
            controller.on_timer(id);
            None
        }
        ViewerEvent::FullImage { ticket, result } => {
            controller.on_full_image(ticket, result);
            None
        }
    }
}

/// What the event loop observed before it stopped.
pub struct ViewerOutcome<H: Host> {
    pub controller: PresentationController<H>,
    pub phases: Vec<PhaseChange>,
}

/// The viewer's single event loop. Returns once the presentation has been
/// torn down, the event channel closes, or `cancel` fires.
pub async fn run<H: Host>(
    mut controller: PresentationController<H>,
    mut events: Receiver<ViewerEvent>,
    cancel: CancellationToken,
) -> ViewerOutcome<H> {
    let mut phases = Vec::new();
    loop {
        select! {
            _ = cancel.cancelled() => {
                debug!("cancel received; exiting viewer loop");
                break;
            }
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    debug!("viewer event channel closed");
                    break;
                };
                trace!(?event, "viewer event");
                if let Some(change) = dispatch(&mut controller, event) {
                    phases.push(change);
                    if change.to == PresentationPhase::Idle {
                        break;
                    }
                }
            }
        }
    }
    ViewerOutcome { controller, phases }
}

/// Headless host driven by tokio timers.
///
/// Animations complete after their duration, timers fire after their delay,
/// and fetches run on the runtime; every completion is posted back to the
/// event loop through `events`. Nothing is drawn: the latest scene is kept
/// for inspection and traced.
pub struct TokioHost {
    viewport: watch::Receiver<Size>,
    events: Sender<ViewerEvent>,
    source: Arc<dyn ImageSource>,
    scene: Option<OverlayScene>,
    displayed: Vec<Size>,
    overlay_visible: bool,
}

impl TokioHost {
    pub fn new(
        viewport: watch::Receiver<Size>,
        events: Sender<ViewerEvent>,
        source: Arc<dyn ImageSource>,
    ) -> Self {
        Self {
            viewport,
            events,
            source,
            scene: None,
            displayed: Vec::new(),
            overlay_visible: true,
        }
    }

    pub fn scene(&self) -> Option<&OverlayScene> {
        self.scene.as_ref()
    }

    /// Sizes of every image handed to the host, in order.
    pub fn displayed(&self) -> &[Size] {
        &self.displayed
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    fn post_after(&self, delay: Duration, event: ViewerEvent) {
        let events = self.events.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            if events.send(event).await.is_err() {
                trace!("viewer gone; completion dropped");
            }
        });
    }
}

impl Host for TokioHost {
    fn viewport_size(&self) -> Size {
        *self.viewport.borrow()
    }

    fn display_image(&mut self, image: &Image) {
        debug!(image = ?image, "display image");
        self.displayed.push(image.size());
    }

    fn show(&mut self, scene: &OverlayScene) {
        trace!(?scene, "show");
        self.scene = Some(*scene);
    }

    fn animate(&mut self, request: AnimationRequest) {
        debug!(
            purpose = ?request.purpose,
            duration = %humantime::format_duration(request.duration),
            "animate"
        );
        self.scene = Some(request.target);
        self.post_after(
            request.duration,
            ViewerEvent::AnimationFinished {
                id: request.id,
                finished: true,
            },
        );
    }

    fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.post_after(delay, ViewerEvent::TimerFired(id));
    }

    fn fetch_full_image(&mut self, request: FetchRequest) {
        fetch::spawn(self.source.clone(), request, self.events.clone());
    }

    fn remove_overlay(&mut self) {
        info!("overlay removed");
        self.overlay_visible = false;
    }
}
