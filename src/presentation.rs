//! Presentation lifecycle: open animation, interactive dismissal, close
//! animation and teardown.
//!
//! The controller owns the overlay's scene model and never talks to a UI
//! toolkit directly. Everything visual goes through [`Host`]; everything the
//! host observes (gestures, animation completions, timers, fetch results)
//! comes back through the `on_*` methods, all called from one event loop.

use std::time::Duration;

use reqwest::Url;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bitmap::Image;
use crate::config::Configuration;
use crate::dismiss::{Decision, DismissGesture, DismissSample, DismissUpdate, GesturePhase};
use crate::error::Error;
use crate::geometry::{Point, Rect, Size, Vector};
use crate::zoom::{ZoomState, ZoomSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationPhase {
    Idle,
    Presenting,
    Presented,
    Dismissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: PresentationPhase,
    pub to: PresentationPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    EaseInOut,
    EaseOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPurpose {
    /// Stand-in grows from the source frame to full screen.
    Open,
    /// Stand-in collapses back onto the source frame.
    Close,
    /// Plain fade used when no source frame was given.
    FadeOut,
    /// Dragged content returns to its resting frame.
    SnapBack,
    /// Double-tap zoom in or out.
    Zoom,
    /// Viewport size change alongside a system transition.
    Relayout,
}

/// Zoomable image layer inside the full-screen container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentLayer {
    /// Image frame relative to the container.
    pub frame: Rect,
    pub scale: f64,
    pub hidden: bool,
    pub alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandIn {
    pub frame: Rect,
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseAffordance {
    pub hidden: bool,
    pub alpha: f64,
}

/// Everything the host needs to draw the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayScene {
    /// Opacity of the black backdrop.
    pub background_alpha: f64,
    /// Frame of the zoom surface's container; moves while dragging.
    pub container_frame: Rect,
    pub content: ContentLayer,
    pub stand_in: StandIn,
    pub close: CloseAffordance,
}

impl OverlayScene {
    fn initial(viewport: Size, stand_in: Rect) -> Self {
        Self {
            background_alpha: 0.0,
            container_frame: Rect::from_size(viewport),
            content: ContentLayer {
                frame: Rect::ZERO,
                scale: 1.0,
                hidden: true,
                alpha: 1.0,
            },
            stand_in: StandIn {
                frame: stand_in,
                hidden: false,
            },
            close: CloseAffordance {
                hidden: false,
                alpha: 1.0,
            },
        }
    }
}

/// Animate from whatever the host currently shows to `target`, then report
/// completion through [`PresentationController::on_animation_finished`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationRequest {
    pub id: AnimationId,
    pub purpose: AnimationPurpose,
    pub duration: Duration,
    pub curve: Curve,
    pub target: OverlayScene,
}

/// Download `url` and report through [`PresentationController::on_full_image`]
/// with the same ticket. The host must deliver the result on the controller's
/// event loop.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub url: Url,
    pub cancel: CancellationToken,
}

/// Platform capabilities the controller depends on.
pub trait Host {
    /// Size of the full-screen surface the overlay occupies.
    fn viewport_size(&self) -> Size;

    /// Image shown by both the zoom surface and the stand-in.
    fn display_image(&mut self, image: &Image);

    /// Apply `scene` immediately, without animation.
    fn show(&mut self, scene: &OverlayScene);

    fn animate(&mut self, request: AnimationRequest);

    /// Call [`PresentationController::on_timer`] once `delay` has elapsed.
    fn schedule(&mut self, id: TimerId, delay: Duration);

    fn fetch_full_image(&mut self, request: FetchRequest);

    /// Remove the overlay from the screen.
    fn remove_overlay(&mut self);
}

/// Lifecycle notifications for whoever presented the viewer.
pub trait PresentationObserver: Send {
    fn will_present(&mut self) {}
    fn did_dismiss(&mut self) {}
}

pub struct PresentRequest {
    pub image: Image,
    pub full_image_source: Option<Url>,
    pub source_frame: Option<Rect>,
    pub observer: Option<Box<dyn PresentationObserver>>,
}

impl PresentRequest {
    pub fn new(image: Image) -> Self {
        Self {
            image,
            full_image_source: None,
            source_frame: None,
            observer: None,
        }
    }

    pub fn with_full_image_source(mut self, url: Url) -> Self {
        self.full_image_source = Some(url);
        self
    }

    pub fn with_source_frame(mut self, frame: Rect) -> Self {
        self.source_frame = Some(frame);
        self
    }

    pub fn with_observer(mut self, observer: impl PresentationObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingTransition {
    id: AnimationId,
    purpose: AnimationPurpose,
}

struct ActiveFetch {
    ticket: FetchTicket,
    cancel: CancellationToken,
}

pub struct PresentationController<H: Host> {
    host: H,
    cfg: Configuration,
    phase: PresentationPhase,
    scene: OverlayScene,
    zoom: Option<ZoomSurface>,
    gesture: DismissGesture,
    source_frame: Option<Rect>,
    observer: Option<Box<dyn PresentationObserver>>,
    transition: Option<PendingTransition>,
    /// Debounce timer of a snap-back that has not started yet.
    snap_back: Option<TimerId>,
    fetch: Option<ActiveFetch>,
    next_token: u64,
}

/// Build a controller around `host` and immediately present `request`.
pub fn present<H: Host>(
    host: H,
    cfg: Configuration,
    request: PresentRequest,
) -> PresentationController<H> {
    let mut controller = PresentationController::new(host, cfg);
    controller.present(request);
    controller
}

impl<H: Host> PresentationController<H> {
    pub fn new(host: H, cfg: Configuration) -> Self {
        let gesture = DismissGesture::new(cfg.dismiss);
        Self {
            host,
            cfg,
            phase: PresentationPhase::Idle,
            scene: OverlayScene::initial(Size::ZERO, Rect::ZERO),
            zoom: None,
            gesture,
            source_frame: None,
            observer: None,
            transition: None,
            snap_back: None,
            fetch: None,
            next_token: 0,
        }
    }

    pub fn phase(&self) -> PresentationPhase {
        self.phase
    }

    pub fn scene(&self) -> &OverlayScene {
        &self.scene
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The live image, if a presentation is in progress.
    pub fn image(&self) -> Option<&Image> {
        self.zoom.as_ref().map(ZoomSurface::image)
    }

    pub fn zoom_state(&self) -> Option<ZoomState> {
        self.zoom.as_ref().map(ZoomSurface::state)
    }

    /// Gesture-recognition policy: a drag may start a dismissal only while the
    /// image is fully presented and not magnified.
    pub fn should_begin_dismiss(&self) -> bool {
        self.phase == PresentationPhase::Presented
            && self.zoom.as_ref().is_some_and(ZoomSurface::is_at_rest)
    }

    pub fn present(&mut self, request: PresentRequest) -> Option<PhaseChange> {
        if self.phase != PresentationPhase::Idle {
            warn!(phase = ?self.phase, "present ignored; viewer already active");
            return None;
        }
        let PresentRequest {
            image,
            full_image_source,
            source_frame,
            observer,
        } = request;

        let viewport = self.host.viewport_size();
        let start = source_frame.unwrap_or_else(|| {
            let center = Rect::from_size(viewport).center();
            Rect::from_origin_size(center, Size::ZERO)
        });
        self.source_frame = source_frame;
        self.observer = observer;
        self.zoom = Some(ZoomSurface::new(image.clone(), self.cfg.zoom));
        self.scene = OverlayScene::initial(viewport, start);
        self.host.display_image(&image);
        self.host.show(&self.scene);

        let change = self.goto(PresentationPhase::Presenting);
        if let Some(observer) = self.observer.as_mut() {
            observer.will_present();
        }

        let mut target = self.scene;
        target.stand_in.frame = Rect::from_size(viewport);
        target.background_alpha = 1.0;
        let id = self.animate(
            AnimationPurpose::Open,
            self.cfg.transition_duration,
            Curve::EaseInOut,
            target,
        );
        self.transition = Some(PendingTransition {
            id,
            purpose: AnimationPurpose::Open,
        });

        if let Some(url) = full_image_source {
            self.start_fetch(url);
        }
        change
    }

    /// Dismiss without a gesture, e.g. from the close affordance.
    pub fn dismiss(&mut self) -> Option<PhaseChange> {
        self.begin_dismiss(self.cfg.transition_duration)
    }

    pub fn on_close_tapped(&mut self) -> Option<PhaseChange> {
        debug!("close affordance tapped");
        self.dismiss()
    }

    pub fn on_animation_finished(
        &mut self,
        id: AnimationId,
        finished: bool,
    ) -> Option<PhaseChange> {
        let pending = match self.transition {
            Some(pending) if pending.id == id => pending,
            _ => return None,
        };
        self.transition = None;
        if !finished {
            debug!(purpose = ?pending.purpose, "transition interrupted; settling at target");
        }
        match pending.purpose {
            AnimationPurpose::Open => self.finish_open(),
            AnimationPurpose::Close | AnimationPurpose::FadeOut => self.teardown(),
            _ => None,
        }
    }

    pub fn on_timer(&mut self, id: TimerId) {
        if self.snap_back != Some(id) {
            return;
        }
        self.snap_back = None;
        if self.phase != PresentationPhase::Presented {
            return;
        }
        self.scene.close.hidden = false;
        let mut target = self.scene;
        target.container_frame = self.resting_frame();
        target.background_alpha = 1.0;
        self.animate(
            AnimationPurpose::SnapBack,
            self.cfg.transition_duration,
            Curve::EaseOut,
            target,
        );
    }

    /// Drag-to-dismiss recognizer callback.
    pub fn on_pan(&mut self, sample: &DismissSample) -> Option<PhaseChange> {
        if sample.phase == GesturePhase::Began {
            if !self.should_begin_dismiss() {
                debug!(phase = ?self.phase, "dismiss drag declined");
                return None;
            }
            // a new drag supersedes a snap-back that has not started yet; the
            // drag is measured from the resting frame, not the displaced one
            if self.snap_back.take().is_some() {
                self.scene.container_frame = self.resting_frame();
                self.scene.background_alpha = 1.0;
            }
        } else if !self.gesture.is_interactive() {
            return None;
        }

        let viewport = self.host.viewport_size();
        match self
            .gesture
            .handle(sample, self.scene.container_frame, viewport)?
        {
            DismissUpdate::Began { .. } => {
                self.scene.close.hidden = true;
                self.host.show(&self.scene);
                None
            }
            DismissUpdate::Moved {
                content_frame,
                background_alpha,
                ..
            } => {
                self.scene.container_frame = content_frame;
                self.scene.background_alpha = background_alpha;
                self.host.show(&self.scene);
                None
            }
            DismissUpdate::Released(release) => match release.decision {
                Decision::Commit => {
                    self.scene.container_frame = release.final_frame;
                    self.scene.close.alpha = 0.0;
                    self.host.show(&self.scene);
                    let duration = if self.cfg.dismiss.velocity_timed_close {
                        release.estimate
                    } else {
                        self.cfg.transition_duration
                    };
                    self.begin_dismiss(duration)
                }
                Decision::SnapBack => {
                    let timer = TimerId(self.next_token());
                    self.snap_back = Some(timer);
                    self.host.schedule(timer, self.cfg.dismiss.snap_back_delay);
                    None
                }
            },
        }
    }

    /// Double tap at `at`, a location in the image's fitted coordinates.
    pub fn on_double_tap(&mut self, at: Point) {
        if !self.accepts_zoom_input() {
            return;
        }
        let Some(zoom) = self.zoom.as_mut() else {
            return;
        };
        let request = zoom.toggle_zoom(at);
        debug!(scale = request.scale, rect = ?request.rect, "zoom toggle requested");
        self.sync_content();
        let target = self.scene;
        self.animate(
            AnimationPurpose::Zoom,
            self.cfg.transition_duration,
            Curve::EaseInOut,
            target,
        );
    }

    /// Pinch reported by the host: absolute `scale` around `anchor` (viewport
    /// coordinates).
    pub fn on_pinch(&mut self, scale: f64, anchor: Point) {
        if !self.accepts_zoom_input() {
            return;
        }
        if let Some(zoom) = self.zoom.as_mut() {
            zoom.pinch(scale, anchor);
        }
        self.sync_content();
        self.host.show(&self.scene);
    }

    /// Scroll within a magnified image.
    pub fn on_scroll(&mut self, delta: Vector) {
        if !self.accepts_zoom_input() {
            return;
        }
        let Some(zoom) = self.zoom.as_mut() else {
            return;
        };
        if zoom.is_at_rest() {
            return;
        }
        zoom.pan_by(delta);
        self.sync_content();
        self.host.show(&self.scene);
    }

    /// The overlay's size changed (rotation, window resize). `transition` is
    /// the duration of a system transition to animate alongside, if any.
    pub fn on_viewport_changed(&mut self, size: Size, transition: Option<Duration>) {
        if self.phase != PresentationPhase::Presented {
            return;
        }
        if let Some(zoom) = self.zoom.as_mut() {
            zoom.layout(size);
        }
        self.scene.container_frame = Rect::from_size(size);
        self.sync_content();
        match transition {
            Some(duration) if !duration.is_zero() => {
                let target = self.scene;
                self.animate(
                    AnimationPurpose::Relayout,
                    duration,
                    Curve::EaseInOut,
                    target,
                );
            }
            _ => self.host.show(&self.scene),
        }
    }

    /// Completion of the full-resolution fetch. Failures leave the initial
    /// image in place; results for a torn-down or superseded presentation are
    /// dropped.
    pub fn on_full_image(&mut self, ticket: FetchTicket, result: Result<Image, Error>) {
        match self.fetch.as_ref() {
            Some(active) if active.ticket == ticket => {}
            _ => {
                debug!(?ticket, "stale full image result ignored");
                return;
            }
        }
        self.fetch = None;
        let image = match result {
            Ok(image) => image,
            Err(err) => {
                debug!(error = %err, "full image unavailable; keeping initial image");
                return;
            }
        };
        let Some(zoom) = self.zoom.as_mut() else {
            return;
        };
        zoom.replace_image(image.clone());
        self.host.display_image(&image);
        info!(image = ?image, "full image displayed");
        if self.phase == PresentationPhase::Presented {
            self.sync_content();
            self.host.show(&self.scene);
        }
    }

    /// Container frame when nothing is being dragged.
    fn resting_frame(&self) -> Rect {
        Rect::from_size(self.host.viewport_size())
    }

    fn accepts_zoom_input(&self) -> bool {
        self.phase == PresentationPhase::Presented && !self.gesture.is_interactive()
    }

    fn finish_open(&mut self) -> Option<PhaseChange> {
        let viewport = self.host.viewport_size();
        if let Some(zoom) = self.zoom.as_mut() {
            zoom.layout(viewport);
        }
        self.scene.background_alpha = 1.0;
        self.scene.container_frame = Rect::from_size(viewport);
        self.scene.stand_in.frame = Rect::from_size(viewport);
        self.scene.stand_in.hidden = true;
        self.scene.content.hidden = false;
        self.sync_content();
        self.host.show(&self.scene);
        let change = self.goto(PresentationPhase::Presented);
        info!("image viewer presented");
        change
    }

    fn begin_dismiss(&mut self, duration: Duration) -> Option<PhaseChange> {
        if self.phase != PresentationPhase::Presented {
            warn!(phase = ?self.phase, "dismiss ignored; viewer not presented");
            return None;
        }
        self.gesture.reset();
        self.snap_back = None;
        let change = self.goto(PresentationPhase::Dismissing);

        let purpose = match self.source_frame {
            Some(source) => {
                self.scene.content.hidden = true;
                self.scene.stand_in.frame = self.scene.container_frame;
                self.scene.stand_in.hidden = false;
                self.scene.close.hidden = true;
                self.host.show(&self.scene);

                let mut target = self.scene;
                target.stand_in.frame = source;
                target.background_alpha = 0.0;
                self.schedule_transition(AnimationPurpose::Close, duration, target)
            }
            None => {
                self.scene.close.hidden = true;
                self.host.show(&self.scene);

                let mut target = self.scene;
                target.background_alpha = 0.0;
                target.content.alpha = 0.0;
                self.schedule_transition(AnimationPurpose::FadeOut, duration, target)
            }
        };
        debug!(?purpose, duration_ms = duration.as_millis() as u64, "dismiss started");
        change
    }

    fn schedule_transition(
        &mut self,
        purpose: AnimationPurpose,
        duration: Duration,
        target: OverlayScene,
    ) -> AnimationPurpose {
        let id = self.animate(purpose, duration, Curve::EaseOut, target);
        self.transition = Some(PendingTransition { id, purpose });
        purpose
    }

    fn teardown(&mut self) -> Option<PhaseChange> {
        if let Some(fetch) = self.fetch.take() {
            fetch.cancel.cancel();
        }
        self.zoom = None;
        self.gesture.reset();
        self.snap_back = None;
        self.source_frame = None;
        self.host.remove_overlay();
        let change = self.goto(PresentationPhase::Idle);
        info!("image viewer dismissed");
        if let Some(mut observer) = self.observer.take() {
            observer.did_dismiss();
        }
        change
    }

    fn start_fetch(&mut self, url: Url) {
        let ticket = FetchTicket(self.next_token());
        let cancel = CancellationToken::new();
        debug!(%url, ?ticket, "requesting full image");
        self.fetch = Some(ActiveFetch {
            ticket,
            cancel: cancel.clone(),
        });
        self.host.fetch_full_image(FetchRequest {
            ticket,
            url,
            cancel,
        });
    }

    fn sync_content(&mut self) {
        if let Some(state) = self.zoom_state() {
            self.scene.content.frame = state.content_frame;
            self.scene.content.scale = state.scale;
        }
    }

    fn animate(
        &mut self,
        purpose: AnimationPurpose,
        duration: Duration,
        curve: Curve,
        target: OverlayScene,
    ) -> AnimationId {
        let id = AnimationId(self.next_token());
        self.scene = target;
        self.host.animate(AnimationRequest {
            id,
            purpose,
            duration,
            curve,
            target,
        });
        id
    }

    fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn goto(&mut self, to: PresentationPhase) -> Option<PhaseChange> {
        if self.phase == to {
            return None;
        }
        let change = PhaseChange {
            from: self.phase,
            to,
        };
        debug!(from = ?change.from, to = ?change.to, "presentation phase changed");
        self.phase = to;
        Some(change)
    }
}
