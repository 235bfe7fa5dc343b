//! Zoomable, pannable viewport over a single image.
//!
//! The surface keeps the model values (scale, scroll offset) that the host
//! renders. Animated zooms are requested from the host, but the model jumps to
//! the target immediately so queries such as [`ZoomSurface::is_at_rest`] always
//! reflect where the surface is heading.

use tracing::{debug, trace};

use crate::bitmap::Image;
use crate::config::ZoomOptions;
use crate::geometry::{Point, Rect, Size, Vector};
use crate::layout;

/// Snapshot of the surface's zoom model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    pub scale: f64,
    /// Where the image is drawn, in viewport coordinates.
    pub content_frame: Rect,
}

/// Zoom-to-rect request for the host to animate.
///
/// `rect` is expressed in the image's fitted coordinate space (the image as
/// laid out at the minimum scale, origin at its top-left corner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomToRect {
    pub rect: Rect,
    pub scale: f64,
}

#[derive(Debug, Clone)]
pub struct ZoomSurface {
    image: Image,
    limits: ZoomOptions,
    viewport: Size,
    scale: f64,
    /// Image frame at the minimum scale.
    fitted: Rect,
    /// Scroll position of the zoomed content; zero on axes that fit.
    offset: Point,
}

impl ZoomSurface {
    pub fn new(image: Image, limits: ZoomOptions) -> Self {
        Self {
            image,
            limits,
            viewport: Size::ZERO,
            scale: limits.min_scale,
            fitted: Rect::ZERO,
            offset: Point::ZERO,
        }
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn min_scale(&self) -> f64 {
        self.limits.min_scale
    }

    pub fn max_scale(&self) -> f64 {
        self.limits.max_scale
    }

    pub fn is_at_rest(&self) -> bool {
        self.scale <= self.limits.min_scale
    }

    pub fn state(&self) -> ZoomState {
        ZoomState {
            scale: self.scale,
            content_frame: self.content_frame(),
        }
    }

    /// Refit the image into `viewport` and drop any zoom.
    pub fn layout(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.fitted = layout::fitted(self.image.size(), viewport);
        self.scale = self.limits.min_scale;
        self.offset = Point::ZERO;
        debug!(
            width = viewport.width,
            height = viewport.height,
            frame = ?self.fitted,
            "zoom surface laid out"
        );
    }

    /// Swap the displayed image and refit it into the last known viewport.
    pub fn replace_image(&mut self, image: Image) {
        debug!(from = ?self.image, to = ?image, "replacing displayed image");
        self.image = image;
        self.layout(self.viewport);
    }

    /// Double-tap behaviour: zoom in to the maximum scale around `at`, or back
    /// out to the fitted view when already zoomed.
    ///
    /// `at` is a location in the image's fitted coordinate space.
    pub fn toggle_zoom(&mut self, at: Point) -> ZoomToRect {
        let target = if self.scale > self.limits.min_scale {
            self.limits.min_scale
        } else {
            self.limits.max_scale
        };
        let size = Size::new(self.viewport.width / target, self.viewport.height / target);
        let origin = at - Vector::new(size.width / 2.0, size.height / 2.0);
        let rect = Rect::from_origin_size(origin, size);

        let content_center = rect.center();
        self.scale = target;
        let k = self.relative_scale();
        self.offset = Point::new(
            content_center.x * k - self.viewport.width / 2.0,
            content_center.y * k - self.viewport.height / 2.0,
        );
        self.clamp_offset();
        debug!(scale = target, rect = ?rect, "toggled zoom");
        ZoomToRect {
            rect,
            scale: target,
        }
    }

    /// Continuous pinch: scale to `scale`, keeping the image point under
    /// `anchor` (viewport coordinates) in place.
    pub fn pinch(&mut self, scale: f64, anchor: Point) {
        if !scale.is_finite() {
            return;
        }
        let before = self.content_frame();
        let k_old = self.relative_scale();
        let image_point = Point::new(
            (anchor.x - before.x) / k_old,
            (anchor.y - before.y) / k_old,
        );

        self.scale = scale.clamp(self.limits.min_scale, self.limits.max_scale);
        let k_new = self.relative_scale();
        let centered = self.centered_frame();
        self.offset = Point::new(
            centered.x + image_point.x * k_new - anchor.x,
            centered.y + image_point.y * k_new - anchor.y,
        );
        self.clamp_offset();
        trace!(scale = self.scale, "pinch");
    }

    /// Scroll the zoomed content with a drag of `delta`. No effect at rest
    /// beyond keeping the content centered.
    pub fn pan_by(&mut self, delta: Vector) {
        self.offset = self.offset - delta;
        self.clamp_offset();
    }

    /// Image frame in viewport coordinates at the current scale and offset.
    pub fn content_frame(&self) -> Rect {
        self.centered_frame()
            .translated(Vector::new(-self.offset.x, -self.offset.y))
    }

    fn relative_scale(&self) -> f64 {
        self.scale / self.limits.min_scale
    }

    fn centered_frame(&self) -> Rect {
        let size = self.fitted.size().scaled(self.relative_scale());
        layout::center(Rect::from_size(size), self.viewport)
    }

    fn clamp_offset(&mut self) {
        let size = self.fitted.size().scaled(self.relative_scale());
        let max_x = (size.width - self.viewport.width).max(0.0);
        let max_y = (size.height - self.viewport.height).max(0.0);
        let x = if self.offset.x.is_finite() { self.offset.x } else { 0.0 };
        let y = if self.offset.y.is_finite() { self.offset.y } else { 0.0 };
        self.offset = Point::new(x.clamp(0.0, max_x), y.clamp(0.0, max_y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size::new(400.0, 800.0);

    fn surface(w: u32, h: u32) -> ZoomSurface {
        let mut s = ZoomSurface::new(Image::blank(w, h, [0, 0, 0, 255]), ZoomOptions::default());
        s.layout(VIEWPORT);
        s
    }

    fn assert_rect_close(a: Rect, b: Rect) {
        let eps = 1e-9;
        assert!((a.x - b.x).abs() <= eps, "x mismatch: {a:?} vs {b:?}");
        assert!((a.y - b.y).abs() <= eps, "y mismatch: {a:?} vs {b:?}");
        assert!((a.width - b.width).abs() <= eps, "w mismatch: {a:?} vs {b:?}");
        assert!((a.height - b.height).abs() <= eps, "h mismatch: {a:?} vs {b:?}");
    }

    #[test]
    fn layout_fits_and_centers_landscape_image() {
        let s = surface(800, 400);
        assert!(s.is_at_rest());
        assert_rect_close(s.content_frame(), Rect::new(0.0, 300.0, 400.0, 200.0));
    }

    #[test]
    fn layout_is_idempotent() {
        let mut s = surface(1234, 567);
        let first = s.state();
        s.layout(VIEWPORT);
        assert_eq!(s.state(), first);
    }

    #[test]
    fn double_toggle_restores_scale() {
        let mut s = surface(800, 400);
        let start = s.scale();
        let zoom_in = s.toggle_zoom(Point::new(200.0, 100.0));
        assert_eq!(zoom_in.scale, 3.0);
        assert_eq!(s.scale(), 3.0);
        assert!(!s.is_at_rest());
        let zoom_out = s.toggle_zoom(Point::new(10.0, 10.0));
        assert_eq!(zoom_out.scale, start);
        assert_eq!(s.scale(), start);
        assert_rect_close(s.content_frame(), Rect::new(0.0, 300.0, 400.0, 200.0));
    }

    #[test]
    fn toggle_rect_is_centered_on_tap() {
        let mut s = surface(400, 800);
        let z = s.toggle_zoom(Point::new(200.0, 400.0));
        let expected_size = Size::new(400.0 / 3.0, 800.0 / 3.0);
        assert_rect_close(
            z.rect,
            Rect::new(
                200.0 - expected_size.width / 2.0,
                400.0 - expected_size.height / 2.0,
                expected_size.width,
                expected_size.height,
            ),
        );
        // tapped point lands in the middle of the viewport
        let frame = s.content_frame();
        assert!((frame.x + 200.0 * 3.0 - 200.0).abs() < 1e-9);
        assert!((frame.y + 400.0 * 3.0 - 400.0).abs() < 1e-9);
    }

    #[test]
    fn toggle_near_edge_keeps_content_on_screen() {
        let mut s = surface(400, 800);
        s.toggle_zoom(Point::new(0.0, 0.0));
        let frame = s.content_frame();
        assert_eq!(frame.origin(), Point::ZERO);
        assert!(frame.contains_rect(&Rect::from_size(VIEWPORT), 1e-9));
    }

    #[test]
    fn pinch_is_clamped_to_limits() {
        let mut s = surface(400, 800);
        s.pinch(10.0, Point::new(200.0, 400.0));
        assert_eq!(s.scale(), 3.0);
        s.pinch(0.2, Point::new(200.0, 400.0));
        assert_eq!(s.scale(), 1.0);
        assert!(s.is_at_rest());
        s.pinch(f64::NAN, Point::ZERO);
        assert_eq!(s.scale(), 1.0);
    }

    #[test]
    fn pinch_keeps_anchor_fixed() {
        let mut s = surface(400, 800);
        let anchor = Point::new(100.0, 300.0);
        s.pinch(2.0, anchor);
        let frame = s.content_frame();
        // image point (100, 300) is still under the anchor
        assert!((frame.x + 100.0 * 2.0 - anchor.x).abs() < 1e-9);
        assert!((frame.y + 300.0 * 2.0 - anchor.y).abs() < 1e-9);
    }

    #[test]
    fn zoomed_content_stays_centered_on_short_axis() {
        let mut s = surface(800, 200);
        s.pinch(2.0, Point::new(200.0, 400.0));
        let frame = s.content_frame();
        // 400x100 fitted → 800x200 zoomed, still shorter than the viewport
        assert!((frame.height - 200.0).abs() < 1e-9);
        assert!((frame.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn pan_is_clamped_to_content() {
        let mut s = surface(400, 800);
        s.toggle_zoom(Point::new(200.0, 400.0));
        s.pan_by(Vector::new(10_000.0, 10_000.0));
        assert_eq!(s.content_frame().origin(), Point::ZERO);
        s.pan_by(Vector::new(-10_000.0, -10_000.0));
        let frame = s.content_frame();
        assert!((frame.x + frame.width - 400.0).abs() < 1e-9);
        assert!((frame.y + frame.height - 800.0).abs() < 1e-9);
    }

    #[test]
    fn replace_image_resets_zoom() {
        let mut s = surface(400, 800);
        s.toggle_zoom(Point::new(50.0, 50.0));
        assert_eq!(s.scale(), 3.0);
        s.replace_image(Image::blank(1600, 800, [255, 255, 255, 255]));
        assert!(s.is_at_rest());
        assert_eq!(s.viewport(), VIEWPORT);
        assert_rect_close(s.content_frame(), Rect::new(0.0, 300.0, 400.0, 200.0));
    }
}
