use crate::geometry::{Rect, Size};

/// Largest rect with the image's aspect ratio that fits inside `viewport`,
/// anchored at the origin. Degenerate input yields [`Rect::ZERO`].
pub fn fit(image: Size, viewport: Size) -> Rect {
    let (Some(image_ratio), Some(viewport_ratio)) =
        (image.aspect_ratio(), viewport.aspect_ratio())
    else {
        return Rect::ZERO;
    };
    let size = if image_ratio > viewport_ratio {
        let width = viewport.width;
        Size::new(width, width * image.height / image.width)
    } else {
        let height = viewport.height;
        Size::new(height * image.width / image.height, height)
    };
    Rect::from_size(size)
}

/// Centers `rect` on each axis where it is smaller than `viewport`; pins it to
/// zero on axes where it overflows.
pub fn center(rect: Rect, viewport: Size) -> Rect {
    let x = if rect.width < viewport.width {
        (viewport.width - rect.width) / 2.0
    } else {
        0.0
    };
    let y = if rect.height < viewport.height {
        (viewport.height - rect.height) / 2.0
    } else {
        0.0
    };
    Rect::new(x, y, rect.width, rect.height)
}

/// `fit` followed by `center`.
pub fn fitted(image: Size, viewport: Size) -> Rect {
    let rect = fit(image, viewport);
    if rect == Rect::ZERO {
        return rect;
    }
    center(rect, viewport)
}
