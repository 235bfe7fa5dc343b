use std::time::Duration;

use crate::bitmap::Image;
use crate::dismiss::DismissSample;
use crate::error::Error;
use crate::geometry::{Point, Size, Vector};
use crate::presentation::{AnimationId, FetchTicket, TimerId};

/// Everything delivered to the viewer's event loop.
#[derive(Debug)]
pub enum ViewerEvent {
    /// Drag-to-dismiss recognizer callback.
    Pan(DismissSample),
    /// Double tap in the image's fitted coordinates.
    DoubleTap(Point),
    Pinch { scale: f64, anchor: Point },
    /// Scroll inside a magnified image.
    Scroll(Vector),
    CloseTapped,
    ViewportChanged {
        size: Size,
        transition: Option<Duration>,
    },
    AnimationFinished { id: AnimationId, finished: bool },
    TimerFired(TimerId),
    FullImage {
        ticket: FetchTicket,
        result: Result<Image, Error>,
    },
}
