pub mod bitmap;
pub mod config;
pub mod dismiss;
pub mod error;
pub mod events;
pub mod geometry;
pub mod layout;
pub mod presentation;
pub mod replay;
pub mod zoom;
pub mod tasks {
    pub mod fetch;
    pub mod viewer;
}

pub use bitmap::Image;
pub use config::Configuration;
pub use error::{Error, Result};
pub use presentation::{
    Host, PresentRequest, PresentationController, PresentationObserver, PresentationPhase, present,
};
