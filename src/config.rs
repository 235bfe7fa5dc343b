use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Length of the open, close and snap-back animations.
    #[serde(with = "humantime_serde")]
    pub transition_duration: Duration,
    /// Zoom limits for the full-screen surface.
    pub zoom: ZoomOptions,
    /// Drag-to-dismiss tuning.
    pub dismiss: DismissOptions,
    /// Remote full-resolution image fetching.
    pub fetch: FetchOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.transition_duration.is_zero(),
            "transition-duration must be greater than zero"
        );
        self.zoom.validate()?;
        self.dismiss.validate()?;
        self.fetch.validate()?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            transition_duration: Duration::from_millis(250),
            zoom: ZoomOptions::default(),
            dismiss: DismissOptions::default(),
            fetch: FetchOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ZoomOptions {
    /// Scale at which the image is fitted; also the "at rest" scale.
    pub min_scale: f64,
    /// Upper bound for pinch and double-tap zoom.
    pub max_scale: f64,
}

impl ZoomOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.min_scale.is_finite() && self.min_scale > 0.0,
            "zoom.min-scale must be positive"
        );
        ensure!(
            self.max_scale.is_finite() && self.max_scale >= self.min_scale,
            "zoom.max-scale must be >= zoom.min-scale"
        );
        Ok(())
    }
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DismissOptions {
    /// Progress above which a released drag commits the dismissal.
    pub commit_threshold: f64,
    /// Multiple of the screen extent a drag must travel to reach full progress.
    pub travel_factor: f64,
    /// Debounce before the snap-back animation starts.
    #[serde(with = "humantime_serde")]
    pub snap_back_delay: Duration,
    /// Release duration used when the velocity estimate is unusable.
    #[serde(with = "humantime_serde")]
    pub fallback_release: Duration,
    /// Estimates longer than this are replaced by `fallback-release`.
    #[serde(with = "humantime_serde")]
    pub max_release_estimate: Duration,
    /// Use the release estimate as the close animation length after a drag.
    pub velocity_timed_close: bool,
}

impl DismissOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.commit_threshold > 0.0 && self.commit_threshold < 1.0,
            "dismiss.commit-threshold must be between 0 and 1"
        );
        ensure!(
            self.travel_factor.is_finite() && self.travel_factor > 0.0,
            "dismiss.travel-factor must be positive"
        );
        ensure!(
            !self.fallback_release.is_zero(),
            "dismiss.fallback-release must be greater than zero"
        );
        ensure!(
            self.max_release_estimate >= self.fallback_release,
            "dismiss.max-release-estimate must be >= dismiss.fallback-release"
        );
        Ok(())
    }
}

impl Default for DismissOptions {
    fn default() -> Self {
        Self {
            commit_threshold: 0.1,
            travel_factor: 1.5,
            snap_back_delay: Duration::from_millis(35),
            fallback_release: Duration::from_millis(700),
            max_release_estimate: Duration::from_secs(1),
            velocity_timed_close: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetchOptions {
    /// Transport timeout for the full-resolution download. None waits indefinitely.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout {
            ensure!(!timeout.is_zero(), "fetch.timeout must be greater than zero");
        }
        Ok(())
    }
}
