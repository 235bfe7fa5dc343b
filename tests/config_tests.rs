use std::time::Duration;

use image_lightbox::config::Configuration;

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.transition_duration, Duration::from_millis(250));
    assert!((cfg.zoom.min_scale - 1.0).abs() < f64::EPSILON);
    assert!((cfg.zoom.max_scale - 3.0).abs() < f64::EPSILON);
    assert!((cfg.dismiss.commit_threshold - 0.1).abs() < f64::EPSILON);
    assert!((cfg.dismiss.travel_factor - 1.5).abs() < f64::EPSILON);
    assert_eq!(cfg.dismiss.snap_back_delay, Duration::from_millis(35));
    assert_eq!(cfg.dismiss.fallback_release, Duration::from_millis(700));
    assert_eq!(cfg.dismiss.max_release_estimate, Duration::from_secs(1));
    assert!(!cfg.dismiss.velocity_timed_close);
    assert_eq!(cfg.fetch.timeout, None);
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
transition-duration: 400ms
zoom:
  max-scale: 5
dismiss:
  commit-threshold: 0.2
  snap-back-delay: 50ms
  velocity-timed-close: true
fetch:
  timeout: 10s
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.transition_duration, Duration::from_millis(400));
    assert!((cfg.zoom.max_scale - 5.0).abs() < f64::EPSILON);
    assert!((cfg.zoom.min_scale - 1.0).abs() < f64::EPSILON);
    assert!((cfg.dismiss.commit_threshold - 0.2).abs() < f64::EPSILON);
    assert_eq!(cfg.dismiss.snap_back_delay, Duration::from_millis(50));
    assert!(cfg.dismiss.velocity_timed_close);
    assert_eq!(cfg.fetch.timeout, Some(Duration::from_secs(10)));
}

#[test]
fn from_yaml_file_reads_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lightbox.yaml");
    std::fs::write(&path, "transition-duration: 1s\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.transition_duration, Duration::from_secs(1));
}

#[test]
fn missing_file_reports_path() {
    let err = Configuration::from_yaml_file("/nonexistent/lightbox.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/lightbox.yaml"));
}

#[test]
fn zero_transition_is_rejected() {
    let cfg: Configuration = serde_yaml::from_str("transition-duration: 0s").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn unknown_duration_format_fails_to_parse() {
    let res: Result<Configuration, _> = serde_yaml::from_str("transition-duration: soon");
    assert!(res.is_err());
}
