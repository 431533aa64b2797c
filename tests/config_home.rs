mod support;

use support::env::ConfigHomeGuard;
use support::fakes::{FakeCamera, FeedSources};
use teachable::config::{self, CONFIG_FILE_NAME, SessionConfig};
use teachable::session::{Mode, SessionController, SessionParts};
use tempfile::tempdir;

#[test]
fn missing_config_loads_defaults() {
    let dir = tempdir().unwrap();
    let _guard = ConfigHomeGuard::set(dir.path().to_path_buf());
    let cfg = config::load_or_default().unwrap();
    assert_eq!(cfg, SessionConfig::default());
}

#[test]
fn saved_config_drives_a_new_session() {
    let dir = tempdir().unwrap();
    let _guard = ConfigHomeGuard::set(dir.path().to_path_buf());

    let mut cfg = SessionConfig::default();
    cfg.default_mode = Mode::Audio;
    cfg.class_names = vec!["Clap".into(), "Snap".into(), "Silence".into()];
    cfg.output.send_threshold = 0.8;
    config::save(&cfg).unwrap();

    let path = config::config_path().unwrap();
    assert!(path.starts_with(dir.path()));
    assert!(path.ends_with(CONFIG_FILE_NAME));
    let loaded = config::load_or_default().unwrap();
    assert_eq!(loaded, cfg);

    let parts = SessionParts::new(
        Box::new(FakeCamera::new()),
        Box::new(FeedSources::new(Default::default())),
    );
    let controller = SessionController::new(loaded, parts);
    assert_eq!(controller.mode(), Mode::Audio);
    assert_eq!(
        controller.classes().display_names(),
        vec!["Clap", "Snap", "Silence"]
    );
}
