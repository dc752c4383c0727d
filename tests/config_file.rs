use std::io::Write;
use std::time::Duration;

use cas_logout_hook::{Config, ConfigError, FailurePolicy, HookOptions};

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config.menu.interval_ms, 250);
    assert_eq!(
        HookOptions::from_config(&config),
        Err(ConfigError::MissingCasServerUrl)
    );
}

#[test]
fn file_drives_hook_options() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
menu:
  interval_ms: 500
  timeout_ms: null
popup:
  timeout_ms: 2000
logout:
  failure: warn
  retries: 1
cas:
  server_url: https://cas.example.com/cas
  logout_path: signout
  logout_redirect: false
http:
  base_url: https://sonar.example.com
  request_timeout_ms: 5000
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.http.request_timeout_ms, Some(5_000));

    let options = HookOptions::from_config(&config).unwrap();
    assert_eq!(options.menu_interval, Duration::from_millis(500));
    assert_eq!(options.menu_timeout, None);
    assert_eq!(options.popup_interval, Duration::from_millis(100));
    assert_eq!(options.popup_timeout, Some(Duration::from_secs(2)));
    assert_eq!(options.logout_endpoint, "/api/authentication/logout");
    assert_eq!(options.destination, "https://cas.example.com/cas/signout");
    assert_eq!(options.failure_policy, FailurePolicy::Warn);
    assert_eq!(options.retries, 1);
}

#[test]
fn malformed_file_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "menu: [unclosed").unwrap();
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::Parse(_))
    ));
}
