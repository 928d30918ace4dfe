//! Environment overrides on top of a config file.
//!
//! Kept in its own test binary since it mutates the process environment.

use getappt_core::Config;

#[test]
fn test_env_values_keep_their_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[exchange]
server_url = "https://exchange.example.org/EWS/Exchange.asmx"
users = "room1@example.org"
username = "svc"
"#,
    )
    .unwrap();

    std::env::set_var("GETAPPT_EXCHANGE__PASSWORD", "007");
    std::env::set_var("GETAPPT_EXCHANGE__USERS", "0042");
    std::env::set_var("GETAPPT_APPOINTMENTS__DAYS", "10");

    let config = Config::load(Some(&path)).unwrap();

    std::env::remove_var("GETAPPT_EXCHANGE__PASSWORD");
    std::env::remove_var("GETAPPT_EXCHANGE__USERS");
    std::env::remove_var("GETAPPT_APPOINTMENTS__DAYS");

    assert_eq!(config.exchange.password.as_deref(), Some("007"));
    assert_eq!(config.exchange.users, "0042");
    assert_eq!(config.exchange.username.as_deref(), Some("svc"));
    assert_eq!(config.appointments.days, 10);
    assert!(config.validate().is_valid());
}
