use super::*;
use std::io::Write;

#[test]
fn test_defaults_are_valid() {
    let cfg = Config::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.reminder.recipient, "Buddy");
    assert_eq!(cfg.reminder.guard_secs, 15);
    assert_eq!(cfg.reminder.retry_interval_secs, 1200);
    assert_eq!(cfg.reminder.max_retries, 3);
    assert_eq!(cfg.runtime.flavor, RuntimeFlavor::CurrentThread);
    assert_eq!(cfg.channel.transport, Transport::Console);
}

#[test]
fn test_alarm_time_parsing() {
    let mut rc = ReminderConfig::default();
    assert_eq!(
        rc.alarm_time().unwrap(),
        NaiveTime::from_hms_opt(20, 0, 0).unwrap()
    );

    rc.alarm_time = "18:40".into();
    assert_eq!(
        rc.alarm_time().unwrap(),
        NaiveTime::from_hms_opt(18, 40, 0).unwrap()
    );

    rc.alarm_time = "07:05:30".into();
    assert_eq!(
        rc.alarm_time().unwrap(),
        NaiveTime::from_hms_opt(7, 5, 30).unwrap()
    );

    rc.alarm_time = "25:00".into();
    assert!(matches!(rc.alarm_time(), Err(MedbotError::Config(_))));

    rc.alarm_time = String::new();
    assert!(rc.alarm_time().is_err());
}

#[test]
fn test_reminder_from_toml_partial() {
    let toml_str = r#"
        recipient = "Florian"
        alarm_time = "18:40"
    "#;
    let rc: ReminderConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(rc.recipient, "Florian");
    assert_eq!(rc.retry_interval_secs, 1200);
    assert_eq!(rc.max_retries, 3);
    assert_eq!(rc.retry_interval(), Duration::from_secs(1200));
    assert_eq!(rc.guard(), Duration::from_secs(15));
}

#[test]
fn test_full_config_from_toml() {
    let toml_str = r#"
        [medbot]
        log_level = "debug"

        [reminder]
        recipient = "Buddy"
        alarm_time = "08:30"
        retry_interval_secs = 600
        max_retries = 5

        [messages]
        alarm = ["Pills?"]
        reminder = ["Pills now?"]
        praise = ["Nice."]
        give_up = ["Bye."]

        [runtime]
        flavor = "multi_thread"

        [channel]
        transport = "telegram"

        [channel.telegram]
        bot_token = "123:abc"
        contacts = { "Buddy" = 42 }
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.medbot.log_level, "debug");
    assert_eq!(cfg.medbot.name, "MedBot");
    assert_eq!(cfg.reminder.max_retries, 5);
    assert_eq!(cfg.messages.alarm, vec!["Pills?".to_string()]);
    assert_eq!(cfg.runtime.flavor, RuntimeFlavor::MultiThread);
    assert_eq!(cfg.channel.transport, Transport::Telegram);
    let tg = cfg.channel.telegram.unwrap();
    assert_eq!(tg.contacts.get("Buddy"), Some(&42));
    assert_eq!(tg.poll_timeout_secs, 30);
}

#[test]
fn test_validate_rejects_empty_pool() {
    let mut cfg = Config::default();
    cfg.messages.praise.clear();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("messages.praise"));

    let mut cfg = Config::default();
    cfg.messages.give_up = vec!["   ".into()];
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_bad_reminder_settings() {
    let mut cfg = Config::default();
    cfg.reminder.recipient = "  ".into();
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.reminder.retry_interval_secs = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.reminder.alarm_time = "noon".into();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_bounds_intervals() {
    let mut cfg = Config::default();
    cfg.reminder.retry_interval_secs = SECS_PER_DAY;
    cfg.reminder.guard_secs = SECS_PER_DAY - 1;
    assert!(cfg.validate().is_ok());

    let mut cfg = Config::default();
    cfg.reminder.retry_interval_secs = SECS_PER_DAY + 1;
    assert!(matches!(cfg.validate(), Err(MedbotError::Config(_))));

    let mut cfg = Config::default();
    cfg.reminder.guard_secs = 10_000_000_000_000;
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("reminder.guard_secs"));

    let toml_str = r#"
        [reminder]
        retry_interval_secs = 9223372036854775807
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_telegram_requires_token() {
    let mut cfg = Config::default();
    cfg.channel.transport = Transport::Telegram;
    assert!(cfg.validate().is_err());

    cfg.channel.telegram = Some(TelegramConfig {
        bot_token: "123:abc".into(),
        ..Default::default()
    });
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__medbot_config__.toml").unwrap();
    assert_eq!(cfg.reminder.alarm_time, "20:00");
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[reminder]\nmax_retries = 7").unwrap();
    let cfg = load(file.path().to_str().unwrap()).unwrap();
    assert_eq!(cfg.reminder.max_retries, 7);
    assert_eq!(cfg.reminder.recipient, "Buddy");
}

#[test]
fn test_load_rejects_malformed_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[reminder\nmax_retries = ").unwrap();
    let err = load(file.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, MedbotError::Config(_)));
}

#[test]
fn test_shellexpand() {
    assert_eq!(shellexpand("/abs/path"), "/abs/path");
    if let Some(home) = std::env::var_os("HOME") {
        assert_eq!(
            shellexpand("~/.medbot"),
            format!("{}/.medbot", home.to_string_lossy())
        );
    }
}
