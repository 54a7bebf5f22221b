//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "MedBot".to_string()
}

pub fn default_data_dir() -> String {
    "~/.medbot".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_recipient() -> String {
    "Buddy".to_string()
}

pub fn default_alarm_time() -> String {
    "20:00".to_string()
}

pub fn default_guard_secs() -> u64 {
    15
}

pub fn default_retry_interval() -> u64 {
    1200
}

pub fn default_max_retries() -> u32 {
    3
}

pub fn default_poll_timeout() -> u64 {
    30
}

pub fn default_alarm_messages() -> Vec<String> {
    to_owned(&[
        "Have you taken your long-acting insulin analogue?",
        "Hey buddy, got your insulin?",
        "Have you taken your daily dose of insulin?",
    ])
}

pub fn default_reminder_messages() -> Vec<String> {
    to_owned(&["How about now?", "And now?", "... maybe now?"])
}

pub fn default_praise_messages() -> Vec<String> {
    to_owned(&["Great!", "Good for you!", "Well done!", "That's great!"])
}

pub fn default_give_up_messages() -> Vec<String> {
    to_owned(&["Okay, I'm giving up!", "It can't be helped!"])
}

fn to_owned(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}
