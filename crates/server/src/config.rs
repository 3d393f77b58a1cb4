use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::model::ChannelType;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Notification routing and queueing.
#[derive(Clone, Debug, Deserialize)]
pub struct NotifyConfig {
    /// Channel list per priority, keyed `p1`, `p2`, ...
    #[serde(default = "default_routes")]
    pub routes: HashMap<String, Vec<String>>,
    /// Channel queues are addressed as `queue_prefix + channel`.
    #[serde(default = "default_queue_prefix")]
    pub queue_prefix: String,
    #[serde(default = "default_callback_queue")]
    pub callback_queue: String,
    /// Handlebars template used for mail bodies. Read on every notification.
    #[serde(default = "default_mail_template")]
    pub mail_template: String,
    /// Events with `priority <= high_priority_max` are notified immediately.
    #[serde(default = "default_high_priority_max")]
    pub high_priority_max: i32,
    #[serde(default = "default_low_priority_flush_secs")]
    pub low_priority_flush_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            routes: default_routes(),
            queue_prefix: default_queue_prefix(),
            callback_queue: default_callback_queue(),
            mail_template: default_mail_template(),
            high_priority_max: default_high_priority_max(),
            low_priority_flush_secs: default_low_priority_flush_secs(),
        }
    }
}

impl NotifyConfig {
    /// Channels configured for a priority level; empty when the level is unrouted.
    pub fn channels_for(&self, priority: i32) -> &[String] {
        self.routes
            .get(&format!("p{priority}"))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn queue_for(&self, channel: ChannelType) -> String {
        format!("{}{}", self.queue_prefix, channel.as_str())
    }
}

/// Link templates. `{}` is replaced by the referenced id.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub stra: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub claim: String,
}

impl LinkConfig {
    pub fn render(template: &str, id: impl std::fmt::Display) -> String {
        template.replacen("{}", &id.to_string(), 1)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_cache_sync_secs")]
    pub cache_sync_secs: u64,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub links: LinkConfig,
}

fn default_routes() -> HashMap<String, Vec<String>> {
    [
        ("p1", vec!["voice", "sms", "mail", "im"]),
        ("p2", vec!["sms", "mail", "im"]),
        ("p3", vec!["mail", "im"]),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
    .collect()
}

fn default_queue_prefix() -> String {
    "/n9e/notify/queue/".into()
}

fn default_callback_queue() -> String {
    "/n9e/event/callback".into()
}

fn default_mail_template() -> String {
    "etc/mail.hbs".into()
}

fn default_high_priority_max() -> i32 {
    2
}

fn default_low_priority_flush_secs() -> u64 {
    60
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_workers() -> usize {
    8
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_cache_sync_secs() -> u64 {
    10
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Validation("workers must be > 0".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Validation("queue_capacity must be > 0".into()));
        }
        if self.notify.low_priority_flush_secs == 0 {
            return Err(ConfigError::Validation(
                "notify.low_priority_flush_secs must be > 0".into(),
            ));
        }
        for (level, channels) in &self.notify.routes {
            if let Some(bad) = channels
                .iter()
                .find(|c| c.parse::<ChannelType>().is_err())
            {
                return Err(ConfigError::Validation(format!(
                    "notify.routes.{level}: unknown channel '{bad}'"
                )));
            }
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any variable matching the key path separated by double underscores
/// (e.g. `NOTIFY__HIGH_PRIORITY_MAX`) overrides the file value.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml"))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            listen_addr: default_listen_addr(),
            workers: 2,
            queue_capacity: 16,
            cache_sync_secs: 10,
            notify: NotifyConfig::default(),
            links: LinkConfig::default(),
        }
    }

    #[test]
    fn default_routes_are_valid() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_channel() {
        let mut cfg = base();
        cfg.notify
            .routes
            .insert("p4".into(), vec!["mail".into(), "pager".into()]);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("pager"));
    }

    #[test]
    fn rejects_zero_workers() {
        let mut cfg = base();
        cfg.workers = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn channels_for_unrouted_level_is_empty() {
        let notify = NotifyConfig::default();
        assert_eq!(notify.channels_for(1).len(), 4);
        assert!(notify.channels_for(9).is_empty());
    }

    #[test]
    fn link_render_replaces_placeholder() {
        assert_eq!(
            LinkConfig::render("http://portal/event/{}", 42),
            "http://portal/event/42"
        );
        assert_eq!(LinkConfig::render("", 42), "");
    }
}
