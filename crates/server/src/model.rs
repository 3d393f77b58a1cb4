//! Domain types shared by the lifecycle engine and the notifier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use time::macros::format_description;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Alert,
    Recovery,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Alert => "alert",
            EventType::Recovery => "recovery",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded for one event occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Mask,
    Upgrade,
    Converge,
    Callback,
    Send,
    NoneUser,
    /// Parked in a low-priority batch; the flush records `Send` later.
    Queued,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Mask => "mask",
            Status::Upgrade => "upgrade",
            Status::Converge => "converge",
            Status::Callback => "callback",
            Status::Send => "send",
            Status::NoneUser => "none_user",
            Status::Queued => "queued",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One metric series that triggered the event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetail {
    pub metric: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Escalation configuration carried by an event as JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertUpgrade {
    /// JSON-encoded user id list.
    #[serde(default = "empty_id_list")]
    pub users: String,
    /// JSON-encoded team id list.
    #[serde(default = "empty_id_list")]
    pub groups: String,
    /// Seconds an alert may stay unhandled before escalating.
    pub duration: i64,
    pub level: i32,
}

fn empty_id_list() -> String {
    "[]".into()
}

/// A single alert or recovery occurrence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub sid: i64,
    #[serde(default)]
    pub sname: String,
    pub endpoint: String,
    #[serde(default)]
    pub endpoint_alias: String,
    pub priority: i32,
    pub event_type: EventType,
    pub hashid: u64,
    /// Occurrence time, Unix seconds.
    pub etime: i64,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default = "empty_id_list")]
    pub users: String,
    #[serde(default = "empty_id_list")]
    pub groups: String,
    #[serde(default)]
    pub need_upgrade: i32,
    #[serde(default)]
    pub alert_upgrade: String,
}

impl Event {
    pub fn is_alert(&self) -> bool {
        self.event_type == EventType::Alert
    }

    pub fn needs_upgrade(&self) -> bool {
        self.need_upgrade == 1
    }

    pub fn has_recipients(&self) -> bool {
        self.users.trim() != "[]" || self.groups.trim() != "[]"
    }

    pub fn details(&self) -> Result<Vec<EventDetail>, serde_json::Error> {
        serde_json::from_str(&self.detail)
    }

    pub fn alert_upgrade(&self) -> Result<AlertUpgrade, serde_json::Error> {
        serde_json::from_str(&self.alert_upgrade)
    }
}

/// Latest known state of a hash identity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentEvent {
    pub id: i64,
    pub hashid: u64,
    pub claimants: String,
    pub ignore_alert: i32,
    pub priority: i32,
    pub status: String,
}

impl CurrentEvent {
    pub fn is_claimed(&self) -> bool {
        let claimants = self.claimants.trim();
        !claimants.is_empty() && claimants != "[]"
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore_alert == 1
    }
}

/// Alerting rule referenced by `Event::sid`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: i64,
    pub name: String,
    /// `[window_seconds, max_count]`.
    pub converge: [i64; 2],
    pub recovery_notify: i32,
    #[serde(default)]
    pub callback: String,
}

impl Strategy {
    pub fn needs_callback(&self) -> bool {
        !self.callback.trim().is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub phone: String,
    pub email: String,
    pub im: String,
}

/// Tree nodes an endpoint is attached to, shown in mail bodies.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointBinding {
    pub endpoint: String,
    pub nodes: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelType {
    Voice,
    Sms,
    Mail,
    Im,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Voice => "voice",
            ChannelType::Sms => "sms",
            ChannelType::Mail => "mail",
            ChannelType::Im => "im",
        }
    }

    /// Recipient address used on this channel.
    pub fn address<'a>(&self, user: &'a User) -> &'a str {
        match self {
            ChannelType::Voice | ChannelType::Sms => &user.phone,
            ChannelType::Mail => &user.email,
            ChannelType::Im => &user.im,
        }
    }
}

impl FromStr for ChannelType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(ChannelType::Voice),
            "sms" => Ok(ChannelType::Sms),
            "mail" => Ok(ChannelType::Mail),
            "im" => Ok(ChannelType::Im),
            other => Err(format!("unsupported channel type: {other}")),
        }
    }
}

/// Payload pushed onto a channel delivery queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotifyMessage {
    #[serde(rename = "Tos")]
    pub tos: Vec<String>,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

/// Format a Unix timestamp as `YYYY-MM-DD hh:mm:ss` (UTC).
pub fn format_etime(ts: i64) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|t| t.format(&format).ok())
        .unwrap_or_else(|| ts.to_string())
}

/// Decode a JSON id list such as `[1,2,3]`.
pub fn parse_ids(raw: &str) -> Result<Vec<i64>, serde_json::Error> {
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_require_a_non_empty_list() {
        let mut ev = sample();
        ev.users = " [] ".into();
        ev.groups = "[]".into();
        assert!(!ev.has_recipients());
        ev.groups = "[3]".into();
        assert!(ev.has_recipients());
    }

    #[test]
    fn claimants_empty_forms() {
        let mut cur = CurrentEvent::default();
        assert!(!cur.is_claimed());
        cur.claimants = " [] ".into();
        assert!(!cur.is_claimed());
        cur.claimants = "[\"alice\"]".into();
        assert!(cur.is_claimed());
    }

    #[test]
    fn notify_message_uses_wire_keys() {
        let msg = NotifyMessage {
            tos: vec!["a@example.com".into()],
            subject: "s".into(),
            content: "c".into(),
            kind: "mail".into(),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["Tos"][0], "a@example.com");
        assert_eq!(v["Type"], "mail");
    }

    #[test]
    fn etime_formatting() {
        assert_eq!(format_etime(0), "1970-01-01 00:00:00");
        assert_eq!(format_etime(1_700_000_000), "2023-11-14 22:13:20");
    }

    #[test]
    fn status_strings_are_stable() {
        assert_eq!(Status::NoneUser.as_str(), "none_user");
        assert_eq!(
            serde_json::to_string(&Status::NoneUser).unwrap(),
            "\"none_user\""
        );
    }

    fn sample() -> Event {
        Event {
            id: 1,
            sid: 1,
            sname: "cpu".into(),
            endpoint: "host-1".into(),
            endpoint_alias: String::new(),
            priority: 1,
            event_type: EventType::Alert,
            hashid: 7,
            etime: 0,
            value: String::new(),
            info: String::new(),
            detail: "[]".into(),
            users: "[1]".into(),
            groups: "[]".into(),
            need_upgrade: 0,
            alert_upgrade: String::new(),
        }
    }
}
