//! Text building blocks for single and aggregated notifications.
//!
//! All functions take a non-empty batch; the last event is the
//! representative one for fields that are not aggregated.

use std::collections::BTreeMap;

use crate::model::{Event, format_etime};

pub const ESCALATED_MARKER: &str = "[escalated]";
pub const AGGREGATED_LABEL: &str = "aggregated";

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn display_endpoint(event: &Event) -> String {
    if event.endpoint_alias.is_empty() {
        event.endpoint.clone()
    } else {
        format!("{}({})", event.endpoint, event.endpoint_alias)
    }
}

/// Distinct endpoints of the batch, with a count suffix when more than one.
pub fn gen_endpoint(events: &[Event]) -> String {
    let list = dedup(events.iter().map(display_endpoint));
    if list.len() == 1 {
        return list[0].clone();
    }
    format!("{} ({})", list.join(","), list.len())
}

/// Distinct raw endpoint names, used for metadata lookups.
pub fn endpoints(events: &[Event]) -> Vec<String> {
    dedup(events.iter().map(|e| e.endpoint.clone()))
}

/// Metrics of the last event's details.
pub fn gen_metric(events: &[Event]) -> String {
    let Some(last) = events.last() else {
        return String::new();
    };
    match last.details() {
        Ok(details) => details
            .into_iter()
            .map(|d| d.metric)
            .collect::<Vec<_>>()
            .join(","),
        Err(e) => {
            tracing::error!(
                name = "notify.metric.invalid_detail",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                event_id = last.id,
                error = %e,
                message = "Cannot decode event detail"
            );
            String::new()
        }
    }
}

/// Union of tag values per key across the batch; `k=[v1,v2]` when a key varies.
pub fn gen_tags(events: &[Event]) -> String {
    let mut tags: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for event in events {
        let Ok(details) = event.details() else {
            continue;
        };
        let Some(first) = details.into_iter().next() else {
            continue;
        };
        for (k, v) in first.tags {
            let values = tags.entry(k).or_default();
            if !values.contains(&v) {
                values.push(v);
            }
        }
    }

    tags.into_iter()
        .map(|(k, v)| {
            if v.len() > 1 {
                format!("{k}=[{}]", v.join(","))
            } else {
                format!("{k}={}", v.join(","))
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Occurrence time, or `min~max` across the batch.
pub fn gen_etime(events: &[Event]) -> String {
    let (Some(min), Some(max)) = (
        events.iter().map(|e| e.etime).min(),
        events.iter().map(|e| e.etime).max(),
    ) else {
        return String::new();
    };
    if min == max {
        return format_etime(min);
    }
    format!("{}~{}", format_etime(min), format_etime(max))
}

/// `P{priority} {type}`, marked as aggregated for batches.
pub fn gen_status(events: &[Event]) -> String {
    let Some(last) = events.last() else {
        return String::new();
    };
    if events.len() > 1 {
        format!("P{} {AGGREGATED_LABEL} {}", last.priority, last.event_type)
    } else {
        format!("P{} {}", last.priority, last.event_type)
    }
}

/// `[P{level} {type}]{strategy} - {endpoint}` with escalation / aggregation markers.
pub fn gen_subject(is_upgrade: bool, events: &[Event], endpoint: &str) -> String {
    let Some(last) = events.last() else {
        return String::new();
    };
    let sname = &last.sname;
    let subject = format!("[{}]{sname} - {endpoint}", gen_status(events));
    if is_upgrade {
        format!("{ESCALATED_MARKER}{subject}")
    } else {
        subject
    }
}

/// Everything the plain-text body and the mail template show.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Content {
    pub status: String,
    pub sname: String,
    pub endpoint: String,
    pub metric: String,
    pub tags: String,
    pub value: String,
    pub info: String,
    pub etime: String,
    pub elink: String,
    pub slink: String,
    pub clink: String,
}

impl Content {
    pub fn render_text(&self, is_upgrade: bool) -> String {
        let mut text = format!(
            "Status: {}\nStrategy: {}\nEndpoint: {}\nMetric: {}\nTags: {}\nValue: {}\nInfo: {}\nTime: {}\nEvent: {}\nStrategy link: {}",
            self.status,
            self.sname,
            self.endpoint,
            self.metric,
            self.tags,
            self.value,
            self.info,
            self.etime,
            self.elink,
            self.slink,
        );
        if !self.clink.is_empty() {
            text.push_str(&format!("\nClaim: {}", self.clink));
        }
        if is_upgrade {
            text = format!("{ESCALATED_MARKER}\n{text}");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType;

    fn ev(endpoint: &str, role: &str, etime: i64) -> Event {
        Event {
            id: etime,
            sid: 3,
            sname: "mem.used high".into(),
            endpoint: endpoint.into(),
            endpoint_alias: String::new(),
            priority: 3,
            event_type: EventType::Alert,
            hashid: 1,
            etime,
            value: "93".into(),
            info: String::new(),
            detail: format!(r#"[{{"metric":"mem.used","tags":{{"role":"{role}"}}}}]"#),
            users: "[1]".into(),
            groups: "[]".into(),
            need_upgrade: 0,
            alert_upgrade: String::new(),
        }
    }

    fn batch() -> Vec<Event> {
        vec![ev("A", "db", 100), ev("B", "cache", 300), ev("A", "db", 200)]
    }

    #[test]
    fn endpoint_is_deduplicated_with_count() {
        assert_eq!(gen_endpoint(&batch()), "A,B (2)");
        assert_eq!(gen_endpoint(&batch()[..1]), "A");
    }

    #[test]
    fn endpoint_shows_alias() {
        let mut e = ev("10.0.0.1", "db", 1);
        e.endpoint_alias = "db-master".into();
        assert_eq!(gen_endpoint(&[e]), "10.0.0.1(db-master)");
    }

    #[test]
    fn tags_union_per_key() {
        assert_eq!(gen_tags(&batch()), "role=[db,cache]");
        assert_eq!(gen_tags(&batch()[..1]), "role=db");
    }

    #[test]
    fn etime_spans_batch() {
        assert_eq!(
            gen_etime(&batch()),
            "1970-01-01 00:01:40~1970-01-01 00:05:00"
        );
        assert_eq!(gen_etime(&batch()[..1]), "1970-01-01 00:01:40");
    }

    #[test]
    fn metric_lists_last_event_details() {
        let mut e = ev("A", "db", 1);
        e.detail = r#"[{"metric":"a"},{"metric":"b"}]"#.into();
        assert_eq!(gen_metric(&[e]), "a,b");
    }

    #[test]
    fn subject_markers() {
        let events = batch();
        assert_eq!(
            gen_subject(false, &events[..1], "A"),
            "[P3 alert]mem.used high - A"
        );
        assert_eq!(
            gen_subject(true, &events, "A,B (2)"),
            "[escalated][P3 aggregated alert]mem.used high - A,B (2)"
        );
    }

    #[test]
    fn empty_batch_yields_empty_strings() {
        assert_eq!(gen_status(&[]), "");
        assert_eq!(gen_subject(true, &[], "A"), "");
        assert_eq!(gen_etime(&[]), "");
    }

    #[test]
    fn text_includes_claim_only_when_present() {
        let mut content = Content {
            status: "P1 alert".into(),
            ..Default::default()
        };
        assert!(!content.render_text(false).contains("Claim:"));
        content.clink = "http://portal/claim/5".into();
        let text = content.render_text(true);
        assert!(text.starts_with("[escalated]\n"));
        assert!(text.ends_with("Claim: http://portal/claim/5"));
    }
}
