//! Notification composer and dispatcher.
//!
//! ## Submodules
//!
//! - `compose` - endpoint/metric/tag/time/subject strings for a batch
//! - `mail` - Handlebars mail body with an inline diagnostic fallback
//! - `dispatch` - bounded fire-and-forget work queue

pub mod compose;
pub mod dispatch;
pub mod mail;

pub use dispatch::{Dispatcher, NotifyJob};

use std::sync::Arc;

use crate::Services;
use crate::config::{AppConfig, LinkConfig};
use crate::error::NotifyError;
use crate::model::{ChannelType, EndpointBinding, Event, NotifyMessage, User, parse_ids};
use crate::notify::compose::Content;
use crate::notify::mail::{MailContext, render_mail};
use crate::store::{Directory, EventStore, QueueSink};

/// Builds channel messages for one event or an aggregated batch and enqueues them.
#[derive(Clone)]
pub struct Notifier {
    config: Arc<AppConfig>,
    events: Arc<dyn EventStore>,
    directory: Arc<dyn Directory>,
    queues: Arc<dyn QueueSink>,
}

impl Notifier {
    pub fn new(services: &Services) -> Self {
        Self {
            config: services.config.clone(),
            events: services.events.clone(),
            directory: services.directory.clone(),
            queues: services.queues.clone(),
        }
    }

    async fn resolve_user_ids(&self, users: &str, groups: &str) -> Result<Vec<i64>, NotifyError> {
        let mut ids = parse_ids(users).map_err(|source| NotifyError::Recipients {
            raw: users.to_string(),
            source,
        })?;
        let team_ids = parse_ids(groups).map_err(|source| NotifyError::Recipients {
            raw: groups.to_string(),
            source,
        })?;
        ids.extend(self.directory.user_ids_by_team_ids(&team_ids).await?);
        Ok(ids)
    }

    /// Recipient ids and the priority whose routing table applies.
    async fn recipients(
        &self,
        is_upgrade: bool,
        last: &Event,
    ) -> Result<(Vec<i64>, i32), NotifyError> {
        let mut ids = self.resolve_user_ids(&last.users, &last.groups).await?;
        let mut priority = last.priority;

        if is_upgrade {
            match last.alert_upgrade() {
                Ok(upgrade) => {
                    match self.resolve_user_ids(&upgrade.users, &upgrade.groups).await {
                        Ok(extra) => ids.extend(extra),
                        Err(e) => tracing::error!(
                            name = "notify.upgrade_recipients_failed",
                            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                            event_id = last.id,
                            error = %e,
                            message = "Cannot resolve escalation recipients"
                        ),
                    }
                    priority = upgrade.level;
                }
                Err(e) => tracing::error!(
                    name = "notify.upgrade_config_invalid",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    event_id = last.id,
                    error = %e,
                    message = "Cannot decode escalation config, using base audience"
                ),
            }
        }

        ids.sort_unstable();
        ids.dedup();
        Ok((ids, priority))
    }

    /// First batch member whose current-event row still exists.
    async fn claim_link(&self, events: &[Event]) -> String {
        for event in events {
            match self.events.event_cur_get(event.hashid).await {
                Ok(Some(cur)) => return LinkConfig::render(&self.config.links.claim, cur.id),
                Ok(None) => continue,
                Err(e) => tracing::error!(
                    name = "notify.claim_link.lookup_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    hashid = event.hashid,
                    error = %e,
                    message = "Current event lookup failed"
                ),
            }
        }
        String::new()
    }

    async fn bindings(&self, events: &[Event]) -> Vec<EndpointBinding> {
        match self
            .directory
            .endpoint_bindings(&compose::endpoints(events))
            .await
        {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(
                    name = "notify.bindings_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    error = %e,
                    message = "Cannot load endpoint bindings"
                );
                Vec::new()
            }
        }
    }

    /// Compose and enqueue notifications for `events` (one occurrence or a batch).
    ///
    /// Failures are logged; nothing is returned to the decision path.
    #[tracing::instrument(skip_all, fields(is_upgrade = is_upgrade, count = events.len()))]
    pub async fn notify(&self, is_upgrade: bool, events: &[Event]) {
        let (Some(first), Some(last)) = (events.first(), events.last()) else {
            return;
        };

        let (user_ids, priority) = match self.recipients(is_upgrade, last).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    name = "notify.recipients_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    event_id = last.id,
                    error = %e,
                    message = "Notify failed, cannot resolve recipients"
                );
                return;
            }
        };

        let users = match self.directory.users_by_ids(&user_ids).await {
            Ok(u) => u,
            Err(e) => {
                tracing::error!(
                    name = "notify.users_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    event_id = last.id,
                    error = %e,
                    message = "Notify failed, cannot load users"
                );
                return;
            }
        };

        let is_alert = first.is_alert();
        let endpoint = compose::gen_endpoint(events);
        let links = &self.config.links;
        let content = Content {
            status: compose::gen_status(events),
            sname: last.sname.clone(),
            endpoint: endpoint.clone(),
            metric: compose::gen_metric(events),
            tags: compose::gen_tags(events),
            value: last.value.clone(),
            info: last.info.clone(),
            etime: compose::gen_etime(events),
            elink: LinkConfig::render(&links.event, last.id),
            slink: LinkConfig::render(&links.stra, last.sid),
            clink: if is_alert {
                self.claim_link(events).await
            } else {
                String::new()
            },
        };

        let text = content.render_text(is_upgrade);
        let subject = compose::gen_subject(is_upgrade, events, &endpoint);
        let bindings = self.bindings(events).await;
        let mail_body = render_mail(
            &self.config.notify.mail_template,
            &MailContext::new(&content, is_alert, is_upgrade, &bindings),
        )
        .await;

        for name in self.config.notify.channels_for(priority) {
            let channel = match name.parse::<ChannelType>() {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!(
                        name = "notify.channel_unsupported",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        channel = %name,
                        event_id = last.id,
                        error = %e,
                        message = "Skipping unsupported channel"
                    );
                    continue;
                }
            };

            let (body, subject) = match channel {
                ChannelType::Voice if !is_alert => continue,
                ChannelType::Voice => (first.sname.clone(), String::new()),
                ChannelType::Sms | ChannelType::Im => (text.clone(), String::new()),
                ChannelType::Mail => (mail_body.clone(), subject.clone()),
            };

            let message = NotifyMessage {
                tos: addresses(&users, channel),
                subject,
                content: body,
                kind: channel.as_str().to_string(),
            };
            self.send(channel, &message).await;
        }
    }

    async fn send(&self, channel: ChannelType, message: &NotifyMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(
                    name = "notify.encode_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    channel = channel.as_str(),
                    error = %e,
                    message = "Cannot encode notify message"
                );
                return;
            }
        };

        let queue = self.config.notify.queue_for(channel);
        match self.queues.push(&queue, payload).await {
            Ok(()) => tracing::debug!(
                name = "notify.enqueued",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                queue = %queue,
                recipients = message.tos.len(),
                message = "Notification enqueued"
            ),
            Err(e) => tracing::error!(
                name = "notify.enqueue_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                queue = %queue,
                error = %e,
                message = "Failed to enqueue notification"
            ),
        }
    }
}

/// Distinct non-empty addresses of `users` on `channel`.
fn addresses(users: &[User], channel: ChannelType) -> Vec<String> {
    let mut tos: Vec<String> = Vec::new();
    for user in users {
        let addr = channel.address(user);
        if !addr.is_empty() && !tos.iter().any(|t| t == addr) {
            tos.push(addr.to_string());
        }
    }
    tos
}
