//! Mail body rendering from a runtime Handlebars template.

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::NotifyError;
use crate::model::EndpointBinding;
use crate::notify::compose::Content;

const TEMPLATE_NAME: &str = "mail";

/// Variables exposed to the mail template.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MailContext<'a> {
    pub is_alert: bool,
    pub status: &'a str,
    pub sname: &'a str,
    pub endpoint: &'a str,
    pub metric: &'a str,
    pub tags: &'a str,
    pub value: &'a str,
    pub info: &'a str,
    pub etime: &'a str,
    pub elink: &'a str,
    pub slink: &'a str,
    pub has_claim: bool,
    pub clink: &'a str,
    pub is_upgrade: bool,
    pub bindings: &'a [EndpointBinding],
}

impl<'a> MailContext<'a> {
    pub fn new(
        content: &'a Content,
        is_alert: bool,
        is_upgrade: bool,
        bindings: &'a [EndpointBinding],
    ) -> Self {
        Self {
            is_alert,
            status: &content.status,
            sname: &content.sname,
            endpoint: &content.endpoint,
            metric: &content.metric,
            tags: &content.tags,
            value: &content.value,
            info: &content.info,
            etime: &content.etime,
            elink: &content.elink,
            slink: &content.slink,
            has_claim: !content.clink.is_empty(),
            clink: &content.clink,
            is_upgrade,
            bindings,
        }
    }
}

pub fn render_template(
    source: &str,
    path: &str,
    ctx: &MailContext<'_>,
) -> Result<String, NotifyError> {
    let mut registry = Handlebars::new();
    registry
        .register_template_string(TEMPLATE_NAME, source)
        .map_err(|e| NotifyError::TemplateParse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
    Ok(registry.render(TEMPLATE_NAME, ctx)?)
}

/// Render the mail body. Never fails: problems become an inline diagnostic body.
pub async fn render_mail(path: &str, ctx: &MailContext<'_>) -> String {
    let rendered = match tokio::fs::read_to_string(path).await {
        Ok(source) => render_template(&source, path, ctx),
        Err(source) => Err(NotifyError::TemplateIo {
            path: path.to_string(),
            source,
        }),
    };

    rendered.unwrap_or_else(|e| {
        tracing::error!(
            name = "notify.mail.template_failed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            path = %path,
            error = %e,
            message = "Mail template unusable, sending diagnostic body"
        );
        format!("InternalServerError: {e}")
    })
}
