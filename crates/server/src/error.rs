use thiserror::Error;

/// Failures of the external stores (durable log, marker store, queues, directory).
///
/// None of these abort the decision flow; callers log them and carry on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid recipient list {raw:?}: {source}")]
    Recipients {
        raw: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Cannot read mail template {path}: {source}")]
    TemplateIo {
        path: String,
        source: std::io::Error,
    },
    #[error("Cannot parse mail template {path}: {message}")]
    TemplateParse { path: String, message: String },
    #[error("Cannot render mail template: {0}")]
    TemplateRender(#[from] handlebars::RenderError),
}
