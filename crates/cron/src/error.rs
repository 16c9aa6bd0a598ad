use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid cron expression '{expr}': {source}")]
    InvalidExpression {
        expr: String,
        #[source]
        source: cron::error::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
