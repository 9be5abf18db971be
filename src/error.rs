use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("\"{key}\" is not a boolean: {value:?}")]
    InvalidBool { key: String, value: String },

    #[error("\"{key}\" is not a number: {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("invalid api url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}
