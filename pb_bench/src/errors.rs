use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown arg {0}")]
    UnknownFlag(String),

    #[error("flag {0} expects a value")]
    MissingValue(String),

    #[error("invalid value '{value}' for flag {flag}")]
    InvalidValue { flag: String, value: String },
}
