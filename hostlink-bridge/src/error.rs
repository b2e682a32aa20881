use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("entry point {name} not found in {module}")]
    EntryPointNotFound { module: String, name: String },

    #[error("options type {name} not found in {module}")]
    OptionsTypeNotFound { module: String, name: String },

    #[error("default options {symbol} not exposed by host {module}")]
    DefaultOptionsMissing { module: String, symbol: String },

    #[error("default options {symbol} are not a {options_type}")]
    DefaultOptionsRejected { symbol: String, options_type: String },

    #[error("failed to encode {type_name}: {message}")]
    EncodeFailed { type_name: String, message: String },

    #[error("failed to decode {type_name}: {message}")]
    DecodeFailed { type_name: String, message: String },

    #[error("options error: {0}")]
    OptionsFailed(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
