use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Required capability missing: {capability}. {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
