use compute::ComputeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SonarError {
    #[error("invalid sonar configuration: {0}")]
    InvalidConfig(String),
    #[error("sonar target setup failed: {0}")]
    TargetSetup(String),
    #[error("sonar kernel failed: {0}")]
    Compute(#[from] ComputeError),
}

pub(crate) fn invalid(msg: impl Into<String>) -> SonarError {
    SonarError::InvalidConfig(msg.into())
}
