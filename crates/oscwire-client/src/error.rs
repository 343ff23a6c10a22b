//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("osc error: {0}")]
    Osc(#[from] oscwire_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] oscwire_transport::TransportError),
}

impl ClientError {
    /// The codec or dispatch error, if this is one
    pub fn as_osc(&self) -> Option<&oscwire_core::Error> {
        match self {
            ClientError::Osc(e) => Some(e),
            ClientError::Transport(_) => None,
        }
    }
}
