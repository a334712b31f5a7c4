//! Model invariant errors.

use thiserror::Error;

use crate::asset::AssetState;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Illegal asset state transition: {from} -> {to}")]
    IllegalTransition { from: AssetState, to: AssetState },

    #[error("Remote id already assigned: {0}")]
    RemoteIdAlreadyAssigned(String),
}

impl ModelError {
    pub fn illegal_transition(from: AssetState, to: AssetState) -> Self {
        Self::IllegalTransition { from, to }
    }
}
