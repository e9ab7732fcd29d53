//! Orchestrator error types.

use thiserror::Error;

use sdv_state::StateError;

/// Errors surfaced by orchestrator operations.
///
/// An infeasible placement is not an error: it produces a `failed` service
/// record instead.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("node already registered: {0}")]
    DuplicateNode(String),

    #[error("node {node} still hosts {services} service(s)")]
    NodeInUse { node: String, services: usize },

    #[error("invalid node: {0}")]
    InvalidNode(String),

    #[error("invalid fleet configuration: {0}")]
    Config(String),

    #[error("journal error: {0}")]
    Journal(StateError),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

// Registry errors keep their meaning; anything else came from the journal.
impl From<StateError> for OrchestratorError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::NodeNotFound(id) => Self::NodeNotFound(id),
            StateError::DuplicateNode(id) => Self::DuplicateNode(id),
            StateError::NodeInUse { node, services } => Self::NodeInUse { node, services },
            StateError::DuplicateTemplate(key) => {
                Self::Config(format!("duplicate template key: {key}"))
            }
            other => Self::Journal(other),
        }
    }
}

impl From<sdv_core::ConfigError> for OrchestratorError {
    fn from(e: sdv_core::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
