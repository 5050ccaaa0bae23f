#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    /// 插入位置的前驱或后继不存在，或者前驱并不排在后继之前
    #[error("phase not found: cannot place '{phase}' between '{predecessor}' and '{successor}'")]
    PhaseNotFound {
        phase: String,
        predecessor: String,
        successor: String,
    },

    #[error("unknown phase '{0}'")]
    UnknownPhase(String),

    #[error("phase '{0}' is already registered")]
    DuplicatePhase(String),

    #[error("phase '{phase}' failed: {source}")]
    System {
        phase: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PhaseError {
    /// 出错的阶段名称
    pub fn phase(&self) -> &str {
        match self {
            PhaseError::PhaseNotFound { phase, .. } => phase,
            PhaseError::UnknownPhase(phase) => phase,
            PhaseError::DuplicatePhase(phase) => phase,
            PhaseError::System { phase, .. } => phase,
        }
    }
}
