//! Render error types
//!
//! Every variant describes a unit of work that was skipped. None of them is
//! fatal to the render thread.

use thiserror::Error;

/// Reasons a frame, batch or request produced no output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("mesh '{0}' is still being processed")]
    AssetNotReady(String),
    #[error("mesh asset was released before the frame executed")]
    MeshReleased,
    #[error("mesh '{0}' has no renderable geometry")]
    NoRenderableGeometry(String),
    #[error("no shader permutation resolved for material '{0}'")]
    ShaderResolutionFailure(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenderError::AssetNotReady("chair".to_string());
        assert_eq!(err.to_string(), "mesh 'chair' is still being processed");

        let err = RenderError::MeshReleased;
        assert_eq!(
            err.to_string(),
            "mesh asset was released before the frame executed"
        );
    }
}
