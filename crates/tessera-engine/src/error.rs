use tessera_model::{ModelError, Point};
use thiserror::Error;

use crate::identity::PathResolutionError;
use crate::surface::SurfacePoint;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Unable to find the path for a model node: {0}")]
    PathResolution(#[from] PathResolutionError),

    #[error("Cannot resolve a surface point from model point {point}")]
    SurfacePointResolution { point: Point },

    #[error("Cannot resolve a model point from surface point {point}")]
    ModelPointResolution { point: SurfacePoint },

    #[error("Cannot resolve a model range from the surface selection")]
    SelectionResolution,

    #[error("Could not set focus after {attempts} attempts, editor seems stuck with pending operations")]
    FocusRetryExhausted { attempts: u32 },

    #[error("Operation rejected by the model: {0}")]
    Model(#[from] ModelError),
}
