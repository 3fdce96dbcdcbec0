use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("figure `{0}` has no panels")]
    EmptyFigure(String),
    #[error("bitmap size {width}x{height} is empty or too large")]
    BadSize { width: u32, height: u32 },
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("viewer window failed: {0}")]
    Viewer(String),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for RenderError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        RenderError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for RenderError {
    fn from(value: image::ImageError) -> Self {
        RenderError::Plot(value.to_string())
    }
}
