use std::io;

/// All error types for the mesh viewer.
#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("GPU error: {0}")]
    Gpu(String),
    #[error("Shader error: {0}")]
    Shader(String),
    #[error("Texture error: {0}")]
    Texture(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_strings() {
        let e = ViewerError::Input("missing.off".into());
        assert_eq!(e.to_string(), "Input error: missing.off");

        let e = ViewerError::Parse("face with 4 indices".into());
        assert_eq!(e.to_string(), "Parse error: face with 4 indices");

        let e = ViewerError::Gpu("buffer already allocated".into());
        assert_eq!(e.to_string(), "GPU error: buffer already allocated");

        let e = ViewerError::Shader("link failed".into());
        assert_eq!(e.to_string(), "Shader error: link failed");

        let e = ViewerError::Texture("unsupported format".into());
        assert_eq!(e.to_string(), "Texture error: unsupported format");

        let e = ViewerError::Config("zero viewport".into());
        assert_eq!(e.to_string(), "Config error: zero viewport");
    }

    #[test]
    fn from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let e: ViewerError = io_err.into();
        assert!(matches!(e, ViewerError::Io(_)));
        assert!(e.to_string().contains("file missing"));
    }
}
