use std::fmt;

/// Failure of one render attempt.
///
/// `Compile` and `Link` are recoverable: the previously linked program and the
/// last good frame stay in place. The other variants mean the GPU side is not
/// usable.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("built-in vertex shader failed to compile:\n{log}")]
    VertexCompile { log: String },
    #[error("fragment shader failed to compile:\n{log}")]
    Compile { log: String },
    #[error("shader program failed to link:\n{log}")]
    Link { log: String },
    #[error("canvas size {width}x{height} exceeds the GPU limit of {limit}")]
    CanvasTooLarge { width: u32, height: u32, limit: u32 },
    #[error("GPU device unavailable: {0}")]
    Device(String),
    #[error("failed to read the canvas back from the GPU: {0}")]
    Readback(String),
}

/// Coarse classification of a [`RenderError`] for logging and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Compile,
    Link,
    Fatal,
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Compile { .. } => ErrorKind::Compile,
            Self::Link { .. } => ErrorKind::Link,
            Self::VertexCompile { .. }
            | Self::CanvasTooLarge { .. }
            | Self::Device(_)
            | Self::Readback(_) => ErrorKind::Fatal,
        }
    }

    /// Whether the playground can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Compile | ErrorKind::Link
        ) || matches!(self, Self::CanvasTooLarge { .. })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compile => "compile",
            Self::Link => "link",
            Self::Fatal => "fatal",
        })
    }
}
