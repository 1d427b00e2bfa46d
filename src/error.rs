use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PainterError {
    #[error("Failed to find an appropriate adapter")]
    NoAdapter,
    #[error("Failed to create device: {0}")]
    RequestDevice(String),
    #[error("Shader program '{program}' failed to compile: {log}")]
    ShaderCompile { program: String, log: String },
    #[error("Invalid range")]
    InvalidRange,
    #[error("Renderer used before initialize()")]
    NotInitialized,
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Readback failed: {0}")]
    Readback(String),
    #[error("No render module registered under '{0}'")]
    UnknownModule(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid scene: {0}")]
    Scene(String),
    #[error("Image error: {0}")]
    Image(String),
    #[error("Unsupported: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, PainterError>;
