use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("no such file or directory: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),
    #[error("Failed to resolve the working directory: {0}")]
    WorkingDir(#[source] io::Error),
    #[error("Failed to load config: {0}")]
    Config(#[from] Box<figment::Error>),
    #[error("Failed to render config schema: {0}")]
    Schema(#[from] serde_json::Error),
    #[error("Failed to install log subscriber: {0}")]
    Logging(String),
    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),
    #[error("Failed to draw: {0}")]
    Surface(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn surface<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Surface(Box::new(err))
    }

    pub fn spawn(name: &'static str, source: io::Error) -> Self {
        Self::Spawn { name, source }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
