use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("source folder does not exist: {0}")]
    SourceNotFound(String),

    #[error("move decision requires a destination folder")]
    MissingDestination,

    #[error("folder {path} still has {assigned} file(s) assigned")]
    FolderInUse { path: String, assigned: usize },

    #[error("no free name for {path} after {attempts} attempts")]
    NamesExhausted { path: String, attempts: usize },

    #[error("cannot move {path} into itself ({destination})")]
    MoveIntoItself { path: String, destination: String },

    #[error("Trash error: {0}")]
    Trash(String),

    #[error("{0}")]
    General(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
