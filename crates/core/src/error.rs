use thiserror::Error;

#[derive(Error, Debug)]
pub enum PawError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Malformed timestamp '{0}': expected YYYY-MM-DD HH:MM")]
    MalformedTimestamp(String),

    #[error("Malformed time of day '{0}': expected HH:MM")]
    MalformedTimeOfDay(String),

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrenceConfig(String),

    #[error("Pet not found: {0}")]
    PetNotFound(String),

    #[error("Pet already exists: {0}")]
    DuplicatePet(String),

    #[error("Schedule entry not found: {0}")]
    EntryNotFound(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for PawError {
    fn from(e: serde_json::Error) -> Self {
        PawError::Serialize(e.to_string())
    }
}
