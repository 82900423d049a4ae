use ulid::Ulid;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    CapacityExceeded { party_size: u32, capacity: u32 },
    SlotTaken(Ulid),
    InvalidInput(String),
    AlreadyExists(String),
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    /// Stable machine-readable kind, used in API error bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            EngineError::SlotTaken(_) => "SLOT_TAKEN",
            EngineError::InvalidInput(_) => "INVALID_INPUT",
            EngineError::AlreadyExists(_) => "ALREADY_EXISTS",
            EngineError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            EngineError::WalError(_) => "WAL_ERROR",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "table does not exist: {id}"),
            EngineError::CapacityExceeded {
                party_size,
                capacity,
            } => write!(
                f,
                "party of {party_size} exceeds table capacity {capacity}"
            ),
            EngineError::SlotTaken(id) => {
                write!(f, "table {id} is already reserved at that time")
            }
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::AlreadyExists(what) => write!(f, "already exists: {what}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
