use thiserror::Error;

/// Errores de la capa de transporte (wifi / mqtt). Nunca son fatales.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("wifi failed to initialize")]
    WifiInitFailed,
    #[error("mqtt failed to initialize")]
    MqttInitFailed,
    #[error("mqtt failed to publish on {topic}")]
    MqttPublishFailed { topic: String },
}

/// Errores del almacenamiento persistente del inventario
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("inventory entry missing: {kind} {id}")]
    InventoryEntryMissing { kind: &'static str, id: usize },
    #[error("inventory store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("inventory store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errores del archivo de importacion masiva
#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("FILE ERROR line {line}: unexpected end of file")]
    UnexpectedEof { line: usize },
    #[error("FILE ERROR line {line}: invalid {field} ({value:?})")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("lock poisoned")]
    LockError,
    #[error("{kind} id {id} out of range (max {max})")]
    IdOutOfRange {
        kind: &'static str,
        id: i64,
        max: usize,
    },
    #[error("invalid value {value:?} for command {cmd}")]
    InvalidValue { cmd: String, value: String },
    #[error("inventory invariant broken: {0}")]
    InvalidInventory(String),
    #[error("{field} must be a non-negative number, got {value}")]
    InvalidAmount { field: &'static str, value: f64 },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl<T> From<std::sync::PoisonError<T>> for MachineError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        MachineError::LockError
    }
}
