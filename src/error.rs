// src/error.rs
// ============================================================================
// ERRORES - Taxonomía de fallos del generador de ROMs
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RomError {
    /// Error de programación: ancho de bits inválido, frac_bits inutilizable...
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Valor de diagnóstico fuera de [-1, 1)
    #[error("Value {value} out of representable range [-1, 1)")]
    OutOfRange { value: f64 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Archivo .npy ausente o malformado
    #[error("Bad npy file {}: {reason}", path.display())]
    Npy { path: PathBuf, reason: String },

    /// Tensor con forma incompatible con la capa
    #[error("Shape error: {0}")]
    Shape(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RomError>;
