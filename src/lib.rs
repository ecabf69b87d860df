// src/lib.rs
// ============================================================================
// ROM-MAKER - Pesos/biases cuantizados a ROMs hex de punto fijo
// ============================================================================

pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fraction;
pub mod hex;
pub mod layout;
pub mod npy;
pub mod rom;
pub mod tensor;

// Re-exports principales
pub use builder::{build_roms, load_layers, write_manifest, write_roms, BuildStats, LayerStats, LayerTensors};
pub use config::RomConfig;
pub use error::{Result, RomError};
pub use fraction::{to_signed_fixed, FixedPointRecord};
pub use layout::{bias_layout, weight_layout};
pub use rom::{RomSummary, RomWriter};
pub use tensor::Tensor;
