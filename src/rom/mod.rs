// src/rom/mod.rs
// ============================================================================
// ROM - Archivos hex de inicialización de memorias
// ============================================================================

pub mod validate;
pub mod writer;

pub use validate::{lane_groups, validate_rom, RomReport};
pub use writer::{RomSummary, RomWriter};
