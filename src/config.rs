// src/config.rs
// ============================================================================
// CONFIG - Constantes del acelerador (inmutables durante una ejecución)
// ============================================================================
//
// Por defecto:
//   MAC_CNT = 4, W_WIDTH = 8, B_WIDTH = 32, FRAC_BITS = 8
//   LAYERS  = [256, 128, 10]   (sin contar la capa de entrada)
//
// Se puede sobreescribir con un JSON; los campos ausentes toman el default:
//   { "mac_cnt": 8, "layers": [64, 10] }
//
// ============================================================================

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RomError};
use crate::fraction::MAX_FRAC_BITS;

/// Marcador del índice de capa en los patrones de nombre
pub const LAYER_PLACEHOLDER: &str = "(?)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RomConfig {
    /// Número de MACs en paralelo (ancho de un lane group)
    pub mac_cnt: usize,
    /// Bits por peso
    pub w_width: u32,
    /// Bits por bias
    pub b_width: u32,
    /// Bits fraccionarios para el chequeo de escalas (sin signo)
    pub frac_bits: u32,
    /// Neuronas por capa, en orden
    pub layers: Vec<usize>,
    /// Patrón de biases, "(?)" = índice de capa desde 1
    pub bias_pattern: String,
    pub weight_pattern: String,
    /// Nombres de las ROMs de salida
    pub bias_rom: String,
    pub weight_rom: String,
    /// Escalas conocidas a validar con FRAC_BITS
    pub scales: Vec<f64>,
}

impl Default for RomConfig {
    fn default() -> Self {
        Self {
            mac_cnt: 4,
            w_width: 8,
            b_width: 32,
            frac_bits: 8,
            layers: vec![256, 128, 10],
            bias_pattern: "layer(?)_bias.npy".to_string(),
            weight_pattern: "layer(?)_weight.npy".to_string(),
            bias_rom: "bias_rom_hex.txt".to_string(),
            weight_rom: "weight_rom_hex.txt".to_string(),
            scales: vec![0.0078125, 0.0078125, 0.00390625],
        }
    }
}

impl RomConfig {
    /// Carga desde JSON y valida
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| RomError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(RomError::InvalidConfig(msg));

        if self.mac_cnt == 0 {
            return fail("mac_cnt must be > 0".to_string());
        }
        if self.w_width == 0 || self.b_width == 0 {
            return fail(format!(
                "bit widths must be > 0 (w_width={}, b_width={})",
                self.w_width, self.b_width
            ));
        }
        if self.frac_bits > MAX_FRAC_BITS {
            return fail(format!("frac_bits must be <= {}", MAX_FRAC_BITS));
        }
        if self.layers.is_empty() {
            return fail("layers is empty".to_string());
        }
        if let Some(idx) = self.layers.iter().position(|&n| n == 0) {
            return fail(format!("layer {} has 0 neurons", idx));
        }
        for pattern in [&self.bias_pattern, &self.weight_pattern] {
            if !pattern.contains(LAYER_PLACEHOLDER) {
                return fail(format!("pattern '{}' lacks '{}'", pattern, LAYER_PLACEHOLDER));
            }
        }
        Ok(())
    }

    /// Ruta del array de biases de la capa `layer_idx` (base 0)
    pub fn bias_path(&self, dir: &Path, layer_idx: usize) -> PathBuf {
        dir.join(resolve_pattern(&self.bias_pattern, layer_idx))
    }

    pub fn weight_path(&self, dir: &Path, layer_idx: usize) -> PathBuf {
        dir.join(resolve_pattern(&self.weight_pattern, layer_idx))
    }
}

/// Los archivos se numeran desde 1
fn resolve_pattern(pattern: &str, layer_idx: usize) -> String {
    pattern.replace(LAYER_PLACEHOLDER, &(layer_idx + 1).to_string())
}
