// src/builder.rs
// ============================================================================
// BUILDER - Orquestador de generación de ROMs
// ============================================================================
//
// 1. Carga TODOS los arrays (biases y pesos de cada capa) y valida formas.
// 2. Recién entonces abre las ROMs: bias_rom_hex.txt y weight_rom_hex.txt.
// 3. Capas en orden 0..N-1, cada una con su layout puro.
//
// Un fallo de carga no deja ningún archivo de salida; un fallo a mitad de
// escritura borra el parcial (ver RomWriter).
//
// ============================================================================

use std::path::Path;

use serde::Serialize;

use crate::config::RomConfig;
use crate::error::{Result, RomError};
use crate::hex;
use crate::layout::{bias_layout, weight_layout};
use crate::npy;
use crate::rom::{RomSummary, RomWriter};
use crate::tensor::Tensor;

/// Arrays de una capa, ya cargados
#[derive(Debug, Clone)]
pub struct LayerTensors {
    pub index: usize,
    /// Neuronas según configuración
    pub size: usize,
    pub bias: Tensor,
    pub weight: Tensor,
}

/// Posición de una capa dentro de las ROMs (direcciones en palabras)
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayerStats {
    pub index: usize,
    /// Neuronas configuradas (layout de biases)
    pub neurons: usize,
    /// Filas reales de la matriz de pesos (layout de pesos)
    pub weight_rows: usize,
    pub inputs: usize,
    pub bias_base: usize,
    pub bias_words: usize,
    pub bias_padding: usize,
    pub weight_base: usize,
    pub weight_words: usize,
    pub weight_padding: usize,
    /// Valores que no caben en su ancho y se truncan
    pub truncated: usize,
}

/// Estadísticas de generación
#[derive(Debug, Default)]
pub struct BuildStats {
    pub layers: Vec<LayerStats>,
    pub bias_rom: Option<RomSummary>,
    pub weight_rom: Option<RomSummary>,
}

impl BuildStats {
    pub fn padding_words(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.bias_padding + l.weight_padding)
            .sum()
    }

    pub fn truncated(&self) -> usize {
        self.layers.iter().map(|l| l.truncated).sum()
    }
}

/// Carga los arrays de todas las capas antes de escribir nada
pub fn load_layers(config: &RomConfig, input_dir: &Path) -> Result<Vec<LayerTensors>> {
    let mut layers = Vec::with_capacity(config.layers.len());

    for (index, &size) in config.layers.iter().enumerate() {
        let bias_path = config.bias_path(input_dir, index);
        let weight_path = config.weight_path(input_dir, index);
        log::debug!(
            "Layer {}: loading {} and {}",
            index + 1,
            bias_path.display(),
            weight_path.display()
        );

        let bias = npy::load(&bias_path)?;
        let weight = npy::load(&weight_path)?;

        if bias.ndim() != 1 {
            return Err(RomError::Shape(format!(
                "{}: bias must be 1-D, got shape {:?}",
                bias_path.display(),
                bias.shape()
            )));
        }
        if bias.numel() < size {
            return Err(RomError::Shape(format!(
                "{}: layer {} has {} neurons but only {} biases",
                bias_path.display(),
                index + 1,
                size,
                bias.numel()
            )));
        }
        if bias.numel() > size {
            log::warn!(
                "{}: {} biases for {} neurons, extra values ignored",
                bias_path.display(),
                bias.numel(),
                size
            );
        }
        if weight.ndim() != 2 {
            return Err(RomError::Shape(format!(
                "{}: weight must be 2-D (neurons x inputs), got shape {:?}",
                weight_path.display(),
                weight.shape()
            )));
        }
        if weight.rows() != size {
            log::warn!(
                "{}: {} weight rows but layer {} is configured with {} neurons",
                weight_path.display(),
                weight.rows(),
                index + 1,
                size
            );
        }

        layers.push(LayerTensors {
            index,
            size,
            bias,
            weight,
        });
    }

    Ok(layers)
}

fn count_truncated(words: &[i64], width_bits: u32) -> usize {
    words.iter().filter(|&&v| !hex::fits_width(v, width_bits)).count()
}

/// Escribe la ROM de biases. Rellena `stats` (una entrada por capa).
pub fn write_bias_rom(
    config: &RomConfig,
    layers: &[LayerTensors],
    path: &Path,
    stats: &mut Vec<LayerStats>,
) -> Result<RomSummary> {
    let mut writer = RomWriter::create(path, config.b_width)?;

    for layer in layers {
        let words = bias_layout(layer.bias.data(), layer.size, config.mac_cnt)?;
        let entry = stats_entry(stats, layer);
        entry.bias_base = writer.words();
        entry.bias_words = words.len();
        entry.bias_padding = words.len() - layer.size;
        entry.truncated += count_truncated(&words, config.b_width);

        writer.write_words(&words)?;
        log::debug!(
            "Layer {}: {} bias words ({} padding)",
            layer.index + 1,
            words.len(),
            entry.bias_padding
        );
    }

    writer.finish()
}

/// Escribe la ROM de pesos, intercalada por lane group y columna
pub fn write_weight_rom(
    config: &RomConfig,
    layers: &[LayerTensors],
    path: &Path,
    stats: &mut Vec<LayerStats>,
) -> Result<RomSummary> {
    let mut writer = RomWriter::create(path, config.w_width)?;

    for layer in layers {
        let words = weight_layout(&layer.weight, config.mac_cnt)?;
        let rows = layer.weight.rows();
        let cols = layer.weight.cols();

        let entry = stats_entry(stats, layer);
        entry.weight_rows = rows;
        entry.inputs = cols;
        entry.weight_base = writer.words();
        entry.weight_words = words.len();
        entry.weight_padding = words.len() - layer.weight.numel();
        entry.truncated += count_truncated(&words, config.w_width);

        writer.write_words(&words)?;
        log::debug!(
            "Layer {}: {} weight words ({} x {}, {} padding)",
            layer.index + 1,
            words.len(),
            rows,
            cols,
            entry.weight_padding
        );
    }

    writer.finish()
}

fn stats_entry<'a>(stats: &'a mut Vec<LayerStats>, layer: &LayerTensors) -> &'a mut LayerStats {
    if let Some(pos) = stats.iter().position(|s| s.index == layer.index) {
        return &mut stats[pos];
    }
    stats.push(LayerStats {
        index: layer.index,
        neurons: layer.size,
        ..Default::default()
    });
    let last = stats.len() - 1;
    &mut stats[last]
}

/// Genera ambas ROMs en `out_dir`
pub fn build_roms(config: &RomConfig, input_dir: &Path, out_dir: &Path) -> Result<BuildStats> {
    config.validate()?;
    let layers = load_layers(config, input_dir)?;
    write_roms(config, &layers, out_dir)
}

/// Escribe ambas ROMs a partir de capas ya cargadas
pub fn write_roms(config: &RomConfig, layers: &[LayerTensors], out_dir: &Path) -> Result<BuildStats> {
    let mut stats = BuildStats::default();
    let bias_rom = write_bias_rom(config, layers, &out_dir.join(&config.bias_rom), &mut stats.layers)?;
    let weight_rom = write_weight_rom(config, layers, &out_dir.join(&config.weight_rom), &mut stats.layers)?;
    stats.bias_rom = Some(bias_rom);
    stats.weight_rom = Some(weight_rom);

    if stats.truncated() > 0 {
        log::warn!(
            "{} values exceed their bit width and were truncated",
            stats.truncated()
        );
    }
    Ok(stats)
}

/// Manifest JSON con la geometría de las ROMs
pub fn manifest(config: &RomConfig, stats: &BuildStats) -> serde_json::Value {
    let rom = |summary: &Option<RomSummary>| {
        summary.as_ref().map(|s| {
            serde_json::json!({
                "path": s.path.display().to_string(),
                "width_bits": s.width_bits,
                "hex_chars": hex::hex_chars(s.width_bits),
                "words": s.words,
                "xxh3_64": format!("{:016x}", s.checksum),
            })
        })
    };

    serde_json::json!({
        "generator": concat!("rom-maker ", env!("CARGO_PKG_VERSION")),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "config": config,
        "bias_rom": rom(&stats.bias_rom),
        "weight_rom": rom(&stats.weight_rom),
        "layers": stats.layers,
        "padding_words": stats.padding_words(),
        "truncated_values": stats.truncated(),
    })
}

pub fn write_manifest(path: &Path, config: &RomConfig, stats: &BuildStats) -> Result<()> {
    let json = serde_json::to_vec_pretty(&manifest(config, stats))?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(index: usize, bias: Vec<i64>, rows: &[Vec<i64>]) -> LayerTensors {
        LayerTensors {
            index,
            size: bias.len(),
            bias: Tensor::vector(bias),
            weight: Tensor::from_rows(rows).unwrap(),
        }
    }

    #[test]
    fn test_bias_rom_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bias.txt");
        let config = RomConfig {
            b_width: 8,
            ..Default::default()
        };
        let layers = vec![layer(0, vec![1, 2, 3, 4, 5], &vec![vec![0]; 5])];

        let mut stats = Vec::new();
        let summary = write_bias_rom(&config, &layers, &path, &mut stats).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "01\n02\n03\n04\n05\n00\n00\n00\n");
        assert_eq!(summary.words, 8);
        assert_eq!(stats[0].bias_padding, 3);
    }

    #[test]
    fn test_layer_base_addresses() {
        let dir = tempfile::tempdir().unwrap();
        let config = RomConfig::default();
        let layers = vec![
            layer(0, vec![1; 6], &vec![vec![1, 2, 3]; 6]),
            layer(1, vec![-1; 2], &vec![vec![4; 6]; 2]),
        ];

        let mut stats = Vec::new();
        write_bias_rom(&config, &layers, &dir.path().join("b.txt"), &mut stats).unwrap();
        let w = write_weight_rom(&config, &layers, &dir.path().join("w.txt"), &mut stats).unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].bias_base, 0);
        assert_eq!(stats[1].bias_base, 8);
        assert_eq!(stats[0].weight_words, 3 * 8);
        assert_eq!(stats[0].weight_padding, 3 * 2);
        assert_eq!(stats[1].weight_base, 24);
        assert_eq!(stats[1].weight_words, 6 * 4);
        assert_eq!(w.words, 48);
    }

    #[test]
    fn test_truncation_counted() {
        let dir = tempfile::tempdir().unwrap();
        let config = RomConfig::default();
        let layers = vec![layer(0, vec![0; 4], &vec![vec![300, -1]; 4])];
        let mut stats = Vec::new();
        write_weight_rom(&config, &layers, &dir.path().join("w.txt"), &mut stats).unwrap();
        assert_eq!(stats[0].truncated, 4);
    }

    #[test]
    fn test_manifest_fields() {
        let stats = BuildStats {
            layers: vec![LayerStats {
                index: 0,
                neurons: 10,
                bias_words: 12,
                bias_padding: 2,
                ..Default::default()
            }],
            ..Default::default()
        };
        let m = manifest(&RomConfig::default(), &stats);
        assert_eq!(m["padding_words"], 2);
        assert_eq!(m["config"]["mac_cnt"], 4);
        assert_eq!(m["layers"][0]["bias_words"], 12);
        assert!(m["bias_rom"].is_null());
    }

    #[test]
    fn test_weight_rows_differ_from_layer_size() {
        let dir = tempfile::tempdir().unwrap();
        let config = RomConfig::default();
        // Capa configurada con 4 neuronas, matriz de 6 filas x 2 entradas
        let layers = vec![LayerTensors {
            index: 0,
            size: 4,
            bias: Tensor::vector(vec![1; 4]),
            weight: Tensor::from_rows(&vec![vec![1, 2]; 6]).unwrap(),
        }];

        let mut stats = Vec::new();
        write_bias_rom(&config, &layers, &dir.path().join("b.txt"), &mut stats).unwrap();
        write_weight_rom(&config, &layers, &dir.path().join("w.txt"), &mut stats).unwrap();

        assert_eq!(stats[0].neurons, 4);
        assert_eq!(stats[0].weight_rows, 6);
        assert_eq!(stats[0].weight_words, 2 * 8);
        assert_eq!(stats[0].weight_padding, 2 * 2);

        let m = manifest(&config, &BuildStats { layers: stats, ..Default::default() });
        assert_eq!(m["layers"][0]["weight_rows"], 6);
        assert_eq!(m["layers"][0]["neurons"], 4);
    }

    #[test]
    fn test_json_error_variant() {
        let err: RomError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, RomError::Json(_)));

        let dir = tempfile::tempdir().unwrap();
        let stats = BuildStats::default();
        let path = dir.path().join("rom_manifest.json");
        write_manifest(&path, &RomConfig::default(), &stats).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["truncated_values"], 0);
    }
}
