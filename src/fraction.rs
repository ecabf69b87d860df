// src/fraction.rs
// ============================================================================
// FRACTION - Conversión de reales en [-1, 1) a punto fijo con signo
// ============================================================================
//
// Solo diagnóstico: sirve para comprobar que FRAC_BITS representa las
// escalas conocidas con error aceptable. Nunca alimenta las ROMs.
//
// ============================================================================

use serde::Serialize;

use crate::error::{Result, RomError};

/// Máximo de bits fraccionarios (scale - 1 debe caber en i64)
pub const MAX_FRAC_BITS: u32 = 62;

/// Resultado de convertir un valor a punto fijo
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FixedPointRecord {
    pub original: f64,
    /// Entero cuantizado (valor * 2^frac_bits, redondeado y saturado)
    pub raw: i64,
    pub fixed_point: f64,
    pub abs_error: f64,
    pub rel_error: f64,
}

/// Convierte todos los valores o ninguno: un valor fuera de [-1, 1)
/// aborta el lote completo.
pub fn to_signed_fixed(values: &[f64], frac_bits: u32) -> Result<Vec<FixedPointRecord>> {
    if frac_bits > MAX_FRAC_BITS {
        return Err(RomError::InvalidArgument(format!(
            "frac_bits {} exceeds {}",
            frac_bits, MAX_FRAC_BITS
        )));
    }

    // Validar todo antes de convertir nada
    if let Some(&value) = values.iter().find(|v| !(-1.0..1.0).contains(*v)) {
        return Err(RomError::OutOfRange { value });
    }

    let scale_int = 1i64 << frac_bits;
    let scale = scale_int as f64;

    Ok(values
        .iter()
        .map(|&v| {
            let raw = ((v * scale).round_ties_even() as i64).clamp(-scale_int, scale_int - 1);
            let fixed_point = raw as f64 / scale;
            let abs_error = (v - fixed_point).abs();
            let rel_error = if v != 0.0 { abs_error / v.abs() } else { 0.0 };
            FixedPointRecord {
                original: v,
                raw,
                fixed_point,
                abs_error,
                rel_error,
            }
        })
        .collect())
}
