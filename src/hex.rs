// src/hex.rs
// ============================================================================
// HEX - Codificación complemento a dos de ancho fijo
// ============================================================================
//
// Cada palabra de ROM es una línea de ceil(width/4) dígitos hex, mayúsculas,
// sin prefijo. Los valores fuera de rango se truncan módulo 2^width, igual
// que un registro hardware.
//
// ============================================================================

use crate::error::{Result, RomError};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Número de dígitos hex para un ancho de bits (redondeo a nibble completo)
#[inline]
pub fn hex_chars(width_bits: u32) -> usize {
    (width_bits as usize + 3) / 4
}

/// Codifica `value` en complemento a dos con `width_bits` bits.
///
/// `encode(-1, 8) == "FF"`, `encode(255, 8) == "FF"`, `encode(0, 32) == "00000000"`.
/// Anchos mayores de 64 bits extienden el signo.
pub fn encode(value: i64, width_bits: u32) -> Result<String> {
    if width_bits == 0 {
        return Err(RomError::InvalidArgument(
            "Bit width must be positive".to_string(),
        ));
    }

    let chars = hex_chars(width_bits);
    let mut out = vec![b'0'; chars];

    for (i, slot) in out.iter_mut().rev().enumerate() {
        // Desplazamiento aritmético: más allá de 63 bits solo queda el signo
        let shift = (i * 4).min(63) as u32;
        let mut nibble = ((value >> shift) & 0xF) as usize;
        if i * 4 >= 64 {
            nibble = if value < 0 { 0xF } else { 0x0 };
        }
        // Nibble superior parcial
        let bits_left = width_bits as usize - i * 4;
        if bits_left < 4 {
            nibble &= (1 << bits_left) - 1;
        }
        *slot = HEX_DIGITS[nibble];
    }

    Ok(out.iter().map(|&b| b as char).collect())
}

/// true si `value` cabe en `width_bits` sin truncar (con o sin signo)
pub fn fits_width(value: i64, width_bits: u32) -> bool {
    match width_bits {
        0 => return false,
        64.. => return true,
        _ => {}
    }
    let min = -(1i128 << (width_bits - 1));
    let max = (1i128 << width_bits) - 1;
    (min..=max).contains(&(value as i128))
}

/// Inversa de `encode` para valores en rango: interpreta el token como
/// complemento a dos de `width_bits` bits (máx. 64).
pub fn decode(token: &str, width_bits: u32) -> Result<i64> {
    if width_bits == 0 || width_bits > 64 {
        return Err(RomError::InvalidArgument(format!(
            "Bit width must be in 1..=64, got {}",
            width_bits
        )));
    }
    let raw = u64::from_str_radix(token.trim(), 16)
        .map_err(|e| RomError::InvalidArgument(format!("Bad hex token '{}': {}", token, e)))?;

    if width_bits == 64 {
        return Ok(raw as i64);
    }
    let mask = (1u64 << width_bits) - 1;
    let raw = raw & mask;
    let sign = 1u64 << (width_bits - 1);
    if raw & sign != 0 {
        Ok((raw | !mask) as i64)
    } else {
        Ok(raw as i64)
    }
}
