// src/rom/validate.rs
// ============================================================================
// ROM VALIDATOR - Comprueba un archivo hex ya generado
// ============================================================================

use crate::error::{Result, RomError};
use crate::hex;

/// Resultado de validación: acumula errores en vez de parar en el primero
#[derive(Debug, Default)]
pub struct RomReport {
    pub valid: bool,
    pub lines: usize,
    pub width_bits: u32,
    pub hex_chars: usize,
    pub mac_cnt: usize,
    pub groups: usize,
    pub zero_words: usize,
    pub errors: Vec<String>,
}

/// Valida el texto de una ROM: cada línea con exactamente ceil(width/4)
/// dígitos hex en mayúsculas, y un número de líneas múltiplo de `mac_cnt`.
pub fn validate_rom(text: &str, width_bits: u32, mac_cnt: usize) -> Result<RomReport> {
    if width_bits == 0 || mac_cnt == 0 {
        return Err(RomError::InvalidArgument(format!(
            "width_bits ({}) and mac_cnt ({}) must be > 0",
            width_bits, mac_cnt
        )));
    }

    let chars = hex::hex_chars(width_bits);
    let mut report = RomReport {
        valid: true,
        width_bits,
        hex_chars: chars,
        mac_cnt,
        ..Default::default()
    };

    for (idx, line) in text.lines().enumerate() {
        report.lines += 1;
        let line_no = idx + 1;

        if line.len() != chars {
            report.errors.push(format!(
                "line {}: expected {} hex digits, got {} ('{}')",
                line_no,
                chars,
                line.len(),
                line
            ));
            continue;
        }
        if !line.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
            report.errors.push(format!("line {}: not uppercase hex ('{}')", line_no, line));
            continue;
        }
        if line.bytes().all(|b| b == b'0') {
            report.zero_words += 1;
        }
    }

    if report.lines % mac_cnt != 0 {
        report.errors.push(format!(
            "{} lines is not a multiple of mac_cnt {} (incomplete lane group)",
            report.lines, mac_cnt
        ));
    }
    report.groups = report.lines / mac_cnt;
    report.valid = report.errors.is_empty();
    Ok(report)
}

/// Primeros `count` lane groups decodificados con signo
pub fn lane_groups(text: &str, width_bits: u32, mac_cnt: usize, count: usize) -> Result<Vec<Vec<i64>>> {
    if mac_cnt == 0 {
        return Err(RomError::InvalidArgument("mac_cnt must be > 0".to_string()));
    }
    let values = text
        .lines()
        .take(count * mac_cnt)
        .map(|l| hex::decode(l, width_bits))
        .collect::<Result<Vec<_>>>()?;
    Ok(values.chunks(mac_cnt).map(|c| c.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_rom() {
        let report = validate_rom("01\n02\n03\n04\n05\n00\n00\n00\n", 8, 4).unwrap();
        assert!(report.valid);
        assert_eq!(report.lines, 8);
        assert_eq!(report.groups, 2);
        assert_eq!(report.zero_words, 3);
    }

    #[test]
    fn test_bad_lines() {
        let report = validate_rom("01\nff\n003\n04\n", 8, 4).unwrap();
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("line 2"));
        assert!(report.errors[1].contains("line 3"));
    }

    #[test]
    fn test_incomplete_group() {
        let report = validate_rom("00000001\n00000002\n", 32, 4).unwrap();
        assert!(!report.valid);
        assert!(report.errors[0].contains("incomplete lane group"));
    }

    #[test]
    fn test_lane_groups() {
        let groups = lane_groups("01\nFF\n80\n7F\n05\n00\n00\n00\n", 8, 4, 5).unwrap();
        assert_eq!(groups, vec![vec![1, -1, -128, 127], vec![5, 0, 0, 0]]);
    }

    #[test]
    fn test_bad_args() {
        assert!(validate_rom("", 0, 4).is_err());
        assert!(validate_rom("", 8, 0).is_err());
    }
}
