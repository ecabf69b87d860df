// src/diagnostics.rs
// ============================================================================
// DIAGNOSTICS - Tabla alineada del chequeo de escalas
// ============================================================================
//
// Independiente de la generación de ROMs: solo informa por consola.
//
//   Original      | Fixed-Point   | Abs Error     | Rel Error
//   --------------+---------------+---------------+--------------
//    0.0078125000 |  0.0078125000 |  0.0000000000 |  0.0000000000
//
// ============================================================================

use crate::error::Result;
use crate::fraction::{to_signed_fixed, FixedPointRecord};

/// Celda de tabla
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Float(f64),
}

impl Cell {
    /// Floats con 10 decimales y espacio en lugar de signo si no es negativo
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Float(v) if v.is_sign_negative() => format!("{:.10}", v),
            Self::Float(v) => format!(" {:.10}", v),
        }
    }
}

/// Renderiza una tabla con columnas justificadas a la izquierda
pub fn render_table(headers: &[&str], rows: &[Vec<Cell>]) -> String {
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.iter().map(Cell::render).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rendered
                .iter()
                .filter_map(|r| r.get(i).map(|c| c.len()))
                .fold(h.len(), usize::max)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join_row(headers.iter().copied(), &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for r in &rendered {
        lines.push(join_row(r.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

fn join_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .enumerate()
        .map(|(i, c)| format!("{:<width$}", c, width = widths.get(i).copied().unwrap_or(0)))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Tabla de registros de punto fijo
pub fn fixed_point_table(records: &[FixedPointRecord]) -> String {
    let rows: Vec<Vec<Cell>> = records
        .iter()
        .map(|r| {
            vec![
                Cell::Float(r.original),
                Cell::Float(r.fixed_point),
                Cell::Float(r.abs_error),
                Cell::Float(r.rel_error),
            ]
        })
        .collect();
    render_table(&["Original", "Fixed-Point", "Abs Error", "Rel Error"], &rows)
}

/// Chequeo completo de escalas: título + tabla.
///
/// El título cuenta el bit de signo (FRAC_BITS + 1).
pub fn scale_report(scales: &[f64], frac_bits: u32) -> Result<String> {
    let records = to_signed_fixed(scales, frac_bits)?;
    Ok(format!(
        "Scales fixed point conversion at {} bits\n{}",
        frac_bits + 1,
        fixed_point_table(&records)
    ))
}
