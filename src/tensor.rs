// src/tensor.rs
// ============================================================================
// TENSOR - Array denso de enteros ya cuantizados
// ============================================================================

use crate::error::{Result, RomError};

/// Producto de dimensiones; None si desborda usize
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Array denso row-major. 1-D para biases, 2-D (neuronas × entradas) para pesos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<i64>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<i64>) -> Result<Self> {
        let numel = checked_numel(&shape)
            .ok_or_else(|| RomError::Shape(format!("shape {:?} overflows", shape)))?;
        if numel != data.len() {
            return Err(RomError::Shape(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                numel,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Vector 1-D
    pub fn vector(data: Vec<i64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Matriz 2-D desde filas (todas de la misma longitud)
    pub fn from_rows(rows: &[Vec<i64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(RomError::Shape(format!(
                "row {} has {} columns, expected {}",
                bad,
                rows[bad].len(),
                cols
            )));
        }
        let data = rows.iter().flatten().copied().collect();
        Self::new(vec![rows.len(), cols], data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[i64] {
        &self.data
    }

    /// Filas de una matriz (neuronas)
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Columnas de una matriz (conexiones de entrada)
    pub fn cols(&self) -> usize {
        match self.shape.len() {
            0 | 1 => 1,
            // Cabe: está acotado por numel salvo que haya una dimensión 0
            _ => checked_numel(&self.shape[1..]).unwrap_or(0),
        }
    }

    /// Elemento (fila, columna) de una matriz 2-D
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> i64 {
        self.data[row * self.cols() + col]
    }

    /// Primeras `n` filas, para mostrar por consola
    pub fn head_rows(&self, n: usize) -> Vec<&[i64]> {
        let cols = self.cols();
        if cols == 0 {
            return Vec::new();
        }
        self.data.chunks(cols).take(n).collect()
    }
}
