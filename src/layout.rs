// src/layout.rs
// ============================================================================
// LAYOUT - Orden de memoria por lanes MAC
// ============================================================================
//
// Un lane group = MAC_CNT neuronas consecutivas que comparten ciclo.
//
// Bias:   grupo de MAC_CNT biases seguidos, último grupo relleno con 0.
//
// Pesos:  por grupo de neuronas, columna a columna:
//           n0[c0] n1[c0] n2[c0] n3[c0] | n0[c1] n1[c1] ... | n0[cK] ...
//         así los MAC_CNT lanes leen su peso de la misma entrada en el mismo
//         ciclo. El último grupo parcial rellena filas (neuronas), nunca
//         columnas.
//
// Funciones puras: sin cursores compartidos entre capas.
//
// ============================================================================

use crate::error::{Result, RomError};
use crate::tensor::Tensor;

/// `n` redondeado al siguiente múltiplo de `mac_cnt`
#[inline]
pub fn padded_len(n: usize, mac_cnt: usize) -> usize {
    n.div_ceil(mac_cnt) * mac_cnt
}

fn check_mac(mac_cnt: usize) -> Result<()> {
    if mac_cnt == 0 {
        return Err(RomError::InvalidArgument("mac_cnt must be > 0".to_string()));
    }
    Ok(())
}

/// Palabras de la ROM de biases para una capa de `layer_size` neuronas.
///
/// Devuelve exactamente `padded_len(layer_size, mac_cnt)` valores.
pub fn bias_layout(bias: &[i64], layer_size: usize, mac_cnt: usize) -> Result<Vec<i64>> {
    check_mac(mac_cnt)?;
    if bias.len() < layer_size {
        return Err(RomError::Shape(format!(
            "layer has {} neurons but only {} biases",
            layer_size,
            bias.len()
        )));
    }

    let mut words = Vec::with_capacity(padded_len(layer_size, mac_cnt));
    for group in bias[..layer_size].chunks(mac_cnt) {
        words.extend_from_slice(group);
        words.resize(words.len() + mac_cnt - group.len(), 0);
    }
    Ok(words)
}

/// Palabras de la ROM de pesos para una matriz (neuronas × entradas).
///
/// Devuelve exactamente `cols * padded_len(rows, mac_cnt)` valores.
pub fn weight_layout(weights: &Tensor, mac_cnt: usize) -> Result<Vec<i64>> {
    check_mac(mac_cnt)?;
    if weights.ndim() != 2 {
        return Err(RomError::Shape(format!(
            "weight tensor must be 2-D, got shape {:?}",
            weights.shape()
        )));
    }

    let rows = weights.rows();
    let cols = weights.cols();
    if cols == 0 {
        return Ok(Vec::new());
    }
    let mut words = Vec::with_capacity(cols * padded_len(rows, mac_cnt));

    for start in (0..rows).step_by(mac_cnt) {
        let lanes = mac_cnt.min(rows - start);
        for col in 0..cols {
            for lane in 0..lanes {
                words.push(weights.at(start + lane, col));
            }
            // Lanes vacíos del último grupo
            words.resize(words.len() + mac_cnt - lanes, 0);
        }
    }
    Ok(words)
}
