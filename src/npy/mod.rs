// src/npy/mod.rs
// ============================================================================
// NPY READER - Lee arrays NumPy (.npy) exportados por el cuantizador
// ============================================================================
//
// Formato:
//   \x93NUMPY | major | minor | header_len (u16 LE v1, u32 LE v2/v3)
//   header: dict Python {'descr': '<i4', 'fortran_order': False, 'shape': (128, 256), }
//   datos crudos a continuación
//
// Los arrays ya están cuantizados: todo se lee como i64. Los dtypes float
// se aceptan solo si todos los valores son enteros.
//
// ============================================================================

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use memmap2::Mmap;
use regex::Regex;

use crate::error::{Result, RomError};
use crate::tensor::{checked_numel, Tensor};

pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

static DESCR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]descr['"]\s*:\s*['"]([^'"]*)['"]"#).expect("valid regex"));
static FORTRAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]fortran_order['"]\s*:\s*(True|False)"#).expect("valid regex"));
static SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]shape['"]\s*:\s*\(([^)]*)\)"#).expect("valid regex"));

/// Tipo escalar del array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
}

impl DType {
    /// Código numpy sin el prefijo de endianness ("i4", "f2"...)
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "b1" => Some(Self::Bool),
            "i1" => Some(Self::I8),
            "i2" => Some(Self::I16),
            "i4" => Some(Self::I32),
            "i8" => Some(Self::I64),
            "u1" => Some(Self::U8),
            "u2" => Some(Self::U16),
            "u4" => Some(Self::U32),
            "u8" => Some(Self::U64),
            "f2" => Some(Self::F16),
            "f4" => Some(Self::F32),
            "f8" => Some(Self::F64),
            _ => None,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 | Self::F16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32 | Self::F64)
    }
}

/// Header parseado
#[derive(Debug, Clone, PartialEq)]
pub struct NpyHeader {
    pub dtype: DType,
    pub big_endian: bool,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Número de elementos; None si el producto desborda usize
    pub fn numel(&self) -> Option<usize> {
        checked_numel(&self.shape)
    }

    /// Bytes de datos; None si desborda usize
    pub fn data_len(&self) -> Option<usize> {
        self.numel()?.checked_mul(self.dtype.size())
    }
}

/// Parsea el preámbulo y el dict. Devuelve el header y el offset de los datos.
pub fn parse_header(bytes: &[u8]) -> std::result::Result<(NpyHeader, usize), String> {
    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err("not a .npy file (bad magic)".to_string());
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (LittleEndian::read_u16(&bytes[8..10]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err("truncated preamble".to_string());
            }
            (LittleEndian::read_u32(&bytes[8..12]) as usize, 12)
        }
        v => return Err(format!("unsupported format version {}", v)),
    };

    let data_offset = header_start + header_len;
    if bytes.len() < data_offset {
        return Err("truncated header".to_string());
    }
    let dict = std::str::from_utf8(&bytes[header_start..data_offset])
        .map_err(|_| "header is not valid UTF-8".to_string())?;

    let descr = DESCR_RE
        .captures(dict)
        .map(|c| c[1].to_string())
        .ok_or_else(|| "missing 'descr'".to_string())?;

    let (big_endian, code) = match descr.chars().next() {
        Some('>') => (true, &descr[1..]),
        Some('<') | Some('|') | Some('=') => (false, &descr[1..]),
        _ => (false, descr.as_str()),
    };
    let dtype = DType::from_code(code).ok_or_else(|| format!("unsupported dtype '{}'", descr))?;

    let fortran_order = FORTRAN_RE
        .captures(dict)
        .map(|c| &c[1] == "True")
        .ok_or_else(|| "missing 'fortran_order'".to_string())?;

    let shape_str = SHAPE_RE
        .captures(dict)
        .map(|c| c[1].to_string())
        .ok_or_else(|| "missing 'shape'".to_string())?;

    let shape = shape_str
        .split(',')
        .map(|s| s.trim().trim_end_matches('L'))
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|e| format!("bad shape '{}': {}", s, e)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((
        NpyHeader {
            dtype,
            big_endian,
            fortran_order,
            shape,
        },
        data_offset,
    ))
}

/// Archivo .npy abierto (memory-mapped)
pub struct NpyFile {
    pub path: PathBuf,
    pub header: NpyHeader,
    data_offset: usize,
    mmap: Mmap,
}

impl NpyFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let npy_err = |reason: String| RomError::Npy {
            path: path.clone(),
            reason,
        };

        let file = File::open(&path).map_err(|e| npy_err(format!("cannot open: {}", e)))?;
        let len = file.metadata()?.len();
        if len < 10 {
            return Err(npy_err(format!("file too small ({} bytes)", len)));
        }

        let mmap = unsafe { Mmap::map(&file)? };
        let (header, data_offset) = parse_header(&mmap).map_err(npy_err)?;

        let needed = header
            .data_len()
            .ok_or_else(|| npy_err(format!("shape {:?} overflows", header.shape)))?;
        let available = mmap.len() - data_offset;
        if available < needed {
            return Err(npy_err(format!(
                "truncated data: need {} bytes, have {}",
                needed, available
            )));
        }

        Ok(Self {
            path,
            header,
            data_offset,
            mmap,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.header.shape
    }

    /// Bytes de datos crudos
    pub fn raw(&self) -> &[u8] {
        // Validado en open()
        let needed = self.header.data_len().unwrap_or(0);
        &self.mmap[self.data_offset..self.data_offset + needed]
    }

    /// Decodifica a un Tensor row-major de i64
    pub fn to_tensor(&self) -> Result<Tensor> {
        let values = if self.header.big_endian {
            decode_values::<BigEndian>(self.raw(), self.header.dtype)
        } else {
            decode_values::<LittleEndian>(self.raw(), self.header.dtype)
        };

        let mut data = Vec::with_capacity(values.len());
        for (idx, v) in values.into_iter().enumerate() {
            match v {
                Scalar::Int(i) => data.push(i),
                Scalar::Float(f) => data.push(float_to_int(f).ok_or_else(|| {
                    RomError::Shape(format!(
                        "{}: element {} = {} is not an integer",
                        self.path.display(),
                        idx,
                        f
                    ))
                })?),
                Scalar::Overflow(u) => {
                    return Err(RomError::Shape(format!(
                        "{}: element {} = {} overflows i64",
                        self.path.display(),
                        idx,
                        u
                    )))
                }
            }
        }

        if self.header.fortran_order && self.header.shape.len() > 1 {
            data = fortran_to_c(&data, &self.header.shape);
        }

        Tensor::new(self.header.shape.clone(), data)
    }
}

/// Atajo: abre y decodifica
pub fn load(path: impl AsRef<Path>) -> Result<Tensor> {
    NpyFile::open(path)?.to_tensor()
}

enum Scalar {
    Int(i64),
    Float(f64),
    Overflow(u64),
}

fn decode_values<B: ByteOrder>(raw: &[u8], dtype: DType) -> Vec<Scalar> {
    let size = dtype.size();
    raw.chunks_exact(size)
        .map(|b| match dtype {
            DType::Bool => Scalar::Int((b[0] != 0) as i64),
            DType::I8 => Scalar::Int(b[0] as i8 as i64),
            DType::U8 => Scalar::Int(b[0] as i64),
            DType::I16 => Scalar::Int(B::read_i16(b) as i64),
            DType::U16 => Scalar::Int(B::read_u16(b) as i64),
            DType::I32 => Scalar::Int(B::read_i32(b) as i64),
            DType::U32 => Scalar::Int(B::read_u32(b) as i64),
            DType::I64 => Scalar::Int(B::read_i64(b)),
            DType::U64 => {
                let u = B::read_u64(b);
                i64::try_from(u).map_or(Scalar::Overflow(u), Scalar::Int)
            }
            DType::F16 => Scalar::Float(half::f16::from_bits(B::read_u16(b)).to_f64()),
            DType::F32 => Scalar::Float(B::read_f32(b) as f64),
            DType::F64 => Scalar::Float(B::read_f64(b)),
        })
        .collect()
}

fn float_to_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Reordena column-major a row-major
fn fortran_to_c(data: &[i64], shape: &[usize]) -> Vec<i64> {
    let ndim = shape.len();
    // strides column-major
    let mut f_strides = vec![1usize; ndim];
    for k in 1..ndim {
        f_strides[k] = f_strides[k - 1] * shape[k - 1];
    }

    let mut out = Vec::with_capacity(data.len());
    let mut index = vec![0usize; ndim];
    for _ in 0..data.len() {
        let offset: usize = index.iter().zip(&f_strides).map(|(i, s)| i * s).sum();
        out.push(data[offset]);
        // Incrementar índice en orden C (último eje más rápido)
        for k in (0..ndim).rev() {
            index[k] += 1;
            if index[k] < shape[k] {
                break;
            }
            index[k] = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn npy_bytes(descr: &str, fortran: bool, shape: &[usize], payload: &[u8]) -> Vec<u8> {
        let shape_str = match shape.len() {
            1 => format!("({},)", shape[0]),
            _ => format!(
                "({})",
                shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
            ),
        };
        let mut dict = format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
            descr,
            if fortran { "True" } else { "False" },
            shape_str
        );
        while (10 + dict.len() + 1) % 64 != 0 {
            dict.push(' ');
        }
        dict.push('\n');

        let mut out = NPY_MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        out.extend_from_slice(dict.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn write_tmp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn test_parse_header() {
        let bytes = npy_bytes("<i4", false, &[128, 256], &[]);
        let (header, offset) = parse_header(&bytes).unwrap();
        assert_eq!(header.dtype, DType::I32);
        assert!(!header.big_endian);
        assert!(!header.fortran_order);
        assert_eq!(header.shape, vec![128, 256]);
        assert_eq!(offset % 64, 0);
    }

    #[test]
    fn test_dtype_codes() {
        assert_eq!(DType::from_code("i1"), Some(DType::I8));
        assert_eq!(DType::from_code("f2"), Some(DType::F16));
        assert_eq!(DType::from_code("u8"), Some(DType::U64));
        assert_eq!(DType::from_code("<i4"), None);
        assert_eq!(DType::from_code("c8"), None);

        // Los regex del header se comparten entre llamadas
        for (descr, dtype) in [("<i2", DType::I16), (">u4", DType::U32), ("|b1", DType::Bool)] {
            let (header, _) = parse_header(&npy_bytes(descr, false, &[3], &[])).unwrap();
            assert_eq!(header.dtype, dtype);
            assert_eq!(header.big_endian, descr.starts_with('>'));
        }
    }

    #[test]
    fn test_bad_magic() {
        assert!(parse_header(b"NOTNUMPY\x01\x00").is_err());
    }

    #[test]
    fn test_load_i8_matrix() {
        let payload: Vec<u8> = [-1i8, 2, -3, 4, 5, -6].iter().map(|&v| v as u8).collect();
        let f = write_tmp(&npy_bytes("|i1", false, &[2, 3], &payload));
        let t = load(f.path()).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.data(), &[-1, 2, -3, 4, 5, -6]);
    }

    #[test]
    fn test_load_i32_vector_big_endian() {
        let payload: Vec<u8> = [7i32, -70000].iter().flat_map(|v| v.to_be_bytes()).collect();
        let f = write_tmp(&npy_bytes(">i4", false, &[2], &payload));
        let t = load(f.path()).unwrap();
        assert_eq!(t.data(), &[7, -70000]);
    }

    #[test]
    fn test_fortran_order() {
        // Matriz [[1,2,3],[4,5,6]] guardada column-major
        let payload: Vec<u8> = [1i64, 4, 2, 5, 3, 6].iter().flat_map(|v| v.to_le_bytes()).collect();
        let f = write_tmp(&npy_bytes("<i8", true, &[2, 3], &payload));
        let t = load(f.path()).unwrap();
        assert_eq!(t.data(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_float_must_be_integral() {
        let ok: Vec<u8> = [3.0f32, -2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let f = write_tmp(&npy_bytes("<f4", false, &[2], &ok));
        assert_eq!(load(f.path()).unwrap().data(), &[3, -2]);

        let bad: Vec<u8> = [3.5f64].iter().flat_map(|v| v.to_le_bytes()).collect();
        let f = write_tmp(&npy_bytes("<f8", false, &[1], &bad));
        assert!(matches!(load(f.path()), Err(RomError::Shape(_))));
    }

    #[test]
    fn test_truncated_data() {
        let f = write_tmp(&npy_bytes("<i4", false, &[4], &[0u8; 8]));
        assert!(matches!(NpyFile::open(f.path()), Err(RomError::Npy { .. })));
    }

    #[test]
    fn test_shape_overflow() {
        // 2^32 x 2^32 sin datos: el producto no cabe en usize
        let f = write_tmp(&npy_bytes("|i1", false, &[1 << 32, 1 << 32], &[]));
        let err = NpyFile::open(f.path()).err().unwrap();
        match err {
            RomError::Npy { reason, .. } => assert!(reason.contains("overflows")),
            other => panic!("unexpected error: {:?}", other),
        }

        // numel cabe pero los bytes (i8 x 2^61 elementos) no
        let (header, _) = parse_header(&npy_bytes("<i8", false, &[1 << 61], &[])).unwrap();
        assert_eq!(header.numel(), Some(1 << 61));
        assert_eq!(header.data_len(), None);
    }

    #[test]
    fn test_missing_file() {
        let err = NpyFile::open("/nonexistent/layer1_bias.npy").err().unwrap();
        assert!(matches!(err, RomError::Npy { .. }));
    }

    #[test]
    fn test_unsupported_dtype() {
        let f = write_tmp(&npy_bytes("<c8", false, &[1], &[0u8; 8]));
        assert!(NpyFile::open(f.path()).is_err());
    }
}
