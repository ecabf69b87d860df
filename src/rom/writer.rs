// src/rom/writer.rs
// ============================================================================
// ROM WRITER - Escribe palabras hex, una por línea
// ============================================================================
//
// Escribe a "<nombre>.partial" y renombra solo en finish(). Si el writer se
// descarta sin terminar (error a mitad), el parcial se borra: nunca queda una
// ROM truncada con el nombre final.
//
// ============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use xxhash_rust::xxh3::Xxh3;

use crate::error::{Result, RomError};
use crate::hex;

/// Resumen de una ROM terminada
#[derive(Debug, Clone, Serialize)]
pub struct RomSummary {
    pub path: PathBuf,
    pub width_bits: u32,
    pub words: usize,
    /// XXH3-64 de los bytes del archivo
    pub checksum: u64,
}

pub struct RomWriter {
    file: BufWriter<File>,
    path: PathBuf,
    partial: PathBuf,
    width_bits: u32,
    words: usize,
    hasher: Xxh3,
    committed: bool,
}

impl RomWriter {
    pub fn create(path: impl AsRef<Path>, width_bits: u32) -> Result<Self> {
        if width_bits == 0 {
            return Err(RomError::InvalidArgument(
                "Bit width must be positive".to_string(),
            ));
        }
        let path = path.as_ref().to_path_buf();
        let partial = partial_path(&path);
        let file = BufWriter::new(File::create(&partial)?);

        Ok(Self {
            file,
            path,
            partial,
            width_bits,
            words: 0,
            hasher: Xxh3::new(),
            committed: false,
        })
    }

    /// Escribe una palabra codificada en complemento a dos
    pub fn write_word(&mut self, value: i64) -> Result<()> {
        let mut line = hex::encode(value, self.width_bits)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.hasher.update(line.as_bytes());
        self.words += 1;
        Ok(())
    }

    pub fn write_words(&mut self, values: &[i64]) -> Result<()> {
        for &v in values {
            self.write_word(v)?;
        }
        Ok(())
    }

    pub fn words(&self) -> usize {
        self.words
    }

    pub fn width_bits(&self) -> u32 {
        self.width_bits
    }

    /// Vacía el buffer y publica el archivo con su nombre final
    pub fn finish(mut self) -> Result<RomSummary> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        std::fs::rename(&self.partial, &self.path)?;
        self.committed = true;

        Ok(RomSummary {
            path: self.path.clone(),
            width_bits: self.width_bits,
            words: self.words,
            checksum: self.hasher.digest(),
        })
    }
}

impl Drop for RomWriter {
    fn drop(&mut self) {
        if !self.committed {
            log::warn!("Discarding unfinished ROM {}", self.path.display());
            let _ = std::fs::remove_file(&self.partial);
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
