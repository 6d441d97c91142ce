//! Program image format.
//!
//! An image is a stream of big-endian 16-bit words:
//! - the first word is the origin (load address)
//! - every following word is stored at consecutive addresses from there
//!
//! This is the `.obj` format produced by the standard LC-3 assembler.

use crate::cpu::memory::{Memory, MemoryError, MEMORY_SIZE};
use log::info;
use std::path::Path;
use thiserror::Error;

/// A parsed program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Address the first word is loaded at.
    pub origin: u16,
    /// The program words.
    pub words: Vec<u16>,
}

impl Image {
    /// Parse an image from raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Image, ImageError> {
        if bytes.len() % 2 != 0 {
            return Err(ImageError::OddLength(bytes.len()));
        }

        let mut words = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));

        let origin = words.next().ok_or(ImageError::Empty)?;
        let words: Vec<u16> = words.collect();

        if origin as usize + words.len() > MEMORY_SIZE {
            return Err(ImageError::TooLarge { origin, words: words.len() });
        }

        Ok(Image { origin, words })
    }

    /// Encode back to the on-disk byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Copy the image into memory, overwriting whatever was there.
    pub fn load_into(&self, mem: &mut Memory) -> Result<(), MemoryError> {
        mem.load_program(self.origin, &self.words)
    }

    /// Number of program words (excluding the origin).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the image carries no program words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Read and parse an image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, ImageError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| ImageError::Io { path: path.display().to_string(), message: e.to_string() })?;
    let image = Image::parse(&bytes)?;
    info!("loaded {}: {} words at x{:04X}", path.display(), image.len(), image.origin);
    Ok(image)
}

/// Errors that can occur while loading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },

    #[error("image is empty (no origin word)")]
    Empty,

    #[error("image length {0} is not a whole number of 16-bit words")]
    OddLength(usize),

    #[error("image of {words} words at x{origin:04X} runs past the end of memory")]
    TooLarge { origin: u16, words: usize },

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
