//! Sample memory shared with the module's sample store
//!
//! Voices never copy sample data. They hold a [`DataPointer`] into one shared
//! arena of signed 8-bit sample bytes, owned by the sample store and handed
//! to the engine as a reference-counted slice.

use std::fmt;
use std::sync::Arc;

/// Read-only arena of signed 8-bit sample data
#[derive(Clone)]
pub struct SampleMemory {
    bytes: Arc<[i8]>,
}

impl SampleMemory {
    /// Empty arena; every pointer into it reads silence
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Take ownership of a sample buffer
    pub fn from_vec(bytes: Vec<i8>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Share an existing arena
    pub fn from_arc(bytes: Arc<[i8]>) -> Self {
        Self { bytes }
    }

    /// Size of the arena in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the arena holds no data
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Resolve a register-level data pointer
    ///
    /// `None` and offsets outside the arena are redirected to the silent
    /// buffer instead of being rejected.
    pub fn resolve(&self, offset: Option<usize>) -> DataPointer {
        match offset {
            Some(offset) if offset < self.bytes.len() => DataPointer::Offset(offset),
            _ => DataPointer::Silent,
        }
    }

    /// Fetch one DMA word (two sample bytes)
    ///
    /// Bytes past the end of the arena read as zero.
    #[inline]
    pub fn word(&self, pointer: DataPointer) -> [i8; 2] {
        match pointer {
            DataPointer::Silent => [0, 0],
            DataPointer::Offset(offset) => {
                [self.byte(offset), self.byte(offset.saturating_add(1))]
            }
        }
    }

    /// Single sample byte, zero past the end
    #[inline]
    pub fn byte(&self, offset: usize) -> i8 {
        self.bytes.get(offset).copied().unwrap_or(0)
    }

    /// Whether both handles refer to the same arena
    pub fn ptr_eq(&self, other: &SampleMemory) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl Default for SampleMemory {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for SampleMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleMemory")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// DMA pointer into sample memory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataPointer {
    /// Fixed silent buffer used in place of null or unusable pointers
    #[default]
    Silent,
    /// Byte offset into the attached [`SampleMemory`]
    Offset(usize),
}

impl DataPointer {
    /// Pointer one DMA word further on
    #[inline]
    pub fn next_word(self) -> Self {
        match self {
            DataPointer::Silent => DataPointer::Silent,
            DataPointer::Offset(offset) => DataPointer::Offset(offset.saturating_add(2)),
        }
    }

    /// Byte offset, or `None` for the silent buffer
    pub fn offset(self) -> Option<usize> {
        match self {
            DataPointer::Silent => None,
            DataPointer::Offset(offset) => Some(offset),
        }
    }
}
