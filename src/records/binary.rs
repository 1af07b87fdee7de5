//! Lazy byte stream over a binary value that may be split across arena pages.

use std::io::Read;

use smallvec::SmallVec;

/// Borrowed binary value made of one or more contiguous chunks.
#[derive(Debug, Clone)]
pub struct BinarySequence<'a> {
    chunks: SmallVec<[&'a [u8]; 4]>,
    len: usize,
    chunk: usize,
    pos: usize,
}

impl<'a> BinarySequence<'a> {
    pub fn contiguous(bytes: &'a [u8]) -> Self {
        let mut chunks = SmallVec::new();
        chunks.push(bytes);
        Self::from_chunks(chunks)
    }

    pub fn from_chunks(chunks: SmallVec<[&'a [u8]; 4]>) -> Self {
        let len = chunks.iter().map(|c| c.len()).sum();
        Self {
            chunks,
            len,
            chunk: 0,
            pos: 0,
        }
    }

    /// Total byte length, independent of how much has been read.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunks(&self) -> &[&'a [u8]] {
        &self.chunks
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

impl Read for BinarySequence<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut written = 0;
        while written < buf.len() && self.chunk < self.chunks.len() {
            let chunk = self.chunks[self.chunk];
            let n = (chunk.len() - self.pos).min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&chunk[self.pos..self.pos + n]);
            written += n;
            self.pos += n;
            if self.pos == chunk.len() {
                self.chunk += 1;
                self.pos = 0;
            }
        }
        Ok(written)
    }
}
