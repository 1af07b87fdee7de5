//! Typed access to the aggregate value slots of one map entry.

use crate::memory::MemoryPages;
use crate::records::RowLayout;

/// Mutable view over the value slots of a single map entry.
pub struct MapValues<'a> {
    mem: &'a mut MemoryPages,
    layout: &'a RowLayout,
    base: u64,
    is_new: bool,
}

impl<'a> MapValues<'a> {
    pub(crate) fn new(mem: &'a mut MemoryPages, layout: &'a RowLayout, base: u64, is_new: bool) -> Self {
        Self {
            mem,
            layout,
            base,
            is_new,
        }
    }

    /// True when the entry was created by this lookup; slots are zeroed.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    #[inline]
    fn at(&self, index: usize) -> u64 {
        self.base + self.layout.offset(index) as u64
    }

    pub fn get_bool(&self, index: usize) -> bool {
        self.mem.slice(self.at(index), 1)[0] != 0
    }

    pub fn put_bool(&mut self, index: usize, value: bool) {
        let at = self.at(index);
        self.mem.slice_mut(at, 1)[0] = value as u8;
    }

    pub fn get_byte(&self, index: usize) -> i8 {
        self.mem.slice(self.at(index), 1)[0] as i8
    }

    pub fn put_byte(&mut self, index: usize, value: i8) {
        let at = self.at(index);
        self.mem.slice_mut(at, 1)[0] = value as u8;
    }

    pub fn get_short(&self, index: usize) -> i16 {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.mem.slice(self.at(index), 2));
        i16::from_le_bytes(buf)
    }

    pub fn put_short(&mut self, index: usize, value: i16) {
        let at = self.at(index);
        self.mem.slice_mut(at, 2).copy_from_slice(&value.to_le_bytes());
    }

    pub fn get_int(&self, index: usize) -> i32 {
        self.mem.read_i32(self.at(index))
    }

    pub fn put_int(&mut self, index: usize, value: i32) {
        let at = self.at(index);
        self.mem.write_i32(at, value);
    }

    pub fn get_long(&self, index: usize) -> i64 {
        self.mem.read_i64(self.at(index))
    }

    pub fn put_long(&mut self, index: usize, value: i64) {
        let at = self.at(index);
        self.mem.write_i64(at, value);
    }

    pub fn get_float(&self, index: usize) -> f32 {
        f32::from_bits(self.get_int(index) as u32)
    }

    pub fn put_float(&mut self, index: usize, value: f32) {
        self.put_int(index, value.to_bits() as i32);
    }

    pub fn get_double(&self, index: usize) -> f64 {
        f64::from_bits(self.get_long(index) as u64)
    }

    pub fn put_double(&mut self, index: usize, value: f64) {
        self.put_long(index, value.to_bits() as i64);
    }

    pub fn get_date(&self, index: usize) -> i64 {
        self.get_long(index)
    }

    pub fn put_date(&mut self, index: usize, value: i64) {
        self.put_long(index, value);
    }
}
