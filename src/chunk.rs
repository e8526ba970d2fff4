// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Chunk: a fixed-capacity slab of one archetype's rows, laid out
//! column-major so bulk-iterating a single component is a linear scan.

use crate::error::{EcsError, Result};
use crate::schema::{ArrayId, ComponentId};

/// Rows per chunk. A power of two so row <-> (chunk, offset) math is a
/// shift and a mask in callers that address rows by a flat index.
pub const CHUNK_CAPACITY: usize = 256;

/// Reinterpret a raw byte buffer as a typed slice. Used to read back
/// component and array bytes stored in a chunk; `T: Copy` rules out types
/// whose destructor these byte-blob columns could never run.
pub(crate) fn bytes_as_slice<T: Copy>(bytes: &[u8]) -> &[T] {
    let stride = std::mem::size_of::<T>();
    let len = if stride == 0 { 0 } else { bytes.len() / stride };
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const T, len) }
}

/// Flatten a typed slice into its raw byte representation, for writing
/// into an array column.
pub(crate) fn slice_as_bytes<T: Copy>(items: &[T]) -> Vec<u8> {
    let byte_len = std::mem::size_of_val(items);
    let ptr = items.as_ptr() as *const u8;
    unsafe { std::slice::from_raw_parts(ptr, byte_len) }.to_vec()
}

/// One component's column within a chunk: `row_count * stride` contiguous
/// bytes, zero-initialized up front for the whole chunk capacity.
struct Column {
    component: ComponentId,
    stride: usize,
    data: Vec<u8>,
}

impl Column {
    fn new(component: ComponentId, stride: usize) -> Self {
        Self {
            component,
            stride,
            data: vec![0u8; stride * CHUNK_CAPACITY],
        }
    }

    #[inline]
    fn ptr_mut(&mut self, row: usize) -> *mut u8 {
        unsafe { self.data.as_mut_ptr().add(row * self.stride) }
    }

    #[inline]
    fn ptr(&self, row: usize) -> *const u8 {
        unsafe { self.data.as_ptr().add(row * self.stride) }
    }
}

/// One array-typed field's column: unlike a component column, each row's
/// cell is an independently-sized byte buffer (the entity's current array
/// contents), since array length varies per entity and can grow.
struct ArrayColumn {
    array: ArrayId,
    stride: usize,
    cells: Vec<Vec<u8>>,
}

impl ArrayColumn {
    fn new(array: ArrayId, stride: usize) -> Self {
        Self {
            array,
            stride,
            cells: Vec::with_capacity(CHUNK_CAPACITY),
        }
    }
}

/// A chunk holds up to [`CHUNK_CAPACITY`] rows for one archetype: one
/// column per component id in the archetype's definition, one column per
/// array id, plus a parallel column of entity slot ids. Chunks never move
/// once allocated — pointers handed out by `component_ptr` stay valid
/// until the archetype itself is destroyed or the row is swap-removed.
pub struct Chunk {
    columns: Vec<Column>,
    array_columns: Vec<ArrayColumn>,
    entity_slots: Vec<u32>,
}

impl Chunk {
    /// Create an empty chunk with one zero-filled column per
    /// `(component, stride)` pair, in the order given (ascending component
    /// id, matching the archetype's definition), and one empty array
    /// column per `(array, stride)` pair.
    pub fn new(components: &[(ComponentId, usize)], arrays: &[(ArrayId, usize)]) -> Self {
        Self {
            columns: components
                .iter()
                .map(|&(id, stride)| Column::new(id, stride))
                .collect(),
            array_columns: arrays
                .iter()
                .map(|&(id, stride)| ArrayColumn::new(id, stride))
                .collect(),
            entity_slots: Vec::with_capacity(CHUNK_CAPACITY),
        }
    }

    pub fn row_count(&self) -> usize {
        self.entity_slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.entity_slots.len() >= CHUNK_CAPACITY
    }

    /// Append a new row for `entity_slot`. Component bytes at the new row
    /// are zero-initialized; the caller writes real values afterward.
    pub fn push_row(&mut self, entity_slot: u32) -> Result<usize> {
        if self.is_full() {
            return Err(EcsError::OutOfMemory);
        }
        let row = self.entity_slots.len();
        self.entity_slots.push(entity_slot);
        for column in &mut self.columns {
            let ptr = column.ptr_mut(row);
            unsafe { std::ptr::write_bytes(ptr, 0, column.stride) };
        }
        for array in &mut self.array_columns {
            array.cells.push(Vec::new());
        }
        Ok(row)
    }

    /// Swap-remove `row`: move the last row's bytes into its place.
    /// Returns the entity slot that used to own the last row, if any row
    /// other than `row` itself was moved.
    pub fn swap_remove(&mut self, row: usize) -> Option<u32> {
        let last = self.entity_slots.len() - 1;
        self.entity_slots.swap_remove(row);
        for array in &mut self.array_columns {
            array.cells.swap_remove(row);
        }
        if row == last {
            return None;
        }
        for column in &mut self.columns {
            unsafe {
                let src = column.ptr(last);
                let dst = column.ptr_mut(row);
                std::ptr::copy_nonoverlapping(src, dst, column.stride);
            }
        }
        Some(self.entity_slots[row])
    }

    fn column_index(&self, component: ComponentId) -> Option<usize> {
        self.columns.iter().position(|c| c.component == component)
    }

    /// Mutable pointer to the cell at `(component, row)`.
    ///
    /// # Panics
    /// Panics if `component` is not a column of this chunk or `row` is out
    /// of bounds — both indicate a caller bug (the archetype's definition
    /// must already guarantee `component` is present).
    pub fn component_ptr(&mut self, component: ComponentId, row: usize) -> *mut u8 {
        assert!(row < self.row_count(), "row out of bounds");
        let idx = self
            .column_index(component)
            .expect("component not in this chunk's definition");
        self.columns[idx].ptr_mut(row)
    }

    /// Immutable pointer to the cell at `(component, row)`. See
    /// [`Chunk::component_ptr`] for panic conditions.
    pub fn component_ptr_const(&self, component: ComponentId, row: usize) -> *const u8 {
        assert!(row < self.row_count(), "row out of bounds");
        let idx = self
            .column_index(component)
            .expect("component not in this chunk's definition");
        self.columns[idx].ptr(row)
    }

    /// Overwrite the entity slot id stored at `row` in place, used when a
    /// row is relocated here from another chunk during a cross-chunk
    /// swap-remove.
    pub fn set_entity_slot(&mut self, row: usize, slot: u32) {
        self.entity_slots[row] = slot;
    }

    /// `row_count * size[id]` contiguous bytes for `component`.
    pub fn component_column(&self, component: ComponentId) -> &[u8] {
        let idx = self
            .column_index(component)
            .expect("component not in this chunk's definition");
        let column = &self.columns[idx];
        &column.data[..self.row_count() * column.stride]
    }

    pub fn entity_slots(&self) -> &[u32] {
        &self.entity_slots
    }

    pub fn entity_slot_at(&self, row: usize) -> u32 {
        self.entity_slots[row]
    }

    fn array_index(&self, array: ArrayId) -> Option<usize> {
        self.array_columns.iter().position(|c| c.array == array)
    }

    /// Element stride (bytes per array element) for `array`.
    pub fn array_stride(&self, array: ArrayId) -> usize {
        let idx = self
            .array_index(array)
            .expect("array not in this chunk's definition");
        self.array_columns[idx].stride
    }

    pub fn array_cell(&self, array: ArrayId, row: usize) -> &[u8] {
        let idx = self
            .array_index(array)
            .expect("array not in this chunk's definition");
        &self.array_columns[idx].cells[row]
    }

    pub fn set_array_cell(&mut self, array: ArrayId, row: usize, bytes: Vec<u8>) {
        let idx = self
            .array_index(array)
            .expect("array not in this chunk's definition");
        self.array_columns[idx].cells[row] = bytes;
    }

    pub fn array_len(&self, array: ArrayId, row: usize) -> usize {
        let stride = self.array_stride(array);
        if stride == 0 {
            0
        } else {
            self.array_cell(array, row).len() / stride
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(id: u8) -> ComponentId {
        ComponentId(id)
    }

    #[test]
    fn push_until_full_then_fails() {
        let mut chunk = Chunk::new(&[(comp(0), 4)], &[]);
        for i in 0..CHUNK_CAPACITY {
            assert_eq!(chunk.push_row(i as u32).unwrap(), i);
        }
        assert!(chunk.is_full());
        assert!(chunk.push_row(9999).is_err());
    }

    #[test]
    fn swap_remove_last_row_returns_none() {
        let mut chunk = Chunk::new(&[(comp(0), 4)], &[]);
        chunk.push_row(1).unwrap();
        chunk.push_row(2).unwrap();
        assert_eq!(chunk.swap_remove(1), None);
        assert_eq!(chunk.row_count(), 1);
    }

    #[test]
    fn swap_remove_middle_row_returns_moved_slot_and_copies_bytes() {
        let mut chunk = Chunk::new(&[(comp(0), 4)], &[]);
        chunk.push_row(10).unwrap();
        chunk.push_row(20).unwrap();
        chunk.push_row(30).unwrap();

        unsafe {
            let ptr = chunk.component_ptr(comp(0), 2) as *mut u32;
            *ptr = 0xdead_beef;
        }

        let moved = chunk.swap_remove(0);
        assert_eq!(moved, Some(30));
        assert_eq!(chunk.row_count(), 2);
        assert_eq!(chunk.entity_slot_at(0), 30);
        unsafe {
            let ptr = chunk.component_ptr(comp(0), 0) as *const u32;
            assert_eq!(*ptr, 0xdead_beef);
        }
    }

    #[test]
    fn component_column_is_contiguous_row_count_times_stride() {
        let mut chunk = Chunk::new(&[(comp(0), 4)], &[]);
        chunk.push_row(1).unwrap();
        chunk.push_row(2).unwrap();
        assert_eq!(chunk.component_column(comp(0)).len(), 8);
    }
}
