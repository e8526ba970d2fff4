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

//! Archetype table: the chunked, column-major storage for every entity
//! sharing one [`Definition`].

use crate::chunk::Chunk;
use crate::definition::Definition;
use crate::schema::{ArrayId, ComponentId, Schema};

/// All rows for one exact `Definition`, split across fixed-capacity
/// chunks. Rows never move between archetypes; they move between
/// archetypes only by being copied into a different `ArchetypeTable`
/// (see `World`'s structural-change engine) and removed from this one.
pub struct ArchetypeTable {
    definition: Definition,
    component_layout: Vec<(ComponentId, usize)>,
    array_layout: Vec<(ArrayId, usize)>,
    chunks: Vec<Chunk>,
    entity_count: usize,
}

impl ArchetypeTable {
    /// Build the table's column layout from `definition`, reading sizes out
    /// of `schema`. The layout visits ids in ascending order, matching
    /// `BitMask::iter`'s order, so two tables built from the same schema
    /// always lay columns out identically.
    pub fn new(definition: Definition, schema: &Schema) -> Self {
        let component_layout = definition
            .components
            .iter()
            .map(|id| {
                let cid = ComponentId(id);
                (cid, schema.component_size(cid) as usize)
            })
            .collect();
        let array_layout = definition
            .arrays
            .iter()
            .map(|id| {
                let aid = ArrayId(id);
                (aid, schema.array_stride(aid) as usize)
            })
            .collect();
        Self {
            definition,
            component_layout,
            array_layout,
            chunks: Vec::new(),
            entity_count: 0,
        }
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    fn new_chunk(&self) -> Chunk {
        Chunk::new(&self.component_layout, &self.array_layout)
    }

    /// Append a new, zero-initialized row for `entity_slot`. Returns its
    /// `(chunk_index, row_index)`.
    pub fn insert(&mut self, entity_slot: u32) -> (usize, usize) {
        let needs_new_chunk = match self.chunks.last() {
            Some(chunk) => chunk.is_full(),
            None => true,
        };
        if needs_new_chunk {
            let fresh = self.new_chunk();
            self.chunks.push(fresh);
        }
        let chunk_index = self.chunks.len() - 1;
        let row = self.chunks[chunk_index]
            .push_row(entity_slot)
            .expect("freshly appended chunk cannot be full");
        self.entity_count += 1;
        (chunk_index, row)
    }

    /// Remove the row at `(chunk_index, row)` via swap-remove, pulling in
    /// the archetype's last row (wherever it lives) to fill the gap.
    /// Returns the entity slot of whatever row now occupies the vacated
    /// slot, or `None` if the removed row was itself the last live row.
    ///
    /// A chunk is never popped here, even once its `row_count` reaches
    /// zero: chunk memory is freed only when the whole archetype is torn
    /// down, not shrunk in response to removals. An emptied trailing chunk
    /// is simply reused by the next `insert`.
    pub fn remove(&mut self, chunk_index: usize, row: usize) -> Option<u32> {
        self.entity_count -= 1;
        let last_chunk_index = self.chunks.len() - 1;

        if chunk_index == last_chunk_index {
            return self.chunks[chunk_index].swap_remove(row);
        }

        let last_row = self.chunks[last_chunk_index].row_count() - 1;
        let moved_slot = self.chunks[last_chunk_index].entity_slot_at(last_row);

        let (dst, src) = {
            let (left, right) = self.chunks.split_at_mut(last_chunk_index);
            (&mut left[chunk_index], &mut right[0])
        };

        for &(id, stride) in &self.component_layout {
            let src_ptr = src.component_ptr_const(id, last_row);
            let dst_ptr = dst.component_ptr(id, row);
            unsafe { std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, stride) };
        }
        for &(array, _) in &self.array_layout {
            let bytes = src.array_cell(array, last_row).to_vec();
            dst.set_array_cell(array, row, bytes);
        }
        dst.set_entity_slot(row, moved_slot);

        src.swap_remove(last_row);
        Some(moved_slot)
    }

    /// Copy every component/array id this table's definition shares with
    /// `dst`'s definition from `(chunk, row)` into `(dst_chunk, dst_row)`.
    /// Ids only `dst` has are left zero-initialized (already true from
    /// `insert`); ids only `self` has are left behind with no destructor
    /// run, since components are plain byte blobs.
    pub fn copy_row_into(
        &self,
        chunk: usize,
        row: usize,
        dst: &mut ArchetypeTable,
        dst_chunk: usize,
        dst_row: usize,
    ) {
        for &(id, stride) in &dst.component_layout {
            if self.definition.has_component(id) {
                let src_ptr = self.chunks[chunk].component_ptr_const(id, row);
                let dst_ptr = dst.chunks[dst_chunk].component_ptr(id, dst_row);
                unsafe { std::ptr::copy_nonoverlapping(src_ptr, dst_ptr, stride) };
            }
        }
        for &(array, _) in &dst.array_layout {
            if self.definition.has_array(array) {
                let bytes = self.chunks[chunk].array_cell(array, row).to_vec();
                dst.chunks[dst_chunk].set_array_cell(array, dst_row, bytes);
            }
        }
    }

    pub fn component_ptr(&mut self, chunk: usize, row: usize, id: ComponentId) -> *mut u8 {
        self.chunks[chunk].component_ptr(id, row)
    }

    pub fn component_ptr_const(&self, chunk: usize, row: usize, id: ComponentId) -> *const u8 {
        self.chunks[chunk].component_ptr_const(id, row)
    }

    pub fn array_cell(&self, chunk: usize, row: usize, id: ArrayId) -> &[u8] {
        self.chunks[chunk].array_cell(id, row)
    }

    pub fn set_array_cell(&mut self, chunk: usize, row: usize, id: ArrayId, bytes: Vec<u8>) {
        self.chunks[chunk].set_array_cell(id, row, bytes);
    }

    pub fn array_len(&self, chunk: usize, row: usize, id: ArrayId) -> usize {
        self.chunks[chunk].array_len(id, row)
    }

    pub fn entity_slot_at(&self, chunk: usize, row: usize) -> u32 {
        self.chunks[chunk].entity_slot_at(row)
    }

    pub fn component_layout(&self) -> &[(ComponentId, usize)] {
        &self.component_layout
    }

    pub fn array_layout(&self) -> &[(ArrayId, usize)] {
        &self.array_layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::CHUNK_CAPACITY;

    fn schema_with_one_component() -> (Schema, ComponentId) {
        let mut schema = Schema::new();
        struct Marker(u32);
        let id = schema.register_component::<Marker>().unwrap();
        (schema, id)
    }

    #[test]
    fn insert_spills_into_a_new_chunk_at_capacity() {
        let (schema, component) = schema_with_one_component();
        let definition = Definition::new().with_component(component);
        let mut table = ArchetypeTable::new(definition, &schema);

        for slot in 0..CHUNK_CAPACITY as u32 {
            table.insert(slot);
        }
        assert_eq!(table.chunk_count(), 1);
        table.insert(CHUNK_CAPACITY as u32);
        assert_eq!(table.chunk_count(), 2);
        assert_eq!(table.entity_count(), CHUNK_CAPACITY + 1);
    }

    #[test]
    fn remove_within_last_chunk_is_simple_swap() {
        let (schema, component) = schema_with_one_component();
        let definition = Definition::new().with_component(component);
        let mut table = ArchetypeTable::new(definition, &schema);

        table.insert(1);
        table.insert(2);
        table.insert(3);
        let moved = table.remove(0, 0);
        assert_eq!(moved, Some(3));
        assert_eq!(table.entity_count(), 2);
    }

    #[test]
    fn remove_from_non_last_chunk_pulls_from_the_tail() {
        let (schema, component) = schema_with_one_component();
        let definition = Definition::new().with_component(component);
        let mut table = ArchetypeTable::new(definition, &schema);

        for slot in 0..CHUNK_CAPACITY as u32 {
            table.insert(slot);
        }
        table.insert(CHUNK_CAPACITY as u32);
        assert_eq!(table.chunk_count(), 2);

        let moved = table.remove(0, 5);
        assert_eq!(moved, Some(CHUNK_CAPACITY as u32));
        // The chunk that emptied out is kept around, not freed.
        assert_eq!(table.chunk_count(), 2);
        assert_eq!(table.chunks()[1].row_count(), 0);
        assert_eq!(table.entity_slot_at(0, 5), CHUNK_CAPACITY as u32);
    }

    #[test]
    fn removing_the_last_entity_from_a_sole_chunk_keeps_the_chunk_alive() {
        let (schema, component) = schema_with_one_component();
        let definition = Definition::new().with_component(component);
        let mut table = ArchetypeTable::new(definition, &schema);

        table.insert(1);
        let moved = table.remove(0, 0);
        assert_eq!(moved, None);
        assert_eq!(table.entity_count(), 0);
        assert_eq!(table.chunk_count(), 1);
        assert_eq!(table.chunks()[0].row_count(), 0);
    }

    #[test]
    fn copy_row_into_preserves_shared_ids_and_zeroes_new_ones() {
        let mut schema = Schema::new();
        struct A(u32);
        struct B(u32);
        let a = schema.register_component::<A>().unwrap();
        let b = schema.register_component::<B>().unwrap();

        let def_a = Definition::new().with_component(a);
        let def_ab = Definition::new().with_component(a).with_component(b);

        let mut src = ArchetypeTable::new(def_a, &schema);
        let mut dst = ArchetypeTable::new(def_ab, &schema);

        let (sc, sr) = src.insert(7);
        unsafe {
            let ptr = src.component_ptr(sc, sr, a) as *mut u32;
            *ptr = 0x1234;
        }

        let (dc, dr) = dst.insert(7);
        src.copy_row_into(sc, sr, &mut dst, dc, dr);

        unsafe {
            let a_ptr = dst.component_ptr(dc, dr, a) as *const u32;
            assert_eq!(*a_ptr, 0x1234);
            let b_ptr = dst.component_ptr(dc, dr, b) as *const u32;
            assert_eq!(*b_ptr, 0);
        }
    }
}
