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

//! World: the structural-change engine tying schema, entity index and
//! archetype storage together. Every `add_*`/`remove_*`/`set_parent`/
//! `enable`/`disable` call routes through [`World::move_entity`], the one
//! place rows cross from one archetype's chunks into another's.

use ahash::AHashMap;
use smallvec::SmallVec;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::ArchetypeTable;
use crate::chunk::{bytes_as_slice, slice_as_bytes, CHUNK_CAPACITY};
use crate::definition::Definition;
use crate::entity::{Entity, EntityIndex, EntityLocation};
use crate::error::{EcsError, Result};
use crate::schema::{ArrayId, ComponentId, Schema, TagId, DISABLED_TAG};

/// Memory occupied by world storage, broken down by subsystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStats {
    pub entity_index_memory: usize,
    pub archetype_memory: usize,
    pub chunk_count: usize,
    pub total_memory: usize,
}

/// Central ECS world: one [`Schema`], one [`EntityIndex`], and the set of
/// [`ArchetypeTable`]s those entities are distributed across.
pub struct World {
    schema: Schema,
    entities: EntityIndex,
    archetypes: Vec<ArchetypeTable>,
    archetype_index: AHashMap<u64, SmallVec<[usize; 4]>>,
}

impl World {
    pub fn new() -> Self {
        let schema = Schema::new();
        let empty = ArchetypeTable::new(Definition::new(), &schema);
        let mut archetype_index: AHashMap<u64, SmallVec<[usize; 4]>> = AHashMap::default();
        archetype_index
            .entry(Definition::new().fingerprint())
            .or_default()
            .push(0);

        Self {
            schema,
            entities: EntityIndex::new(),
            archetypes: vec![empty],
            archetype_index,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn archetypes(&self) -> &[ArchetypeTable] {
        &self.archetypes
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub(crate) fn locate_or_create_archetype(&mut self, definition: Definition) -> usize {
        let fingerprint = definition.fingerprint();
        if let Some(candidates) = self.archetype_index.get(&fingerprint) {
            for &index in candidates {
                if *self.archetypes[index].definition() == definition {
                    return index;
                }
            }
        }
        let index = self.archetypes.len();
        self.archetypes
            .push(ArchetypeTable::new(definition, &self.schema));
        self.archetype_index
            .entry(fingerprint)
            .or_default()
            .push(index);
        index
    }

    /// Create a new entity with no components, arrays, or tags.
    pub fn create_entity(&mut self) -> Entity {
        #[cfg(feature = "profiling")]
        let span = info_span!(
            "world.create_entity",
            archetype_count = self.archetypes.len()
        );
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        let entity = self.entities.allocate();
        let (chunk_index, row_index) = self.archetypes[0].insert(entity.slot);
        self.entities.activate(
            entity,
            EntityLocation {
                archetype_index: 0,
                chunk_index,
                row_index,
            },
        );
        entity
    }

    /// Reconstruct the full handle for a bare chunk-stored slot id.
    pub(crate) fn entity_for_slot(&self, slot: u32) -> Entity {
        self.entities.entity_for_slot(slot)
    }

    /// Place a row directly into `archetype_index` at the exact original
    /// `(slot, generation)`, bypassing both the empty archetype and the
    /// free-list allocator. Used only by the binary deserializer, which
    /// must reproduce every entity's saved identity, not hand out fresh
    /// ones. Callers must invoke `finalize_restored_entities` once every
    /// row has been restored.
    pub(crate) fn restore_entity(
        &mut self,
        archetype_index: usize,
        slot: u32,
        generation: u32,
    ) -> (Entity, usize, usize) {
        let (chunk_index, row_index) = self.archetypes[archetype_index].insert(slot);
        let entity = self.entities.restore_at(
            slot,
            generation,
            EntityLocation {
                archetype_index,
                chunk_index,
                row_index,
            },
        );
        (entity, chunk_index, row_index)
    }

    /// Rebuild the entity index's free list after a run of `restore_entity`
    /// calls, so gap-fill placeholder slots become available for reuse.
    pub(crate) fn finalize_restored_entities(&mut self) {
        self.entities.rebuild_free_list();
    }

    pub(crate) fn archetype_mut(&mut self, index: usize) -> &mut ArchetypeTable {
        &mut self.archetypes[index]
    }

    /// Wholesale-replace the schema, used right after deserializing one
    /// from a world payload's header.
    pub(crate) fn replace_schema(&mut self, schema: Schema) {
        self.schema = schema;
    }

    /// Create `count` entities in the empty archetype.
    pub fn create_batch(&mut self, count: usize) -> Vec<Entity> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.create_batch", count);
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.create_entity());
        }
        out
    }

    /// Destroy `entity` and, recursively, every descendant in its child
    /// subtree.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.destroy");
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        let children = self.entities.children(entity)?;
        for child in children {
            self.destroy(child)?;
        }

        let location = self.entities.retire(entity)?;
        self.remove_row(location.archetype_index, location.chunk_index, location.row_index)?;
        Ok(())
    }

    fn remove_row(&mut self, archetype_index: usize, chunk_index: usize, row_index: usize) -> Result<()> {
        if let Some(moved_slot) = self.archetypes[archetype_index].remove(chunk_index, row_index) {
            let moved_entity = self.entities.entity_for_slot(moved_slot);
            self.entities.set_row(moved_entity, chunk_index, row_index)?;
        }
        Ok(())
    }

    /// Copy one row's shared component/array bytes from archetype
    /// `src_index` into archetype `dst_index`; the two indices must differ.
    fn copy_between(
        &mut self,
        src_index: usize,
        src_chunk: usize,
        src_row: usize,
        dst_index: usize,
        dst_chunk: usize,
        dst_row: usize,
    ) {
        if src_index < dst_index {
            let (left, right) = self.archetypes.split_at_mut(dst_index);
            let src = &left[src_index];
            let dst = &mut right[0];
            src.copy_row_into(src_chunk, src_row, dst, dst_chunk, dst_row);
        } else {
            let (left, right) = self.archetypes.split_at_mut(src_index);
            let dst = &mut left[dst_index];
            let src = &right[0];
            src.copy_row_into(src_chunk, src_row, dst, dst_chunk, dst_row);
        }
    }

    /// Move `entity`'s row from its current archetype into the archetype
    /// for `new_definition`, copying every component/array id the two
    /// definitions share. This is the one place rows cross archetypes:
    /// `add_component`, `remove_component`, `add_array`, `remove_array`,
    /// `add_tag`, `remove_tag`, `enable`, and `disable` all reduce to a
    /// `Definition` transform followed by a call here.
    fn move_entity(&mut self, entity: Entity, new_definition: Definition) -> Result<()> {
        let old_location = self.entities.location(entity)?;
        let new_index = self.locate_or_create_archetype(new_definition);

        let (new_chunk, new_row) = self.archetypes[new_index].insert(entity.slot);
        self.copy_between(
            old_location.archetype_index,
            old_location.chunk_index,
            old_location.row_index,
            new_index,
            new_chunk,
            new_row,
        );

        self.remove_row(
            old_location.archetype_index,
            old_location.chunk_index,
            old_location.row_index,
        )?;

        self.entities.set_location(
            entity,
            EntityLocation {
                archetype_index: new_index,
                chunk_index: new_chunk,
                row_index: new_row,
            },
        )?;
        Ok(())
    }

    fn definition_of(&self, entity: Entity) -> Result<Definition> {
        let location = self.entities.location(entity)?;
        Ok(*self.archetypes[location.archetype_index].definition())
    }

    // ---------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------

    pub fn add_component<T: Copy + 'static>(&mut self, entity: Entity, value: T) -> Result<()> {
        let id = self.schema.register_component::<T>()?;
        let definition = self.definition_of(entity)?;
        if definition.has_component(id) {
            return Err(EcsError::DuplicateComponent(entity, id.0));
        }
        self.move_entity(entity, definition.with_component(id))?;
        let location = self.entities.location(entity)?;
        let ptr = self.archetypes[location.archetype_index].component_ptr(
            location.chunk_index,
            location.row_index,
            id,
        ) as *mut T;
        unsafe { ptr.write(value) };
        Ok(())
    }

    pub fn remove_component<T: Copy + 'static>(&mut self, entity: Entity) -> Result<T> {
        let id = self
            .schema
            .component_id_of::<T>()
            .ok_or(EcsError::UnknownType)?;
        let definition = self.definition_of(entity)?;
        if !definition.has_component(id) {
            return Err(EcsError::MissingComponent(entity, id.0));
        }
        let value = *self.component::<T>(entity)?;
        self.move_entity(entity, definition.without_component(id))?;
        Ok(value)
    }

    pub fn component<T: Copy + 'static>(&self, entity: Entity) -> Result<&T> {
        let id = self
            .schema
            .component_id_of::<T>()
            .ok_or(EcsError::UnknownType)?;
        let location = self.entities.location(entity)?;
        let definition = self.archetypes[location.archetype_index].definition();
        if !definition.has_component(id) {
            return Err(EcsError::MissingComponent(entity, id.0));
        }
        let ptr = self.archetypes[location.archetype_index].component_ptr_const(
            location.chunk_index,
            location.row_index,
            id,
        ) as *const T;
        Ok(unsafe { &*ptr })
    }

    pub fn component_mut<T: Copy + 'static>(&mut self, entity: Entity) -> Result<&mut T> {
        let id = self
            .schema
            .component_id_of::<T>()
            .ok_or(EcsError::UnknownType)?;
        let location = self.entities.location(entity)?;
        if !self.archetypes[location.archetype_index]
            .definition()
            .has_component(id)
        {
            return Err(EcsError::MissingComponent(entity, id.0));
        }
        let ptr = self.archetypes[location.archetype_index].component_ptr(
            location.chunk_index,
            location.row_index,
            id,
        ) as *mut T;
        Ok(unsafe { &mut *ptr })
    }

    pub fn has_component<T: 'static>(&self, entity: Entity) -> Result<bool> {
        let definition = self.definition_of(entity)?;
        Ok(match self.schema.component_id_of::<T>() {
            Some(id) => definition.has_component(id),
            None => false,
        })
    }

    // ---------------------------------------------------------------
    // Arrays
    // ---------------------------------------------------------------

    pub fn add_array<T: Copy + 'static>(&mut self, entity: Entity, items: &[T]) -> Result<()> {
        let id = self.schema.register_array::<T>()?;
        let definition = self.definition_of(entity)?;
        if definition.has_array(id) {
            return Err(EcsError::DuplicateArray(entity, id.0));
        }
        self.move_entity(entity, definition.with_array(id))?;
        let bytes = slice_as_bytes(items);
        let location = self.entities.location(entity)?;
        self.archetypes[location.archetype_index].set_array_cell(
            location.chunk_index,
            location.row_index,
            id,
            bytes,
        );
        Ok(())
    }

    pub fn remove_array<T: Copy + 'static>(&mut self, entity: Entity) -> Result<Vec<T>> {
        let id = self
            .schema
            .array_id_of::<T>()
            .ok_or(EcsError::UnknownType)?;
        let definition = self.definition_of(entity)?;
        if !definition.has_array(id) {
            return Err(EcsError::MissingArray(entity, id.0));
        }
        let items = self.array::<T>(entity)?.to_vec();
        self.move_entity(entity, definition.without_array(id))?;
        Ok(items)
    }

    pub fn array<T: Copy + 'static>(&self, entity: Entity) -> Result<&[T]> {
        let id = self
            .schema
            .array_id_of::<T>()
            .ok_or(EcsError::UnknownType)?;
        let location = self.entities.location(entity)?;
        let definition = self.archetypes[location.archetype_index].definition();
        if !definition.has_array(id) {
            return Err(EcsError::MissingArray(entity, id.0));
        }
        let bytes =
            self.archetypes[location.archetype_index].array_cell(location.chunk_index, location.row_index, id);
        Ok(bytes_as_slice(bytes))
    }

    pub fn array_len(&self, entity: Entity, id: ArrayId) -> Result<usize> {
        let location = self.entities.location(entity)?;
        Ok(self.archetypes[location.archetype_index].array_len(
            location.chunk_index,
            location.row_index,
            id,
        ))
    }

    // ---------------------------------------------------------------
    // Tags
    // ---------------------------------------------------------------

    pub fn add_tag<T: 'static>(&mut self, entity: Entity) -> Result<()> {
        let id = self.schema.register_tag::<T>()?;
        self.add_tag_id(entity, id)
    }

    pub fn remove_tag<T: 'static>(&mut self, entity: Entity) -> Result<()> {
        let id = self.schema.tag_id_of::<T>().ok_or(EcsError::UnknownType)?;
        self.remove_tag_id(entity, id)
    }

    pub fn has_tag<T: 'static>(&self, entity: Entity) -> Result<bool> {
        let definition = self.definition_of(entity)?;
        Ok(match self.schema.tag_id_of::<T>() {
            Some(id) => definition.has_tag(id),
            None => false,
        })
    }

    fn add_tag_id(&mut self, entity: Entity, id: TagId) -> Result<()> {
        let definition = self.definition_of(entity)?;
        if definition.has_tag(id) {
            return Err(EcsError::DuplicateTag(entity, id.0));
        }
        self.move_entity(entity, definition.with_tag(id))
    }

    fn remove_tag_id(&mut self, entity: Entity, id: TagId) -> Result<()> {
        let definition = self.definition_of(entity)?;
        if !definition.has_tag(id) {
            return Err(EcsError::MissingTag(entity, id.0));
        }
        self.move_entity(entity, definition.without_tag(id))
    }

    /// Whether `entity` carries the reserved disabled tag.
    pub fn is_disabled(&self, entity: Entity) -> Result<bool> {
        Ok(self.definition_of(entity)?.is_disabled())
    }

    /// Set the disabled tag, moving the entity into the matching archetype.
    /// A no-op if already disabled.
    pub fn disable(&mut self, entity: Entity) -> Result<()> {
        let definition = self.definition_of(entity)?;
        if definition.is_disabled() {
            return Ok(());
        }
        self.move_entity(entity, definition.with_tag(DISABLED_TAG))
    }

    /// Clear the disabled tag. A no-op if already enabled.
    pub fn enable(&mut self, entity: Entity) -> Result<()> {
        let definition = self.definition_of(entity)?;
        if !definition.is_disabled() {
            return Ok(());
        }
        self.move_entity(entity, definition.without_tag(DISABLED_TAG))
    }

    // ---------------------------------------------------------------
    // Hierarchy
    // ---------------------------------------------------------------

    pub fn set_parent(&mut self, child: Entity, parent: Option<Entity>) -> Result<()> {
        self.entities.set_parent(child, parent)
    }

    pub fn parent(&self, entity: Entity) -> Result<Option<Entity>> {
        self.entities.parent(entity)
    }

    pub fn children(&self, entity: Entity) -> Result<Vec<Entity>> {
        self.entities.children(entity)
    }

    pub fn child_count(&self, entity: Entity) -> Result<u32> {
        self.entities.child_count(entity)
    }

    // ---------------------------------------------------------------
    // Bulk operations
    // ---------------------------------------------------------------

    /// Drop every entity and archetype, keeping the schema's type
    /// registrations (the schema is process-scoped, not world-scoped).
    pub fn clear(&mut self) {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.clear");
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        self.entities = EntityIndex::new();
        self.archetypes = vec![ArchetypeTable::new(Definition::new(), &self.schema)];
        self.archetype_index.clear();
        self.archetype_index
            .entry(Definition::new().fingerprint())
            .or_default()
            .push(0);
    }

    pub fn memory_stats(&self) -> MemoryStats {
        let entity_index_memory = self.entity_count() * std::mem::size_of::<EntityLocation>();
        let mut archetype_memory = 0usize;
        let mut chunk_count = 0usize;
        for table in &self.archetypes {
            chunk_count += table.chunk_count();
            let row_bytes: usize = table.component_layout().iter().map(|&(_, size)| size).sum();
            archetype_memory += table.chunk_count() * CHUNK_CAPACITY * row_bytes;
        }
        MemoryStats {
            entity_index_memory,
            archetype_memory,
            chunk_count,
            total_memory: entity_index_memory + archetype_memory,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
