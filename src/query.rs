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

//! Query: BitMask include/exclude filtering over archetypes, yielding
//! [`ChunkView`]s rather than per-entity iterators so callers can bulk-read
//! a component column.

use crate::archetype::ArchetypeTable;
use crate::chunk::{bytes_as_slice, Chunk};
use crate::definition::Definition;
use crate::schema::{ArrayId, ComponentId, TagId};
use crate::world::World;

/// Include/exclude filter over a [`Definition`]'s three id spaces.
/// `matches` is a handful of `BitMask` operations — no per-component
/// branching, regardless of how many ids are named.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    include_components: crate::bitmask::BitMask,
    exclude_components: crate::bitmask::BitMask,
    include_arrays: crate::bitmask::BitMask,
    exclude_arrays: crate::bitmask::BitMask,
    include_tags: crate::bitmask::BitMask,
    exclude_tags: crate::bitmask::BitMask,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, id: ComponentId) -> Self {
        self.include_components.insert(id.0);
        self
    }

    pub fn without_component(mut self, id: ComponentId) -> Self {
        self.exclude_components.insert(id.0);
        self
    }

    pub fn with_array(mut self, id: ArrayId) -> Self {
        self.include_arrays.insert(id.0);
        self
    }

    pub fn without_array(mut self, id: ArrayId) -> Self {
        self.exclude_arrays.insert(id.0);
        self
    }

    pub fn with_tag(mut self, id: TagId) -> Self {
        self.include_tags.insert(id.0);
        self
    }

    pub fn without_tag(mut self, id: TagId) -> Self {
        self.exclude_tags.insert(id.0);
        self
    }

    pub fn matches(&self, definition: &Definition) -> bool {
        self.include_components.is_subset_of(&definition.components)
            && !self.exclude_components.intersects(&definition.components)
            && self.include_arrays.is_subset_of(&definition.arrays)
            && !self.exclude_arrays.intersects(&definition.arrays)
            && self.include_tags.is_subset_of(&definition.tags)
            && !self.exclude_tags.intersects(&definition.tags)
    }
}

/// Read-only view over one chunk's rows, already known to satisfy a
/// [`QueryFilter`]. Borrowed directly from the chunk's columns, so reading
/// a component here never copies.
pub struct ChunkView<'w> {
    chunk: &'w Chunk,
}

impl<'w> ChunkView<'w> {
    pub fn len(&self) -> usize {
        self.chunk.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entity_slots(&self) -> &'w [u32] {
        self.chunk.entity_slots()
    }

    /// Component column as a typed slice, `len()` elements long.
    pub fn components<T: Copy + 'static>(&self, id: ComponentId) -> &'w [T] {
        bytes_as_slice(self.chunk.component_column(id))
    }

    /// One entity's array contents as a typed slice.
    pub fn array<T: Copy + 'static>(&self, id: ArrayId, row: usize) -> &'w [T] {
        bytes_as_slice(self.chunk.array_cell(id, row))
    }
}

/// A query bound to a `World`: the filter plus the set of archetype
/// indices it currently matches (recomputed fresh each call — spec scope
/// does not include incremental query caching across structural changes).
pub struct Query<'w> {
    world: &'w World,
    filter: QueryFilter,
}

impl<'w> Query<'w> {
    pub fn new(world: &'w World, filter: QueryFilter) -> Self {
        Self { world, filter }
    }

    fn matching_archetypes(&self) -> impl Iterator<Item = &'w ArchetypeTable> {
        self.world
            .archetypes()
            .iter()
            .filter(move |table| self.filter.matches(table.definition()))
    }

    /// Total entity count across every matching archetype.
    pub fn count(&self) -> usize {
        self.matching_archetypes().map(|a| a.entity_count()).sum()
    }

    /// Iterate every matching chunk across every matching archetype, in
    /// archetype order then chunk order. Iteration order is not stable
    /// across structural changes.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkView<'w>> {
        self.matching_archetypes()
            .flat_map(|table| table.chunks().iter().map(|chunk| ChunkView { chunk }))
    }
}

/// Parallel chunk iteration over a query's matches, built on `rayon`.
/// Chunks across different archetypes (and different chunks within one
/// archetype) never alias, so handing each to a worker thread is safe
/// under the single-writer-owns-`World` rule: this type only exists while
/// nothing else holds a `&mut World`.
#[cfg(feature = "parallel")]
pub struct ParQuery<'w> {
    query: Query<'w>,
}

#[cfg(feature = "parallel")]
impl<'w> ParQuery<'w> {
    pub fn new(query: Query<'w>) -> Self {
        Self { query }
    }

    /// Run `func` over every matching chunk, distributing chunks across
    /// rayon's thread pool.
    pub fn for_each_chunk<F>(&self, func: F)
    where
        F: Fn(ChunkView<'w>) + Send + Sync,
    {
        use rayon::prelude::*;

        let chunks: Vec<ChunkView<'w>> = self.query.chunks().collect();
        chunks.into_par_iter().for_each(|view| func(view));
    }
}

impl<'w> Query<'w> {
    #[cfg(feature = "parallel")]
    pub fn par(self) -> ParQuery<'w> {
        ParQuery::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    struct Selected;

    #[test]
    fn include_filter_matches_only_entities_with_the_component() {
        let mut world = World::new();
        let with_pos = world.create_entity();
        world.add_component(with_pos, Position { x: 1.0, y: 1.0 }).unwrap();
        let without_pos = world.create_entity();
        let _ = without_pos;

        let id = world.schema().component_id_of::<Position>().unwrap();
        let filter = QueryFilter::new().with_component(id);
        let query = Query::new(&world, filter);

        assert_eq!(query.count(), 1);
    }

    #[test]
    fn exclude_filter_skips_tagged_entities() {
        let mut world = World::new();
        let plain = world.create_entity();
        world.add_component(plain, Position { x: 0.0, y: 0.0 }).unwrap();
        let selected = world.create_entity();
        world.add_component(selected, Position { x: 0.0, y: 0.0 }).unwrap();
        world.add_tag::<Selected>(selected).unwrap();

        let component = world.schema().component_id_of::<Position>().unwrap();
        let tag = world.schema().tag_id_of::<Selected>().unwrap();
        let filter = QueryFilter::new()
            .with_component(component)
            .without_tag(tag);
        let query = Query::new(&world, filter);

        assert_eq!(query.count(), 1);
    }

    #[test]
    fn chunk_iteration_yields_written_component_values() {
        let mut world = World::new();
        for i in 0..5u32 {
            let e = world.create_entity();
            world
                .add_component(e, Position { x: i as f32, y: 0.0 })
                .unwrap();
        }
        let id = world.schema().component_id_of::<Position>().unwrap();
        let filter = QueryFilter::new().with_component(id);
        let query = Query::new(&world, filter);

        let total: usize = query.chunks().map(|view| view.len()).sum();
        assert_eq!(total, 5);

        let xs: Vec<f32> = query
            .chunks()
            .flat_map(|view| view.components::<Position>(id).iter().map(|p| p.x).collect::<Vec<_>>())
            .collect();
        let mut sorted = xs.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(sorted, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}
