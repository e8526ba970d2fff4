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

//! Schema: the process-scoped registry that assigns dense ids to
//! component, array-element, and tag types and records their sizes and
//! row offsets.

use std::any::TypeId;
use std::mem::size_of;

use rustc_hash::FxHashMap;

use crate::bitmask::BITMASK_CAPACITY;
use crate::error::{EcsError, Result};

/// Id of a registered component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub u8);

/// Id of a registered array-element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayId(pub u8);

/// Id of a registered tag type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagId(pub u8);

/// Reserved tag id that marks the disabled state. In-range (not carved out
/// of the 256-slot id space) and never handed out by [`Schema::register_tag`].
pub const DISABLED_TAG: TagId = TagId(255);

/// Stable 64-bit fingerprint of `T`'s name, computed with FNV-1a over
/// [`std::any::type_name`]. Unlike `TypeId`, whose internal bits are not
/// guaranteed stable across compilations, this value is what two schemas
/// compare by when deciding "same type" across a serialize/deserialize
/// round trip.
fn stable_type_hash<T: 'static>() -> u64 {
    let name = std::any::type_name::<T>();
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in name.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[derive(Clone)]
struct Kind {
    count: u16,
    size: [u32; BITMASK_CAPACITY],
    hash: [u64; BITMASK_CAPACITY],
    key_to_id: FxHashMap<TypeId, u8>,
}

impl Kind {
    fn new() -> Self {
        Self {
            count: 0,
            size: [0; BITMASK_CAPACITY],
            hash: [0; BITMASK_CAPACITY],
            key_to_id: FxHashMap::default(),
        }
    }

    fn clear(&mut self) {
        self.count = 0;
        self.size = [0; BITMASK_CAPACITY];
        self.hash = [0; BITMASK_CAPACITY];
        self.key_to_id.clear();
    }
}

/// Process-scoped registry translating user types to dense ids and
/// reporting their sizes, row offsets, and stable hashes.
///
/// State machine: `Fresh -> Populated -> (Cleared -> Populated)*`.
#[derive(Clone)]
pub struct Schema {
    components: Kind,
    arrays: Kind,
    tags: Kind,
    component_offset: [u32; BITMASK_CAPACITY],
    row_size: u32,
}

impl Schema {
    pub fn new() -> Self {
        Self {
            components: Kind::new(),
            arrays: Kind::new(),
            tags: Kind::new(),
            component_offset: [0; BITMASK_CAPACITY],
            row_size: 0,
        }
    }

    /// Idempotent by type: re-registering a known type returns the existing
    /// id without mutating size/offset/hash.
    pub fn register_component<T: 'static>(&mut self) -> Result<ComponentId> {
        let key = TypeId::of::<T>();
        if let Some(&id) = self.components.key_to_id.get(&key) {
            return Ok(ComponentId(id));
        }
        // Tag space reserves id 255 (DISABLED_TAG); components have the
        // full range but still top out at BITMASK_CAPACITY - 1 to match
        // the uniform "one id space exhausted" failure mode.
        if self.components.count as usize >= BITMASK_CAPACITY - 1 {
            return Err(EcsError::SchemaExhausted);
        }
        let id = self.components.count as u8;
        let size = size_of::<T>() as u32;
        self.components.size[id as usize] = size;
        self.components.hash[id as usize] = stable_type_hash::<T>();
        self.component_offset[id as usize] = self.row_size;
        self.row_size += size;
        self.components.key_to_id.insert(key, id);
        self.components.count += 1;
        Ok(ComponentId(id))
    }

    pub fn register_array<T: 'static>(&mut self) -> Result<ArrayId> {
        let key = TypeId::of::<T>();
        if let Some(&id) = self.arrays.key_to_id.get(&key) {
            return Ok(ArrayId(id));
        }
        if self.arrays.count as usize >= BITMASK_CAPACITY - 1 {
            return Err(EcsError::SchemaExhausted);
        }
        let id = self.arrays.count as u8;
        self.arrays.size[id as usize] = size_of::<T>() as u32;
        self.arrays.hash[id as usize] = stable_type_hash::<T>();
        self.arrays.key_to_id.insert(key, id);
        self.arrays.count += 1;
        Ok(ArrayId(id))
    }

    pub fn register_tag<T: 'static>(&mut self) -> Result<TagId> {
        let key = TypeId::of::<T>();
        if let Some(&id) = self.tags.key_to_id.get(&key) {
            return Ok(TagId(id));
        }
        // Tags carry size 0 and reserve id 255 for the built-in disabled tag.
        if self.tags.count as usize >= (BITMASK_CAPACITY - 1) {
            return Err(EcsError::SchemaExhausted);
        }
        let id = self.tags.count as u8;
        self.tags.hash[id as usize] = stable_type_hash::<T>();
        self.tags.key_to_id.insert(key, id);
        self.tags.count += 1;
        Ok(TagId(id))
    }

    /// Resolve `T` to its id by stable hash rather than `TypeId`, binding
    /// the two together in this schema's lookup table on success. The path
    /// a freshly deserialized schema must take to recover typed access: its
    /// `key_to_id` maps start out empty (no `TypeId` survives the wire),
    /// but `hash`/`size`/`offset` did, so the first call from each live
    /// type re-establishes the binding.
    pub fn resolve_component<T: 'static>(&mut self) -> Option<ComponentId> {
        let key = TypeId::of::<T>();
        if let Some(&id) = self.components.key_to_id.get(&key) {
            return Some(ComponentId(id));
        }
        let hash = stable_type_hash::<T>();
        for id in 0..self.components.count {
            if self.components.hash[id as usize] == hash {
                self.components.key_to_id.insert(key, id as u8);
                return Some(ComponentId(id as u8));
            }
        }
        None
    }

    pub fn resolve_array<T: 'static>(&mut self) -> Option<ArrayId> {
        let key = TypeId::of::<T>();
        if let Some(&id) = self.arrays.key_to_id.get(&key) {
            return Some(ArrayId(id));
        }
        let hash = stable_type_hash::<T>();
        for id in 0..self.arrays.count {
            if self.arrays.hash[id as usize] == hash {
                self.arrays.key_to_id.insert(key, id as u8);
                return Some(ArrayId(id as u8));
            }
        }
        None
    }

    pub fn resolve_tag<T: 'static>(&mut self) -> Option<TagId> {
        let key = TypeId::of::<T>();
        if let Some(&id) = self.tags.key_to_id.get(&key) {
            return Some(TagId(id));
        }
        let hash = stable_type_hash::<T>();
        for id in 0..self.tags.count {
            if self.tags.hash[id as usize] == hash {
                self.tags.key_to_id.insert(key, id as u8);
                return Some(TagId(id as u8));
            }
        }
        None
    }

    /// Rebuild a schema from a deserialized wire payload. The result has
    /// every size/offset/hash slot populated but an empty `TypeId` table;
    /// callers re-establish typed access via [`Schema::resolve_component`]
    /// and friends.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_raw(
        component_count: u16,
        component_size: [u32; BITMASK_CAPACITY],
        component_offset: [u32; BITMASK_CAPACITY],
        component_hash: [u64; BITMASK_CAPACITY],
        array_count: u16,
        array_size: [u32; BITMASK_CAPACITY],
        array_hash: [u64; BITMASK_CAPACITY],
        tag_count: u16,
        tag_hash: [u64; BITMASK_CAPACITY],
        row_size: u32,
    ) -> Self {
        let mut components = Kind::new();
        components.count = component_count;
        components.size = component_size;
        components.hash = component_hash;

        let mut arrays = Kind::new();
        arrays.count = array_count;
        arrays.size = array_size;
        arrays.hash = array_hash;

        let mut tags = Kind::new();
        tags.count = tag_count;
        tags.hash = tag_hash;

        Self {
            components,
            arrays,
            tags,
            component_offset,
            row_size,
        }
    }

    pub fn component_id_of<T: 'static>(&self) -> Option<ComponentId> {
        self.components
            .key_to_id
            .get(&TypeId::of::<T>())
            .map(|&id| ComponentId(id))
    }

    pub fn array_id_of<T: 'static>(&self) -> Option<ArrayId> {
        self.arrays
            .key_to_id
            .get(&TypeId::of::<T>())
            .map(|&id| ArrayId(id))
    }

    pub fn tag_id_of<T: 'static>(&self) -> Option<TagId> {
        self.tags
            .key_to_id
            .get(&TypeId::of::<T>())
            .map(|&id| TagId(id))
    }

    pub fn component_size(&self, id: ComponentId) -> u32 {
        self.components.size[id.0 as usize]
    }

    pub fn component_offset(&self, id: ComponentId) -> u32 {
        self.component_offset[id.0 as usize]
    }

    pub fn component_hash(&self, id: ComponentId) -> u64 {
        self.components.hash[id.0 as usize]
    }

    pub fn array_stride(&self, id: ArrayId) -> u32 {
        self.arrays.size[id.0 as usize]
    }

    pub fn array_hash(&self, id: ArrayId) -> u64 {
        self.arrays.hash[id.0 as usize]
    }

    pub fn tag_hash(&self, id: TagId) -> u64 {
        self.tags.hash[id.0 as usize]
    }

    pub fn component_count(&self) -> u16 {
        self.components.count
    }

    pub fn array_count(&self) -> u16 {
        self.arrays.count
    }

    pub fn tag_count(&self) -> u16 {
        self.tags.count
    }

    /// Total packed-row size, the sum of every registered component's size
    /// in registration order. Monotonically non-decreasing.
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Bulk-replace this schema's state with `other`'s, used when loading
    /// a persisted world (the embedded schema payload becomes the live one).
    pub fn copy_from(&mut self, other: &Schema) {
        *self = other.clone();
    }

    /// Reset to the `Fresh` state. The next registration starts id
    /// assignment over from zero.
    pub fn clear(&mut self) {
        self.components.clear();
        self.arrays.clear();
        self.tags.clear();
        self.component_offset = [0; BITMASK_CAPACITY];
        self.row_size = 0;
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.components.count == other.components.count
            && self.arrays.count == other.arrays.count
            && self.tags.count == other.tags.count
            && self.components.size[..self.components.count as usize]
                == other.components.size[..other.components.count as usize]
            && self.component_offset[..self.components.count as usize]
                == other.component_offset[..other.components.count as usize]
            && self.components.hash[..self.components.count as usize]
                == other.components.hash[..other.components.count as usize]
            && self.arrays.size[..self.arrays.count as usize]
                == other.arrays.size[..other.arrays.count as usize]
            && self.arrays.hash[..self.arrays.count as usize]
                == other.arrays.hash[..other.arrays.count as usize]
            && self.tags.hash[..self.tags.count as usize]
                == other.tags.hash[..other.tags.count as usize]
    }
}
