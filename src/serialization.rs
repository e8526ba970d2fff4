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

//! Binary world format: a hand-rolled, byte-exact encoding of a `World`'s
//! schema and archetype contents. No `serde`: every field is written and
//! read in a fixed order so the layout is stable across builds of this
//! crate, which is the point of persisting a world at all.
//!
//! Layout:
//!   header:  b"#WORLD" ++ format version (u32 LE)
//!   schema:  component/array/tag counts, row size, a registered-id mask
//!            per id space, then offsets/sizes/hashes for every one of the
//!            256 ids in each space (unregistered ids write as zero)
//!   world:   entity count, archetype count, then per archetype: its
//!            three definition masks, its entity count, every row's
//!            (entity slot, generation), every component column's bytes,
//!            and every array column's per-row (length, bytes)

use crate::bitmask::{BitMask, BITMASK_CAPACITY};
use crate::definition::Definition;
use crate::error::{EcsError, Result};
use crate::schema::{ArrayId, ComponentId, Schema, TagId};
use crate::world::World;

pub const FORMAT_SIGNATURE: &[u8; 6] = b"#WORLD";
pub const FORMAT_VERSION: u32 = 1;

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn mask(&mut self, mask: &BitMask) {
        for word in mask.words() {
            self.buf.extend_from_slice(&word.to_le_bytes());
        }
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(EcsError::SignatureMismatch)?;
        let slice = self.buf.get(self.pos..end).ok_or(EcsError::SignatureMismatch)?;
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn mask(&mut self) -> Result<BitMask> {
        let mut words = [0u64; 4];
        for word in &mut words {
            *word = u64::from_le_bytes(self.take(8)?.try_into().unwrap());
        }
        Ok(BitMask::from_words(words))
    }
}

fn write_schema(w: &mut Writer, schema: &Schema) {
    w.u16(schema.component_count());
    w.u16(schema.array_count());
    w.u16(schema.tag_count());
    w.u32(schema.row_size());

    let registered = |count: u16| -> BitMask {
        let mut mask = BitMask::new();
        for id in 0..count {
            mask.insert(id as u8);
        }
        mask
    };
    w.mask(&registered(schema.component_count()));
    w.mask(&registered(schema.array_count()));
    w.mask(&registered(schema.tag_count()));

    for id in 0..BITMASK_CAPACITY as u16 {
        let offset = if id < schema.component_count() {
            schema.component_offset(ComponentId(id as u8))
        } else {
            0
        };
        w.i32(offset as i32);
    }
    for id in 0..BITMASK_CAPACITY as u16 {
        let size = if id < schema.component_count() {
            schema.component_size(ComponentId(id as u8))
        } else {
            0
        };
        w.i32(size as i32);
    }
    for id in 0..BITMASK_CAPACITY as u16 {
        let stride = if id < schema.array_count() {
            schema.array_stride(ArrayId(id as u8))
        } else {
            0
        };
        w.i32(stride as i32);
    }
    for id in 0..BITMASK_CAPACITY as u16 {
        let hash = if id < schema.component_count() {
            schema.component_hash(ComponentId(id as u8))
        } else {
            0
        };
        w.i64(hash as i64);
    }
    for id in 0..BITMASK_CAPACITY as u16 {
        let hash = if id < schema.array_count() {
            schema.array_hash(ArrayId(id as u8))
        } else {
            0
        };
        w.i64(hash as i64);
    }
    for id in 0..BITMASK_CAPACITY as u16 {
        let hash = if id < schema.tag_count() {
            schema.tag_hash(TagId(id as u8))
        } else {
            0
        };
        w.i64(hash as i64);
    }
}

fn read_schema(r: &mut Reader<'_>) -> Result<Schema> {
    let component_count = r.u16()?;
    let array_count = r.u16()?;
    let tag_count = r.u16()?;
    let row_size = r.u32()?;

    let _components_registered = r.mask()?;
    let _arrays_registered = r.mask()?;
    let _tags_registered = r.mask()?;

    let mut component_offset = [0u32; BITMASK_CAPACITY];
    for slot in component_offset.iter_mut() {
        *slot = r.i32()? as u32;
    }
    let mut component_size = [0u32; BITMASK_CAPACITY];
    for slot in component_size.iter_mut() {
        *slot = r.i32()? as u32;
    }
    let mut array_size = [0u32; BITMASK_CAPACITY];
    for slot in array_size.iter_mut() {
        *slot = r.i32()? as u32;
    }
    let mut component_hash = [0u64; BITMASK_CAPACITY];
    for slot in component_hash.iter_mut() {
        *slot = r.i64()? as u64;
    }
    let mut array_hash = [0u64; BITMASK_CAPACITY];
    for slot in array_hash.iter_mut() {
        *slot = r.i64()? as u64;
    }
    let mut tag_hash = [0u64; BITMASK_CAPACITY];
    for slot in tag_hash.iter_mut() {
        *slot = r.i64()? as u64;
    }

    Ok(Schema::from_raw(
        component_count,
        component_size,
        component_offset,
        component_hash,
        array_count,
        array_size,
        array_hash,
        tag_count,
        tag_hash,
        row_size,
    ))
}

/// Encode `world` into the binary format described at the top of this
/// module.
pub fn serialize_world(world: &World) -> Vec<u8> {
    let mut w = Writer::new();
    w.bytes(FORMAT_SIGNATURE);
    w.u32(FORMAT_VERSION);

    write_schema(&mut w, world.schema());

    w.u32(world.entity_count() as u32);
    w.u32(world.archetype_count() as u32);

    for table in world.archetypes() {
        let definition = table.definition();
        w.mask(&definition.components);
        w.mask(&definition.arrays);
        w.mask(&definition.tags);
        w.u32(table.entity_count() as u32);

        for chunk in table.chunks() {
            for &slot in chunk.entity_slots() {
                w.u32(slot);
                w.u32(world.entity_for_slot(slot).generation);
            }
        }
        for &(id, _stride) in table.component_layout() {
            for chunk in table.chunks() {
                w.bytes(chunk.component_column(id));
            }
        }
        for &(id, _stride) in table.array_layout() {
            for chunk in table.chunks() {
                for row in 0..chunk.row_count() {
                    let bytes = chunk.array_cell(id, row);
                    w.u32(bytes.len() as u32);
                    w.bytes(bytes);
                }
            }
        }
    }

    w.buf
}

/// Decode a [`World`] previously produced by [`serialize_world`]. Every
/// entity is restored at its exact original `(slot, generation)`, so
/// handles captured before a save remain valid (and stale handles still
/// read as stale) after loading. Parent/child links are not part of the
/// wire format and are always empty immediately after a load.
pub fn deserialize_world(bytes: &[u8]) -> Result<World> {
    let mut r = Reader::new(bytes);
    let signature = r.take(FORMAT_SIGNATURE.len())?;
    if signature != FORMAT_SIGNATURE {
        return Err(EcsError::SignatureMismatch);
    }
    let version = r.u32()?;
    if version != FORMAT_VERSION {
        return Err(EcsError::VersionUnsupported(version));
    }

    let schema = read_schema(&mut r)?;
    let mut world = World::new();
    world.replace_schema(schema);

    let _entity_count = r.u32()?;
    let archetype_count = r.u32()?;

    for _ in 0..archetype_count {
        let components = r.mask()?;
        let arrays = r.mask()?;
        let tags = r.mask()?;
        let row_count = r.u32()? as usize;

        let definition = Definition {
            components,
            arrays,
            tags,
        };
        let archetype_index = world.locate_or_create_archetype(definition);

        let mut identities = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            let slot = r.u32()?;
            let generation = r.u32()?;
            identities.push((slot, generation));
        }

        // Rows are placed in file order, each restored at its saved
        // (slot, generation) rather than a freshly allocated one.
        let mut placements = Vec::with_capacity(row_count);
        for (slot, generation) in identities {
            placements.push(world.restore_entity(archetype_index, slot, generation));
        }

        let component_layout: Vec<(ComponentId, usize)> =
            world.archetype_mut(archetype_index).component_layout().to_vec();
        for (id, stride) in component_layout {
            for &(_, chunk_index, row_index) in &placements {
                let src = r.take(stride)?;
                let table = world.archetype_mut(archetype_index);
                let ptr = table.component_ptr(chunk_index, row_index, id);
                unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), ptr, stride) };
            }
        }

        let array_layout: Vec<(ArrayId, usize)> =
            world.archetype_mut(archetype_index).array_layout().to_vec();
        for (id, _stride) in array_layout {
            for &(_, chunk_index, row_index) in &placements {
                let len = r.u32()? as usize;
                let bytes = r.take(len)?.to_vec();
                world
                    .archetype_mut(archetype_index)
                    .set_array_cell(chunk_index, row_index, id, bytes);
            }
        }
    }

    world.finalize_restored_entities();
    Ok(world)
}
