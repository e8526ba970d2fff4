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

//! archon_ecs - archetype-based storage core for an Entity Component System.
//!
//! Entities are grouped into [`archetype::ArchetypeTable`]s by their exact
//! [`definition::Definition`] (the set of components, arrays and tags they
//! carry), each table storing its rows in fixed-capacity, column-major
//! [`chunk::Chunk`]s. The [`world::World`] is the single structural-change
//! engine: it owns the [`schema::Schema`] type registry, the
//! [`entity::EntityIndex`] slot allocator, and the archetype tables, and is
//! the only thing that moves an entity between archetypes.

pub mod archetype;
pub mod bitmask;
pub mod chunk;
pub mod concurrency;
pub mod definition;
pub mod entity;
pub mod error;
pub mod query;
pub mod schema;
pub mod serialization;
pub mod world;

pub mod prelude;

pub use archetype::ArchetypeTable;
pub use bitmask::{BitMask, BitMaskIter, BITMASK_CAPACITY};
pub use chunk::{Chunk, CHUNK_CAPACITY};
pub use concurrency::SharedWorld;
pub use definition::{Definition, DefinitionBuilder};
pub use entity::{Entity, EntityIndex, EntityLocation};
pub use error::{EcsError, Result};
pub use query::{ChunkView, Query, QueryFilter};
pub use schema::{ArrayId, ComponentId, Schema, TagId, DISABLED_TAG};
pub use serialization::{deserialize_world, serialize_world, FORMAT_SIGNATURE, FORMAT_VERSION};
pub use world::{MemoryStats, World};

#[cfg(feature = "parallel")]
pub use query::ParQuery;
