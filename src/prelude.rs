//! Convenient re-exports of commonly used types.
//!
//! ```
//! use archon_ecs::prelude::*;
//! ```

pub use crate::archetype::ArchetypeTable;
pub use crate::bitmask::BitMask;
pub use crate::chunk::{Chunk, CHUNK_CAPACITY};
pub use crate::concurrency::SharedWorld;
pub use crate::definition::{Definition, DefinitionBuilder};
pub use crate::entity::{Entity, EntityIndex};
pub use crate::error::{EcsError, Result};
pub use crate::query::{ChunkView, Query, QueryFilter};
pub use crate::schema::{ArrayId, ComponentId, Schema, TagId};
pub use crate::serialization::{deserialize_world, serialize_world};
pub use crate::world::World;

#[cfg(feature = "parallel")]
pub use crate::query::ParQuery;
