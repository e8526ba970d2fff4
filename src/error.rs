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

//! Error types

use std::fmt;

use crate::entity::Entity;

/// ECS error type. Structural-change operations are transactional: either
/// they return `Ok` with every index consistent, or they return one of
/// these with the source row untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The entity handle is stale (generation mismatch) or past the end of
    /// the slot table.
    EntityNotFound(Entity),

    /// `remove_component`/`remove_array`/`remove_tag` referred to an id not
    /// present on the entity's definition.
    MissingComponent(Entity, u8),
    MissingArray(Entity, u8),
    MissingTag(Entity, u8),

    /// `add_component`/`add_array`/`add_tag` referred to an id already
    /// present on the entity's definition.
    DuplicateComponent(Entity, u8),
    DuplicateArray(Entity, u8),
    DuplicateTag(Entity, u8),

    /// Schema lookup by type-key found no registration.
    UnknownType,

    /// All ids in one id space (component, array, or tag) are consumed.
    SchemaExhausted,

    /// Deserialized header did not start with the expected `#WORLD` signature.
    SignatureMismatch,

    /// Deserialized header's format version is not supported by this build.
    VersionUnsupported(u32),

    /// `set_parent` would introduce a cycle in the parent/child graph.
    CycleInParentage,

    /// `set_parent`/`children` referenced an entity slot the index has never seen.
    UnknownRelation(Entity),

    /// The backing allocator failed to satisfy a growth request.
    OutOfMemory,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotFound(e) => write!(f, "entity not found: {e:?}"),
            EcsError::MissingComponent(e, id) => {
                write!(f, "entity {e:?} has no component {id}")
            }
            EcsError::MissingArray(e, id) => write!(f, "entity {e:?} has no array {id}"),
            EcsError::MissingTag(e, id) => write!(f, "entity {e:?} has no tag {id}"),
            EcsError::DuplicateComponent(e, id) => {
                write!(f, "entity {e:?} already has component {id}")
            }
            EcsError::DuplicateArray(e, id) => write!(f, "entity {e:?} already has array {id}"),
            EcsError::DuplicateTag(e, id) => write!(f, "entity {e:?} already has tag {id}"),
            EcsError::UnknownType => write!(f, "type was never registered with this schema"),
            EcsError::SchemaExhausted => write!(f, "schema id space exhausted"),
            EcsError::SignatureMismatch => write!(f, "world payload missing #WORLD signature"),
            EcsError::VersionUnsupported(v) => write!(f, "unsupported world format version {v}"),
            EcsError::CycleInParentage => write!(f, "set_parent would introduce a cycle"),
            EcsError::UnknownRelation(e) => write!(f, "unknown relation for entity {e:?}"),
            EcsError::OutOfMemory => write!(f, "allocator failed to grow storage"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EcsError>;
