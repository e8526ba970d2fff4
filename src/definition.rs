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

//! Definition: the triple of BitMasks describing which component, array
//! and tag ids an entity (or archetype) carries.

use crate::bitmask::BitMask;
use crate::schema::{ArrayId, ComponentId, DISABLED_TAG, Schema, TagId};

/// Triple of BitMasks selecting which component, array and tag ids an
/// entity carries. Two definitions are equal iff all three masks are
/// equal; this is also the archetype lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Definition {
    pub components: BitMask,
    pub arrays: BitMask,
    pub tags: BitMask,
}

impl Definition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, id: ComponentId) -> Self {
        self.components.insert(id.0);
        self
    }

    pub fn with_array(mut self, id: ArrayId) -> Self {
        self.arrays.insert(id.0);
        self
    }

    pub fn with_tag(mut self, id: TagId) -> Self {
        self.tags.insert(id.0);
        self
    }

    pub fn without_component(mut self, id: ComponentId) -> Self {
        self.components.remove(id.0);
        self
    }

    pub fn without_array(mut self, id: ArrayId) -> Self {
        self.arrays.remove(id.0);
        self
    }

    pub fn without_tag(mut self, id: TagId) -> Self {
        self.tags.remove(id.0);
        self
    }

    pub fn has_component(&self, id: ComponentId) -> bool {
        self.components.contains(id.0)
    }

    pub fn has_array(&self, id: ArrayId) -> bool {
        self.arrays.contains(id.0)
    }

    pub fn has_tag(&self, id: TagId) -> bool {
        self.tags.contains(id.0)
    }

    /// Whether the disabled tag is set on this definition.
    pub fn is_disabled(&self) -> bool {
        self.tags.contains(DISABLED_TAG.0)
    }

    /// Fingerprint used to key the archetype lookup table; collisions are
    /// resolved by direct mask comparison (`Definition: Eq`).
    pub fn fingerprint(&self) -> u64 {
        self.components
            .fingerprint()
            .wrapping_mul(3)
            .wrapping_add(self.arrays.fingerprint().wrapping_mul(5))
            .wrapping_add(self.tags.fingerprint().wrapping_mul(7))
    }
}

/// Mutable builder handed to a user-supplied callback so entity "archetype"
/// markers can be declared without a describe-self trait hierarchy:
/// `Archetype::from_builder(schema, |b| { b.component::<Position>(schema); })`.
pub struct DefinitionBuilder<'s> {
    schema: &'s Schema,
    definition: Definition,
}

impl<'s> DefinitionBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            definition: Definition::new(),
        }
    }

    pub fn component<T: 'static>(&mut self) -> &mut Self {
        if let Some(id) = self.schema.component_id_of::<T>() {
            self.definition = self.definition.with_component(id);
        }
        self
    }

    pub fn array<T: 'static>(&mut self) -> &mut Self {
        if let Some(id) = self.schema.array_id_of::<T>() {
            self.definition = self.definition.with_array(id);
        }
        self
    }

    pub fn tag<T: 'static>(&mut self) -> &mut Self {
        if let Some(id) = self.schema.tag_id_of::<T>() {
            self.definition = self.definition.with_tag(id);
        }
        self
    }

    pub fn build(&self) -> Definition {
        self.definition
    }
}

/// Builds a [`Definition`] via a user-supplied callback over a
/// [`DefinitionBuilder`], replacing a describe-self trait hierarchy with a
/// single explicit function.
pub fn describes(schema: &Schema, f: impl FnOnce(&mut DefinitionBuilder<'_>)) -> Definition {
    let mut builder = DefinitionBuilder::new(schema);
    f(&mut builder);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_structural() {
        let mut schema = Schema::new();
        struct A;
        struct B;
        let a = schema.register_component::<A>().unwrap();
        let b = schema.register_component::<B>().unwrap();

        let d1 = Definition::new().with_component(a).with_component(b);
        let d2 = Definition::new().with_component(b).with_component(a);
        assert_eq!(d1, d2);

        let d3 = Definition::new().with_component(a);
        assert_ne!(d1, d3);
    }

    #[test]
    fn disabled_invariant_tracks_reserved_tag() {
        let d = Definition::new();
        assert!(!d.is_disabled());
        let d = d.with_tag(DISABLED_TAG);
        assert!(d.is_disabled());
    }

    #[test]
    fn describes_builder_collects_registered_ids() {
        let mut schema = Schema::new();
        struct Position;
        struct Velocity;
        schema.register_component::<Position>().unwrap();
        schema.register_component::<Velocity>().unwrap();

        let def = describes(&schema, |b| {
            b.component::<Position>().component::<Velocity>();
        });

        assert_eq!(def.components.popcount(), 2);
    }
}
