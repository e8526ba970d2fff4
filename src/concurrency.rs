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

//! Multi-threaded embedding of a [`World`]: single-writer-owns-world, with
//! parallel read-only queries permitted across chunks while no writer
//! holds the lock.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::world::World;

/// `Arc<RwLock<World>>` with named accessors. One writer lock covers the
/// entire entity index and archetype table set — there is no finer-grained
/// locking, by design: structural changes touch the entity index and
/// potentially two archetypes at once, so anything less than a whole-world
/// write lock would need its own conflict detection.
#[derive(Clone)]
pub struct SharedWorld {
    inner: Arc<RwLock<World>>,
}

impl SharedWorld {
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(RwLock::new(world)),
        }
    }

    /// Acquire the write lock for a structural change or component write.
    pub fn write(&self) -> RwLockWriteGuard<'_, World> {
        self.inner.write()
    }

    /// Acquire a read lock for queries. Multiple readers may hold this
    /// concurrently; `rayon`-parallel query iteration under the `parallel`
    /// feature runs entirely within one such guard's lifetime.
    pub fn read(&self) -> RwLockReadGuard<'_, World> {
        self.inner.read()
    }

    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, World>> {
        self.inner.try_write()
    }

    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, World>> {
        self.inner.try_read()
    }
}

impl Default for SharedWorld {
    fn default() -> Self {
        Self::new(World::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_sees_the_change() {
        let shared = SharedWorld::new(World::new());
        let entity = {
            let mut world = shared.write();
            world.create_entity()
        };
        let world = shared.read();
        assert!(world.is_alive(entity));
    }

    #[test]
    fn concurrent_reads_do_not_block_each_other() {
        let shared = SharedWorld::new(World::new());
        let r1 = shared.read();
        let r2 = shared.read();
        assert_eq!(r1.entity_count(), r2.entity_count());
    }
}
