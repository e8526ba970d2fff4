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

//! Entity identifiers, the slot/generation index, and the intrusive
//! parent/child sibling lists that live alongside each slot.

use crate::error::{EcsError, Result};

/// Entity location in archetype storage: which archetype, which chunk
/// within it, and which row within that chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_index: usize,
    pub chunk_index: usize,
    pub row_index: usize,
}

/// Handle to a logical object: a dense slot index paired with a generation
/// counter that invalidates stale handles after destruction.
///
/// `Entity::NULL` (slot 0, generation 0) is reserved and never resolves:
/// slot 0 is burned at index-creation time and is never handed out by
/// [`EntityIndex::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub slot: u32,
    pub generation: u32,
}

impl Entity {
    pub const NULL: Entity = Entity {
        slot: 0,
        generation: 0,
    };

    #[inline]
    pub fn is_null(&self) -> bool {
        self.slot == 0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Entity::NULL
    }
}

/// Per-slot bookkeeping: storage location plus the intrusive doubly-linked
/// sibling list used for parent/child relationships. Keeping family
/// membership here avoids any per-entity heap allocation (no `Vec<Entity>`
/// of children).
#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    location: Option<EntityLocation>,
    parent: Option<Entity>,
    child_count: u32,
    first_child: Option<Entity>,
    next_sibling: Option<Entity>,
    prev_sibling: Option<Entity>,
}

impl Slot {
    fn dead(generation: u32) -> Self {
        Self {
            generation,
            location: None,
            parent: None,
            child_count: 0,
            first_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// Slot/generation allocator plus the `(archetype, row)` reverse map and
/// hierarchy links. The single free-standing subsystem described in
/// spec §4.6: every structural-change operation in `World` goes through
/// here to resolve, allocate, or retire a slot.
#[derive(Debug, Default)]
pub struct EntityIndex {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
}

impl EntityIndex {
    pub fn new() -> Self {
        // Slot 0 is burned up front: it is never pushed onto the free
        // list, so `Entity { slot: 0, .. }` can never compare alive.
        Self {
            slots: vec![Slot::dead(0)],
            free_list: Vec::new(),
        }
    }

    /// Allocate a fresh slot (reusing the free list if non-empty) with no
    /// storage location yet assigned.
    pub fn allocate(&mut self) -> Entity {
        if let Some(slot_id) = self.free_list.pop() {
            let slot = &mut self.slots[slot_id as usize];
            Entity {
                slot: slot_id,
                generation: slot.generation,
            }
        } else {
            let slot_id = self.slots.len() as u32;
            self.slots.push(Slot::dead(1));
            Entity {
                slot: slot_id,
                generation: 1,
            }
        }
    }

    #[inline]
    fn slot(&self, entity: Entity) -> Result<&Slot> {
        if entity.is_null() {
            return Err(EcsError::EntityNotFound(entity));
        }
        match self.slots.get(entity.slot as usize) {
            Some(slot) if slot.generation == entity.generation && slot.location.is_some() => {
                Ok(slot)
            }
            _ => Err(EcsError::EntityNotFound(entity)),
        }
    }

    #[inline]
    fn slot_mut(&mut self, entity: Entity) -> Result<&mut Slot> {
        if entity.is_null() {
            return Err(EcsError::EntityNotFound(entity));
        }
        match self.slots.get_mut(entity.slot as usize) {
            Some(slot) if slot.generation == entity.generation && slot.location.is_some() => {
                Ok(slot)
            }
            _ => Err(EcsError::EntityNotFound(entity)),
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slot(entity).is_ok()
    }

    /// Reconstruct a full `Entity` handle from a bare slot id, using that
    /// slot's current generation. Chunks only store slot ids in their
    /// entity column; archetype move/swap-remove fixups resolve the
    /// generation back from here.
    pub fn entity_for_slot(&self, slot: u32) -> Entity {
        Entity {
            slot,
            generation: self.slots[slot as usize].generation,
        }
    }

    /// Place an entity at an exact `(slot, generation)`, bypassing the
    /// free-list allocator. Used only by the binary deserializer, which
    /// must reproduce every live entity's original handle rather than
    /// hand out fresh ones. Grows the slot table with placeholder dead
    /// slots (generation 1, matching a freshly-pushed slot's starting
    /// generation) to reach `slot` if needed; `rebuild_free_list` must be
    /// called once every row has been restored so those placeholders
    /// become available for future allocation.
    pub(crate) fn restore_at(&mut self, slot: u32, generation: u32, location: EntityLocation) -> Entity {
        let slot_usize = slot as usize;
        if slot_usize >= self.slots.len() {
            self.slots.resize(slot_usize + 1, Slot::dead(1));
        }
        self.slots[slot_usize] = Slot {
            generation,
            location: Some(location),
            parent: None,
            child_count: 0,
            first_child: None,
            next_sibling: None,
            prev_sibling: None,
        };
        Entity { slot, generation }
    }

    /// Rebuild the free list from scratch by scanning for slots with no
    /// location. Called once after `restore_at` has placed every row of a
    /// deserialized world, since gap-fill placeholders (and any slot
    /// ranges the save never touched) aren't pushed onto the free list as
    /// they're created.
    pub(crate) fn rebuild_free_list(&mut self) {
        self.free_list.clear();
        for (idx, slot) in self.slots.iter().enumerate().skip(1) {
            if slot.location.is_none() && slot.generation != 0 {
                self.free_list.push(idx as u32);
            }
        }
    }

    pub fn location(&self, entity: Entity) -> Result<EntityLocation> {
        self.slot(entity).map(|s| s.location.unwrap())
    }

    pub fn set_location(&mut self, entity: Entity, location: EntityLocation) -> Result<()> {
        self.slot_mut(entity)?.location = Some(location);
        Ok(())
    }

    /// Mark the slot as occupied at `location` without requiring a prior
    /// alive check; used by `create_entity` right after `allocate`.
    pub fn activate(&mut self, entity: Entity, location: EntityLocation) {
        let slot = &mut self.slots[entity.slot as usize];
        slot.location = Some(location);
    }

    /// Fix up the chunk/row of an entity whose archetype didn't change but
    /// whose storage position did (swap-remove fallout).
    pub fn set_row(&mut self, entity: Entity, chunk_index: usize, row_index: usize) -> Result<()> {
        let slot = self.slot_mut(entity)?;
        let mut loc = slot.location.unwrap();
        loc.chunk_index = chunk_index;
        loc.row_index = row_index;
        slot.location = Some(loc);
        Ok(())
    }

    /// Retire a slot: detach it from its family, bump its generation, and
    /// push it onto the free list.
    pub fn retire(&mut self, entity: Entity) -> Result<EntityLocation> {
        self.unlink_from_parent(entity)?;

        // Re-parent any children to nobody (spec leaves orphan policy to the
        // caller; World::destroy recurses into children before calling this).
        let slot = self.slot_mut(entity)?;
        let location = slot.location.take().unwrap();
        slot.generation = slot.generation.wrapping_add(1);
        slot.parent = None;
        slot.first_child = None;
        slot.next_sibling = None;
        slot.prev_sibling = None;
        slot.child_count = 0;

        // Never recycle slot 0, and never reuse a slot whose generation
        // wrapped back to 0 (that would make it indistinguishable from the
        // permanently-burned slot 0's dead generation).
        if entity.slot != 0 && self.slots[entity.slot as usize].generation != 0 {
            self.free_list.push(entity.slot);
        }

        Ok(location)
    }

    pub fn parent(&self, entity: Entity) -> Result<Option<Entity>> {
        Ok(self.slot(entity)?.parent)
    }

    pub fn child_count(&self, entity: Entity) -> Result<u32> {
        Ok(self.slot(entity)?.child_count)
    }

    pub fn first_child(&self, entity: Entity) -> Result<Option<Entity>> {
        Ok(self.slot(entity)?.first_child)
    }

    pub fn next_sibling(&self, entity: Entity) -> Result<Option<Entity>> {
        Ok(self.slot(entity)?.next_sibling)
    }

    /// All descendants-free children of `entity`, head-to-tail (most
    /// recently attached first, since attachment inserts at the list head).
    pub fn children(&self, entity: Entity) -> Result<Vec<Entity>> {
        let anchor = self.slot(entity)?;
        let mut out = Vec::with_capacity(anchor.child_count as usize);
        let mut cursor = anchor.first_child;
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.slot(child)?.next_sibling;
        }
        Ok(out)
    }

    /// Detach `entity` from its current parent's sibling list, if any.
    /// Restores the `prev_sibling == None <=> slot == parent.first_child`
    /// invariant on the remaining siblings.
    fn unlink_from_parent(&mut self, entity: Entity) -> Result<()> {
        let (parent, prev, next) = {
            let slot = self.slot(entity)?;
            (slot.parent, slot.prev_sibling, slot.next_sibling)
        };

        if let Some(prev) = prev {
            if let Ok(prev_slot) = self.slot_mut(prev) {
                prev_slot.next_sibling = next;
            }
        } else if let Some(parent) = parent {
            if let Ok(parent_slot) = self.slot_mut(parent) {
                parent_slot.first_child = next;
            }
        }

        if let Some(next) = next {
            if let Ok(next_slot) = self.slot_mut(next) {
                next_slot.prev_sibling = prev;
            }
        }

        if let Some(parent) = parent {
            if let Ok(parent_slot) = self.slot_mut(parent) {
                parent_slot.child_count = parent_slot.child_count.saturating_sub(1);
            }
        }

        let slot = self.slot_mut(entity)?;
        slot.parent = None;
        slot.prev_sibling = None;
        slot.next_sibling = None;
        Ok(())
    }

    /// Whether `ancestor` is `descendant` or one of its ancestors — used to
    /// reject cycles before `set_parent` links anything.
    pub fn is_ancestor_of(&self, ancestor: Entity, descendant: Entity) -> Result<bool> {
        let mut cursor = Some(descendant);
        while let Some(current) = cursor {
            if current == ancestor {
                return Ok(true);
            }
            cursor = self.slot(current)?.parent;
        }
        Ok(false)
    }

    /// Detach `child` from its current parent (if any) and insert it at the
    /// head of `new_parent`'s child list. Rejects cycles.
    pub fn set_parent(&mut self, child: Entity, new_parent: Option<Entity>) -> Result<()> {
        self.slot(child)?;
        if let Some(new_parent) = new_parent {
            self.slot(new_parent)?;
            if new_parent == child || self.is_ancestor_of(child, new_parent)? {
                return Err(EcsError::CycleInParentage);
            }
        }

        self.unlink_from_parent(child)?;

        if let Some(new_parent) = new_parent {
            let old_head = self.slot(new_parent)?.first_child;

            {
                let child_slot = self.slot_mut(child)?;
                child_slot.parent = Some(new_parent);
                child_slot.prev_sibling = None;
                child_slot.next_sibling = old_head;
            }
            if let Some(old_head) = old_head {
                self.slot_mut(old_head)?.prev_sibling = Some(child);
            }
            let parent_slot = self.slot_mut(new_parent)?;
            parent_slot.first_child = Some(child);
            parent_slot.child_count += 1;
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_entity_never_resolves() {
        let index = EntityIndex::new();
        assert!(!index.is_alive(Entity::NULL));
    }

    #[test]
    fn allocate_activate_is_alive() {
        let mut index = EntityIndex::new();
        let e = index.allocate();
        assert!(!index.is_alive(e)); // not yet activated
        index.activate(
            e,
            EntityLocation {
                archetype_index: 0,
                chunk_index: 0,
                row_index: 0,
            },
        );
        assert!(index.is_alive(e));
    }

    #[test]
    fn retire_bumps_generation_and_invalidates_old_handle() {
        let mut index = EntityIndex::new();
        let e = index.allocate();
        index.activate(
            e,
            EntityLocation {
                archetype_index: 0,
                chunk_index: 0,
                row_index: 0,
            },
        );
        index.retire(e).unwrap();
        assert!(!index.is_alive(e));

        let reused = index.allocate();
        assert_eq!(reused.slot, e.slot);
        assert_eq!(reused.generation, e.generation + 1);
    }

    fn spawn_active(index: &mut EntityIndex) -> Entity {
        let e = index.allocate();
        index.activate(
            e,
            EntityLocation {
                archetype_index: 0,
                chunk_index: 0,
                row_index: 0,
            },
        );
        e
    }

    #[test]
    fn children_iterate_head_insertion_order() {
        let mut index = EntityIndex::new();
        let p = spawn_active(&mut index);
        let c1 = spawn_active(&mut index);
        let c2 = spawn_active(&mut index);
        let c3 = spawn_active(&mut index);

        index.set_parent(c1, Some(p)).unwrap();
        index.set_parent(c2, Some(p)).unwrap();
        index.set_parent(c3, Some(p)).unwrap();

        assert_eq!(index.children(p).unwrap(), vec![c3, c2, c1]);
    }

    #[test]
    fn reparenting_moves_child_and_updates_both_lists() {
        let mut index = EntityIndex::new();
        let p = spawn_active(&mut index);
        let c1 = spawn_active(&mut index);
        let c2 = spawn_active(&mut index);
        let c3 = spawn_active(&mut index);

        index.set_parent(c1, Some(p)).unwrap();
        index.set_parent(c2, Some(p)).unwrap();
        index.set_parent(c3, Some(p)).unwrap();

        index.set_parent(c2, Some(c3)).unwrap();

        assert_eq!(index.children(p).unwrap(), vec![c3, c1]);
        assert_eq!(index.children(c3).unwrap(), vec![c2]);
    }

    #[test]
    fn restore_at_reproduces_the_exact_handle_and_fills_the_free_list() {
        let mut index = EntityIndex::new();
        let location = EntityLocation {
            archetype_index: 0,
            chunk_index: 0,
            row_index: 0,
        };

        let restored = index.restore_at(3, 2, location);
        assert_eq!(restored, Entity { slot: 3, generation: 2 });
        assert!(index.is_alive(restored));

        // Slots 1 and 2 were gap-filled dead placeholders; they should be
        // reusable once the free list is rebuilt.
        index.rebuild_free_list();
        let next = index.allocate();
        assert!(next.slot == 1 || next.slot == 2);
    }

    #[test]
    fn set_parent_rejects_cycle() {
        let mut index = EntityIndex::new();
        let a = spawn_active(&mut index);
        let b = spawn_active(&mut index);
        index.set_parent(b, Some(a)).unwrap();

        let err = index.set_parent(a, Some(b)).unwrap_err();
        assert_eq!(err, EcsError::CycleInParentage);
    }
}
