// Copyright 2025 eraflo
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

//! A fixed-capacity, block-based object pool with stable slots.
//!
//! Items live in blocks of `N` slots. Blocks are appended when every existing
//! block is full and are only torn down with the pool, so a slot never moves
//! while a handle refers to it. Handles hold a counted reference to the pool
//! core rather than a raw address; once the owning [`ObjectPool`] is dropped
//! every slot is cleared and outstanding handles observe an empty slot.
//!
//! Allocation is expected from the main or asset thread. Releasing a handle
//! is allowed from any thread.

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Slots per block when no block size is given.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// The position of an item: block number and slot inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex {
    /// Index of the block in allocation order.
    pub block: u32,
    /// Index of the slot inside the block.
    pub slot: u32,
}

/// Per-block bookkeeping, guarded by the block lock.
///
/// Lock order is slot then block state. The state lock is never held while
/// waiting on a slot, so callbacks reading a slot may call back into the pool.
struct BlockState {
    live: Vec<bool>,
    /// Lowest free slot, or the block size when the block is full.
    first_free: usize,
    live_count: usize,
}

struct PoolBlock<T> {
    index: u32,
    slots: Box<[RwLock<Option<T>>]>,
    state: Mutex<BlockState>,
}

impl<T> PoolBlock<T> {
    fn new(index: u32, size: usize) -> Self {
        Self {
            index,
            slots: (0..size).map(|_| RwLock::new(None)).collect(),
            state: Mutex::new(BlockState {
                live: vec![false; size],
                first_free: 0,
                live_count: 0,
            }),
        }
    }

    /// Claims the lowest free slot and constructs `value` in it.
    /// Gives the value back if the block is full.
    fn try_place(&self, value: T) -> Result<u32, T> {
        let mut state = self.state.lock();
        let slot = state.first_free;
        if slot >= self.slots.len() {
            return Err(value);
        }
        state.live[slot] = true;
        state.live_count += 1;
        state.first_free = state.live[slot + 1..]
            .iter()
            .position(|live| !live)
            .map_or(self.slots.len(), |p| slot + 1 + p);
        drop(state);
        // The slot is claimed and no handle to it exists yet.
        *self.slots[slot].write() = Some(value);
        Ok(slot as u32)
    }

    /// Destroys the item in `slot` if it is still live.
    ///
    /// Liveness is checked under the block lock, so racing releases of the
    /// same slot destroy the item exactly once.
    fn release(&self, slot: u32) -> bool {
        let slot = slot as usize;
        let Some(cell) = self.slots.get(slot) else {
            return false;
        };
        let taken = {
            // Holding the slot keeps the freed index from being refilled
            // before the old item is out.
            let mut item = cell.write();
            {
                let mut state = self.state.lock();
                if !state.live[slot] {
                    return false;
                }
                state.live[slot] = false;
                state.live_count -= 1;
                if slot < state.first_free {
                    state.first_free = slot;
                }
            }
            item.take()
        };
        // Run the destructor outside every lock.
        drop(taken);
        true
    }

    fn has_free_space(&self) -> bool {
        self.state.lock().first_free < self.slots.len()
    }

    fn next_live(&self, from: usize) -> Option<u32> {
        let state = self.state.lock();
        state
            .live
            .iter()
            .skip(from)
            .position(|live| *live)
            .map(|p| (from + p) as u32)
    }

    /// Destroys every live item. Only called once no allocation can race it.
    fn clear(&self) -> Vec<T> {
        let live: Vec<usize> = {
            let mut state = self.state.lock();
            let live = state
                .live
                .iter()
                .enumerate()
                .filter_map(|(slot, live)| live.then_some(slot))
                .collect();
            state.live.iter_mut().for_each(|live| *live = false);
            state.live_count = 0;
            state.first_free = 0;
            live
        };
        live.into_iter()
            .filter_map(|slot| self.slots[slot].write().take())
            .collect()
    }
}

/// State shared between a pool and every handle it produced.
struct PoolCore<T> {
    label: String,
    block_size: usize,
    blocks: RwLock<Vec<Arc<PoolBlock<T>>>>,
    alive: AtomicBool,
}

impl<T> PoolCore<T> {
    fn place(&self, value: T) -> (Arc<PoolBlock<T>>, u32) {
        let mut value = value;
        {
            let blocks = self.blocks.read();
            for block in blocks.iter() {
                match block.try_place(value) {
                    Ok(slot) => return (Arc::clone(block), slot),
                    Err(v) => value = v,
                }
            }
        }

        let mut blocks = self.blocks.write();
        // Another allocator may have appended a block or freed a slot meanwhile.
        for block in blocks.iter() {
            match block.try_place(value) {
                Ok(slot) => return (Arc::clone(block), slot),
                Err(v) => value = v,
            }
        }

        let block = Arc::new(PoolBlock::new(blocks.len() as u32, self.block_size));
        log::debug!(
            "ObjectPool({}): appending block {} ({} slots)",
            self.label,
            block.index,
            self.block_size
        );
        blocks.push(Arc::clone(&block));
        match block.try_place(value) {
            Ok(slot) => (block, slot),
            Err(_) => unreachable!("a fresh block always has a free slot"),
        }
    }

    fn block(&self, index: u32) -> Option<Arc<PoolBlock<T>>> {
        self.blocks.read().get(index as usize).cloned()
    }
}

/// A fixed-capacity object pool made of blocks of `N` slots.
///
/// Dropping the pool destroys every remaining item; handles that outlive it
/// see their slot as empty and release into nothing.
pub struct ObjectPool<T, const N: usize = DEFAULT_BLOCK_SIZE> {
    core: Arc<PoolCore<T>>,
}

impl<T, const N: usize> ObjectPool<T, N> {
    /// Creates an empty pool. No block is allocated until the first item.
    pub fn new(label: &str) -> Self {
        assert!(N > 0, "ObjectPool block size must be non-zero");
        Self {
            core: Arc::new(PoolCore {
                label: label.to_owned(),
                block_size: N,
                blocks: RwLock::new(Vec::new()),
                alive: AtomicBool::new(true),
            }),
        }
    }

    /// Constructs `value` in the first free slot and returns its unique owner.
    pub fn allocate_unique(&self, value: T) -> PoolHandle<T> {
        let (block, slot) = self.core.place(value);
        PoolHandle {
            core: Arc::clone(&self.core),
            block,
            slot,
        }
    }

    /// Constructs `value` in the first free slot and returns a shared owner.
    /// The item is destroyed when the last clone is dropped.
    pub fn allocate_shared(&self, value: T) -> SharedPoolHandle<T> {
        SharedPoolHandle {
            inner: Arc::new(self.allocate_unique(value)),
        }
    }

    /// Returns `true` if some existing block can take an item without growing.
    pub fn has_free_space(&self) -> bool {
        self.core.blocks.read().iter().any(|b| b.has_free_space())
    }

    /// Number of blocks allocated so far.
    pub fn block_count(&self) -> usize {
        self.core.blocks.read().len()
    }

    /// Number of live items across all blocks.
    pub fn len(&self) -> usize {
        self.core
            .blocks
            .read()
            .iter()
            .map(|b| b.state.lock().live_count)
            .sum()
    }

    /// Returns `true` if the pool holds no live item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first live slot, for scanning all items.
    pub fn begin(&self) -> Option<SlotIndex> {
        self.scan_from(0, 0)
    }

    /// The live slot following `index`, skipping dead slots.
    pub fn next(&self, index: SlotIndex) -> Option<SlotIndex> {
        self.scan_from(index.block, index.slot as usize + 1)
    }

    fn scan_from(&self, block: u32, slot: usize) -> Option<SlotIndex> {
        let blocks = self.core.blocks.read();
        let mut from = slot;
        for b in blocks.iter().skip(block as usize) {
            if let Some(slot) = b.next_live(from) {
                return Some(SlotIndex {
                    block: b.index,
                    slot,
                });
            }
            from = 0;
        }
        None
    }

    /// Runs `f` on the item at `index`, if it is live.
    pub fn inspect<R>(&self, index: SlotIndex, f: impl FnOnce(&T) -> R) -> Option<R> {
        let block = self.core.block(index.block)?;
        let slot = block.slots.get(index.slot as usize)?.read();
        slot.as_ref().map(f)
    }

    /// Calls `f` on every live item in slot order.
    pub fn for_each_live(&self, mut f: impl FnMut(SlotIndex, &T)) {
        let mut cursor = self.begin();
        while let Some(index) = cursor {
            self.inspect(index, |item| f(index, item));
            cursor = self.next(index);
        }
    }
}

impl<T, const N: usize> Drop for ObjectPool<T, N> {
    fn drop(&mut self) {
        self.core.alive.store(false, Ordering::Release);
        let blocks: Vec<_> = self.core.blocks.read().iter().cloned().collect();
        let mut destroyed = 0;
        for block in blocks {
            destroyed += block.clear().len();
        }
        if destroyed > 0 {
            log::debug!(
                "ObjectPool({}): destroyed {destroyed} items still alive at teardown",
                self.core.label
            );
        }
    }
}

impl<T, const N: usize> fmt::Debug for ObjectPool<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("label", &self.core.label)
            .field("block_size", &N)
            .field("blocks", &self.block_count())
            .finish()
    }
}

/// The unique owner of a pooled item. Dropping it destroys the item and
/// returns the slot to its block.
pub struct PoolHandle<T> {
    core: Arc<PoolCore<T>>,
    block: Arc<PoolBlock<T>>,
    slot: u32,
}

impl<T> PoolHandle<T> {
    /// Where the item lives.
    pub fn index(&self) -> SlotIndex {
        SlotIndex {
            block: self.block.index,
            slot: self.slot,
        }
    }

    /// Returns `true` while the pool is alive and the item has not been destroyed.
    pub fn is_alive(&self) -> bool {
        self.core.alive.load(Ordering::Acquire)
            && self.block.state.lock().live[self.slot as usize]
    }

    /// Read access to the item, or `None` once the pool has been torn down.
    pub fn get(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.block.slots[self.slot as usize].read(), |item| {
            item.as_ref()
        })
        .ok()
    }

    /// Write access to the item, or `None` once the pool has been torn down.
    pub fn get_mut(&mut self) -> Option<MappedRwLockWriteGuard<'_, T>> {
        RwLockWriteGuard::try_map(self.block.slots[self.slot as usize].write(), |item| {
            item.as_mut()
        })
        .ok()
    }
}

impl<T> Drop for PoolHandle<T> {
    fn drop(&mut self) {
        if self.core.alive.load(Ordering::Acquire) {
            self.block.release(self.slot);
        }
    }
}

impl<T> fmt::Debug for PoolHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle")
            .field("pool", &self.core.label)
            .field("index", &self.index())
            .finish()
    }
}

/// A reference-counted owner of a pooled item.
pub struct SharedPoolHandle<T> {
    inner: Arc<PoolHandle<T>>,
}

impl<T> SharedPoolHandle<T> {
    /// Where the item lives.
    pub fn index(&self) -> SlotIndex {
        self.inner.index()
    }

    /// Read access to the item, or `None` once the pool has been torn down.
    pub fn get(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        self.inner.get()
    }

    /// Returns `true` while the item is alive.
    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    /// Number of shared owners.
    pub fn owner_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Returns `true` if both handles own the same item.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for SharedPoolHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for SharedPoolHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPoolHandle")
            .field("pool", &self.inner.core.label)
            .field("index", &self.index())
            .field("owners", &self.owner_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    struct Counted {
        value: u32,
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Counted {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn allocation_fills_lowest_free_slot_first() {
        let pool: ObjectPool<u32, 4> = ObjectPool::new("test");
        let a = pool.allocate_unique(1);
        let b = pool.allocate_unique(2);
        let c = pool.allocate_unique(3);
        assert_eq!(b.index(), SlotIndex { block: 0, slot: 1 });

        drop(b);
        let d = pool.allocate_unique(4);
        assert_eq!(d.index(), SlotIndex { block: 0, slot: 1 });
        assert_eq!(*d.get().unwrap(), 4);
        drop((a, c));
    }

    #[test]
    fn blocks_are_appended_when_full() {
        let pool: ObjectPool<u32, 2> = ObjectPool::new("test");
        let handles: Vec<_> = (0..5).map(|i| pool.allocate_unique(i)).collect();
        assert_eq!(pool.block_count(), 3);
        assert_eq!(handles[4].index(), SlotIndex { block: 2, slot: 0 });
        assert!(pool.has_free_space());
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn slot_addresses_are_stable_across_growth() {
        let pool: ObjectPool<[u64; 4], 2> = ObjectPool::new("test");
        let first = pool.allocate_unique([7; 4]);
        let before = &*first.get().unwrap() as *const [u64; 4];
        let others: Vec<_> = (0..64).map(|i| pool.allocate_unique([i; 4])).collect();
        let after = &*first.get().unwrap() as *const [u64; 4];
        assert_eq!(before, after);
        assert_eq!(*first.get().unwrap(), [7; 4]);
        assert_eq!(others.len(), 64);
    }

    #[test]
    fn handles_get_mut_updates_in_place() {
        let pool: ObjectPool<String> = ObjectPool::new("test");
        let mut handle = pool.allocate_unique("a".to_owned());
        handle.get_mut().unwrap().push('b');
        assert_eq!(&*handle.get().unwrap(), "ab");
    }

    #[test]
    fn double_release_destroys_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let pool: ObjectPool<Counted, 4> = ObjectPool::new("test");
        let handle = pool.allocate_unique(Counted {
            value: 1,
            drops: Arc::clone(&drops),
        });
        let block = Arc::clone(&handle.block);
        assert!(block.release(handle.slot));
        assert!(!block.release(handle.slot));
        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_release_of_shared_handle_destroys_once() {
        for _ in 0..50 {
            let drops = Arc::new(AtomicUsize::new(0));
            let pool: ObjectPool<Counted, 4> = ObjectPool::new("test");
            let shared = pool.allocate_shared(Counted {
                value: 9,
                drops: Arc::clone(&drops),
            });
            let clones: Vec<_> = (0..2).map(|_| shared.clone()).collect();
            drop(shared);

            let threads: Vec<_> = clones
                .into_iter()
                .map(|handle| {
                    thread::spawn(move || {
                        assert_eq!(handle.get().map(|c| c.value), Some(9));
                        drop(handle);
                    })
                })
                .collect();
            for t in threads {
                t.join().unwrap();
            }
            assert_eq!(drops.load(Ordering::SeqCst), 1);
            assert!(pool.is_empty());
        }
    }

    #[test]
    fn live_handles_never_alias_under_threads() {
        let pool: Arc<ObjectPool<usize, 8>> = Arc::new(ObjectPool::new("test"));
        let (tx, rx) = std::sync::mpsc::channel();

        let threads: Vec<_> = (0..4)
            .map(|t| {
                let pool = Arc::clone(&pool);
                let tx = tx.clone();
                thread::spawn(move || {
                    let mut kept = Vec::new();
                    for i in 0..200 {
                        let handle = pool.allocate_unique(t * 1000 + i);
                        if i % 3 == 0 {
                            kept.push(handle);
                        }
                    }
                    tx.send(kept).unwrap();
                })
            })
            .collect();
        drop(tx);
        for t in threads {
            t.join().unwrap();
        }

        let live: Vec<PoolHandle<usize>> = rx.into_iter().flatten().collect();
        let indices: HashSet<_> = live.iter().map(|h| h.index()).collect();
        assert_eq!(indices.len(), live.len());
        for handle in &live {
            let value = *handle.get().unwrap();
            assert_eq!(value % 1000 % 3, 0);
        }
        assert_eq!(pool.len(), live.len());
    }

    #[test]
    fn iteration_skips_dead_slots() {
        let pool: ObjectPool<u32, 2> = ObjectPool::new("test");
        let handles: Vec<_> = (0..5).map(|i| pool.allocate_unique(i)).collect();
        let mut handles = handles.into_iter();
        let h0 = handles.next().unwrap();
        let h1 = handles.next().unwrap();
        let h2 = handles.next().unwrap();
        let h3 = handles.next().unwrap();
        let h4 = handles.next().unwrap();
        drop(h1);
        drop(h3);

        let mut seen = Vec::new();
        pool.for_each_live(|_, v| seen.push(*v));
        assert_eq!(seen, vec![0, 2, 4]);

        let first = pool.begin().unwrap();
        assert_eq!(first, SlotIndex { block: 0, slot: 0 });
        let second = pool.next(first).unwrap();
        assert_eq!(second, SlotIndex { block: 1, slot: 0 });
        drop((h0, h2, h4));
        assert!(pool.begin().is_none());
    }

    #[test]
    fn releasing_an_item_being_inspected_waits_for_the_reader() {
        let pool: Arc<ObjectPool<u32, 4>> = Arc::new(ObjectPool::new("test"));
        let handle = pool.allocate_unique(7);
        let index = handle.index();
        let (inside_tx, inside_rx) = std::sync::mpsc::channel();
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        let reader = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let seen = pool.inspect(index, |value| {
                    inside_tx.send(()).unwrap();
                    // Let the release queue up behind this reader.
                    thread::sleep(std::time::Duration::from_millis(50));
                    (*value, pool.len())
                });
                done_tx.send(seen).unwrap();
            })
        };
        let releaser = thread::spawn(move || {
            inside_rx.recv().unwrap();
            drop(handle);
        });

        let seen = done_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("the reader and the release deadlocked");
        assert_eq!(seen, Some((7, 1)));
        reader.join().unwrap();
        releaser.join().unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn handles_outliving_the_pool_are_inert() {
        let drops = Arc::new(AtomicUsize::new(0));
        let pool: ObjectPool<Counted, 4> = ObjectPool::new("test");
        let handle = pool.allocate_unique(Counted {
            value: 3,
            drops: Arc::clone(&drops),
        });
        drop(pool);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!handle.is_alive());
        assert!(handle.get().is_none());
        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
