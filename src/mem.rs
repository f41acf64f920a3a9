//! Link-lifetime memory management.
//!
//! Everything a link invocation produces (interned names, atoms, any
//! per-subsystem bookkeeping) lives in a process-wide arena and dies in one
//! coordinated reset:
//! - `BumpAlloc`: a chunked bump allocator for raw bytes.
//! - `StringSaver`: an interning table over the bump allocator; equal
//!   strings saved within one epoch yield the identical `StrRef`.
//! - `SpecificAlloc<T>`: typed slab allocators registered so their contents
//!   are cleared in lockstep with the arena.
//! - `free_arena()`: resets every registered specific allocator in
//!   registration order, then the bump allocator, and advances the epoch.
//!
//! Nothing here hands out pointers. Allocations return epoch-tagged handles
//! (`ByteRef`, `StrRef`, `Handle<T>`); dereferencing a handle from a
//! previous epoch is a detected error, not silent reuse: `get` panics and
//! `try_get` returns `None`.
//!
//! Allocation calls are internally synchronized and may be issued from
//! parallel parse workers. `free_arena()` is not: it must only run once all
//! consumers of the current epoch are done. Backends enforce this by holding
//! `epoch_lock()` for the whole invocation; hosts driving the arena directly
//! should do the same.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::{fmt, mem};

use once_cell::sync::Lazy;
use parking_lot::{MappedRwLockReadGuard, Mutex, MutexGuard, RwLock, RwLockReadGuard};

use crate::utils::align_up;

const CHUNK_SIZE: usize = 64 * 1024;

static BUMP: Lazy<BumpAlloc> = Lazy::new(BumpAlloc::new);
static SAVER: Lazy<Arc<StringSaver>> = Lazy::new(StringSaver::new_registered);
static INSTANCES: Lazy<Mutex<Vec<Weak<dyn SpecificReset>>>> = Lazy::new(|| Mutex::new(Vec::new()));
static EPOCH_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// The process-wide bump allocator.
pub fn bump() -> &'static BumpAlloc {
    &BUMP
}

/// The process-wide string saver.
pub fn saver() -> &'static StringSaver {
    &SAVER
}

/// The current arena epoch. Advances on every `free_arena()`.
pub fn current_epoch() -> u32 {
    BUMP.epoch.load(Ordering::Relaxed)
}

/// Serializes link epochs within the process.
///
/// A backend holds this lock from its first allocation until after its
/// `free_arena()`, so concurrent `link()` invocations from a long-lived host
/// cannot tear down each other's atoms.
pub fn epoch_lock() -> MutexGuard<'static, ()> {
    EPOCH_LOCK.lock()
}

/// An allocator whose contents must be cleared when the arena resets.
pub trait SpecificReset: Send + Sync {
    fn reset(&self);
}

/// Registers a specific allocator for reset by `free_arena()`.
///
/// The registry holds weak references only; dropped allocators are pruned
/// during teardown. Registration order is reset order.
pub fn register_specific(alloc: &Arc<dyn SpecificReset>) {
    INSTANCES.lock().push(Arc::downgrade(alloc));
}

/// Resets every registered specific allocator, then the bump allocator.
///
/// Every handle issued since the previous reset becomes stale. Callers must
/// guarantee no other thread still dereferences arena-owned data; see
/// `epoch_lock`.
pub fn free_arena() {
    let mut instances = INSTANCES.lock();
    instances.retain(|weak| match weak.upgrade() {
        Some(alloc) => {
            alloc.reset();
            true
        }
        None => false,
    });
    let freed = BUMP.bytes_allocated();
    BUMP.reset();
    tracing::debug!(
        "arena freed: {} bytes, now at epoch {}",
        freed,
        current_epoch()
    );
}

/// A slice of arena-owned bytes, tagged with the epoch that produced it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ByteRef {
    epoch: u32,
    chunk: u32,
    offset: u32,
    len: u32,
}

impl ByteRef {
    pub fn len(self) -> usize {
        self.len as usize
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    pub fn epoch(self) -> u32 {
        self.epoch
    }
}

struct BumpState {
    chunks: Vec<Vec<u8>>,
    allocated: usize,
}

/// A chunked bump allocator.
///
/// Allocation never fails short of the process running out of memory, which
/// is treated as fatal. There is no per-object deallocation; the backing
/// chunks are reclaimed only by `reset` via `free_arena()`. The bump state
/// sits behind a lock, so parallel parse workers may allocate freely.
pub struct BumpAlloc {
    state: RwLock<BumpState>,
    epoch: AtomicU32,
}

impl BumpAlloc {
    fn new() -> Self {
        Self {
            state: RwLock::new(BumpState {
                chunks: Vec::new(),
                allocated: 0,
            }),
            epoch: AtomicU32::new(0),
        }
    }

    /// Allocates `size` zeroed bytes at the given alignment.
    pub fn alloc(&self, size: usize, align: usize) -> ByteRef {
        let mut st = self.state.write();
        let epoch = self.epoch.load(Ordering::Relaxed);
        let (chunk, offset) = Self::grow(&mut st, size, align);
        ByteRef {
            epoch,
            chunk,
            offset,
            len: size as u32,
        }
    }

    /// Copies `data` into the arena.
    pub fn alloc_bytes(&self, data: &[u8]) -> ByteRef {
        let mut st = self.state.write();
        let epoch = self.epoch.load(Ordering::Relaxed);
        let (chunk, offset) = Self::grow(&mut st, data.len(), 1);
        let start = offset as usize;
        st.chunks[chunk as usize][start..start + data.len()].copy_from_slice(data);
        ByteRef {
            epoch,
            chunk,
            offset,
            len: data.len() as u32,
        }
    }

    fn grow(st: &mut BumpState, size: usize, align: usize) -> (u32, u32) {
        st.allocated += size;
        if let Some(last) = st.chunks.last_mut() {
            let start = align_up(last.len(), align);
            if start + size <= last.capacity() {
                last.resize(start + size, 0);
                return ((st.chunks.len() - 1) as u32, start as u32);
            }
        }
        let mut chunk = Vec::with_capacity(CHUNK_SIZE.max(size));
        chunk.resize(size, 0);
        st.chunks.push(chunk);
        ((st.chunks.len() - 1) as u32, 0)
    }

    /// Resolves a reference. Panics if it was issued in a previous epoch.
    pub fn get(&self, r: ByteRef) -> MappedRwLockReadGuard<'_, [u8]> {
        self.try_get(r).unwrap_or_else(|| {
            panic!(
                "stale arena reference: allocated in epoch {}, arena is at epoch {}",
                r.epoch,
                current_epoch()
            )
        })
    }

    /// Resolves a reference, or `None` if it is stale.
    pub fn try_get(&self, r: ByteRef) -> Option<MappedRwLockReadGuard<'_, [u8]>> {
        let st = self.state.read();
        if r.epoch != self.epoch.load(Ordering::Relaxed) {
            return None;
        }
        let chunk = r.chunk as usize;
        let start = r.offset as usize;
        let end = start + r.len as usize;
        if chunk >= st.chunks.len() || end > st.chunks[chunk].len() {
            return None;
        }
        Some(RwLockReadGuard::map(st, move |s| &s.chunks[chunk][start..end]))
    }

    /// Total bytes handed out this epoch.
    pub fn bytes_allocated(&self) -> usize {
        self.state.read().allocated
    }

    fn reset(&self) {
        let mut st = self.state.write();
        st.chunks.clear();
        st.allocated = 0;
        self.epoch.fetch_add(1, Ordering::Relaxed);
    }
}

/// Canonical storage for an interned string.
///
/// Two `save` calls with byte-equal strings in the same epoch return equal
/// `StrRef`s, so name equality is a handle comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StrRef {
    epoch: u32,
    id: u32,
}

impl StrRef {
    pub fn epoch(self) -> u32 {
        self.epoch
    }
}

struct SaverState {
    // hash -> ids of strings with that hash; contents live in the bump arena
    table: HashMap<u64, Vec<u32>>,
    refs: Vec<ByteRef>,
}

/// An interning table over the bump allocator.
///
/// The table itself is epoch-scoped state: it registers with the specific
/// allocator registry so `free_arena()` clears it before the bytes it
/// points into are reclaimed.
pub struct StringSaver {
    state: RwLock<SaverState>,
}

impl StringSaver {
    fn new() -> Self {
        Self {
            state: RwLock::new(SaverState {
                table: HashMap::new(),
                refs: Vec::new(),
            }),
        }
    }

    fn new_registered() -> Arc<Self> {
        let saver = Arc::new(Self::new());
        register_specific(&(saver.clone() as Arc<dyn SpecificReset>));
        saver
    }

    /// Interns `s`, returning its canonical reference for this epoch.
    pub fn save(&self, s: &str) -> StrRef {
        let hash = hash_bytes(s.as_bytes());
        {
            let st = self.state.read();
            if let Some(id) = Self::find(&st, hash, s) {
                return StrRef {
                    epoch: current_epoch(),
                    id,
                };
            }
        }
        let mut st = self.state.write();
        // Racing savers may have inserted it between the locks.
        if let Some(id) = Self::find(&st, hash, s) {
            return StrRef {
                epoch: current_epoch(),
                id,
            };
        }
        let r = bump().alloc_bytes(s.as_bytes());
        let id = st.refs.len() as u32;
        st.refs.push(r);
        st.table.entry(hash).or_default().push(id);
        StrRef {
            epoch: current_epoch(),
            id,
        }
    }

    fn find(st: &SaverState, hash: u64, s: &str) -> Option<u32> {
        for &id in st.table.get(&hash)? {
            let r = st.refs[id as usize];
            if let Some(bytes) = bump().try_get(r) {
                if &*bytes == s.as_bytes() {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Resolves a reference. Panics if it was issued in a previous epoch.
    pub fn get(&self, r: StrRef) -> MappedRwLockReadGuard<'static, str> {
        self.try_get(r).unwrap_or_else(|| {
            panic!(
                "stale string reference: saved in epoch {}, arena is at epoch {}",
                r.epoch,
                current_epoch()
            )
        })
    }

    /// Resolves a reference, or `None` if it is stale.
    pub fn try_get(&self, r: StrRef) -> Option<MappedRwLockReadGuard<'static, str>> {
        if r.epoch != current_epoch() {
            return None;
        }
        let byte_ref = *self.state.read().refs.get(r.id as usize)?;
        let bytes = bump().try_get(byte_ref)?;
        Some(MappedRwLockReadGuard::map(bytes, |b| {
            std::str::from_utf8(b).expect("saver stores utf-8")
        }))
    }

    /// Number of distinct strings saved this epoch.
    pub fn len(&self) -> usize {
        self.state.read().refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpecificReset for StringSaver {
    fn reset(&self) {
        let mut st = self.state.write();
        st.table.clear();
        st.refs.clear();
    }
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// An epoch-tagged index into a `SpecificAlloc<T>` slab.
pub struct Handle<T> {
    epoch: u32,
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn epoch(self) -> u32 {
        self.epoch
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.epoch == other.epoch && self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("epoch", &self.epoch)
            .field("index", &self.index)
            .finish()
    }
}

/// A typed slab whose contents live for one arena epoch.
///
/// Construction registers the slab with the reset registry, so its contents
/// are cleared in lockstep with the bump allocator.
pub struct SpecificAlloc<T> {
    items: RwLock<Vec<T>>,
}

impl<T: Clone + Send + Sync + 'static> SpecificAlloc<T> {
    pub fn new() -> Arc<Self> {
        let alloc = Arc::new(Self {
            items: RwLock::new(Vec::new()),
        });
        register_specific(&(alloc.clone() as Arc<dyn SpecificReset>));
        alloc
    }

    pub fn alloc(&self, value: T) -> Handle<T> {
        let mut items = self.items.write();
        let index = items.len() as u32;
        items.push(value);
        Handle {
            epoch: current_epoch(),
            index,
            _marker: PhantomData,
        }
    }

    /// Copies out the value for `handle`. Panics if the handle is stale.
    pub fn get(&self, handle: Handle<T>) -> T {
        self.try_get(handle).unwrap_or_else(|| {
            panic!(
                "stale arena handle: allocated in epoch {}, arena is at epoch {}",
                handle.epoch,
                current_epoch()
            )
        })
    }

    pub fn try_get(&self, handle: Handle<T>) -> Option<T> {
        if handle.epoch != current_epoch() {
            return None;
        }
        self.items.read().get(handle.index as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send + Sync> SpecificReset for SpecificAlloc<T> {
    fn reset(&self) {
        self.items.write().clear();
    }
}

// Sizes the handles are expected to keep.
const _: () = assert!(mem::size_of::<StrRef>() == 8);
const _: () = assert!(mem::size_of::<Handle<u64>>() == 8);
