use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::{fmt, mem, ptr};

use log::*;

use crate::api::*;
use crate::cu::CUData;
use crate::def::*;

/// An analog to a Box<[T]> where the underlying slice is aligned.
/// Alignment is according to the architecture-specific SIMD constraints.
pub struct AlignedBoxedSlice<T> {
    ptr: ptr::NonNull<T>,
    len: usize,
}

impl<T> AlignedBoxedSlice<T> {
    // Data alignment in bytes.
    cfg_if::cfg_if! {
      if #[cfg(target_arch = "wasm32")] {
        const DATA_ALIGNMENT_LOG2: usize = 3;
      } else {
        const DATA_ALIGNMENT_LOG2: usize = 5;
      }
    }

    fn layout(len: usize) -> Layout {
        let align = std::cmp::max(1 << Self::DATA_ALIGNMENT_LOG2, mem::align_of::<T>());
        // len is bounded by the CU pool sizes, far from overflowing isize
        unsafe { Layout::from_size_align_unchecked(len * mem::size_of::<T>(), align) }
    }
}

impl<T: Copy> AlignedBoxedSlice<T> {
    /// Creates a ['AlignedBoxedSlice'] with a slice of length ['len'] filled with
    /// ['val'].
    pub fn new(len: usize, val: T) -> Self {
        let mut output = Self::zeroed(len);
        for a in output.iter_mut() {
            *a = val;
        }
        output
    }

    /// Only for plain integer element types, where all-zero bytes is a value.
    pub(crate) fn zeroed(len: usize) -> Self {
        if len == 0 || mem::size_of::<T>() == 0 {
            return Self::default();
        }

        let layout = Self::layout(len);
        let raw = unsafe { alloc_zeroed(layout) } as *mut T;
        match ptr::NonNull::new(raw) {
            Some(ptr) => Self { ptr, len },
            None => handle_alloc_error(layout),
        }
    }
}

impl<T> Default for AlignedBoxedSlice<T> {
    fn default() -> Self {
        Self {
            ptr: ptr::NonNull::dangling(),
            len: 0,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AlignedBoxedSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T> std::ops::Deref for AlignedBoxedSlice<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> std::ops::DerefMut for AlignedBoxedSlice<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> std::ops::Drop for AlignedBoxedSlice<T> {
    fn drop(&mut self) {
        if self.len == 0 || mem::size_of::<T>() == 0 {
            return;
        }
        // T: Copy on every constructor, so there is nothing to drop in place
        unsafe {
            dealloc(self.ptr.as_ptr() as *mut u8, Self::layout(self.len));
        }
    }
}

unsafe impl<T> Send for AlignedBoxedSlice<T> where T: Send {}
unsafe impl<T> Sync for AlignedBoxedSlice<T> where T: Sync {}

/*****************************************************************************
 * CU instance pool
 *****************************************************************************/

/// A fixed set of CU data instances for one quadtree depth. Every instance
/// owns a private attribute slab sized for that depth, so instances handed
/// to concurrent workers never alias.
pub struct CUDataMemPool {
    pub depth: usize,
    pub num_partitions: usize,
    instances: Vec<CUData>,
}

impl CUDataMemPool {
    pub fn new(depth: usize, csp: ChromaSampling, num_instances: usize) -> Self {
        debug_assert!(depth + MIN_LOG2_CU_SIZE <= MAX_LOG2_CU_SIZE);

        let num_partitions = NUM_CU_PARTITIONS >> (depth * 2);
        let cu_size = MAX_CU_SIZE >> depth;

        let instances = (0..num_instances)
            .map(|_| {
                let mut cu = CUData::default();
                cu.initialize(num_partitions, cu_size, csp);
                cu
            })
            .collect();

        debug!(
            "CU pool depth {}: {} instances of {} units, {} bytes each",
            depth,
            num_instances,
            num_partitions,
            num_partitions * BYTES_PER_PARTITION
        );

        CUDataMemPool {
            depth,
            num_partitions,
            instances,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, index: usize) -> &CUData {
        &self.instances[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut CUData {
        &mut self.instances[index]
    }

    /// Splits the pool into disjoint instances, one per worker.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CUData> {
        self.instances.iter_mut()
    }
}
