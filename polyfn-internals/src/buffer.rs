//! Small-object storage for type-erased targets.
//!
//! A [`Buffer`] is a fixed-size, fixed-alignment block of untyped memory.
//! Depending on the manager bound to the owning vtable, the block holds one
//! of the following:
//!
//! - the target itself, placed at offset 0 (inline storage),
//! - a pointer to a heap record ([`BufferHead::obj_ptr`]),
//! - a heap block descriptor with its byte size ([`BufferHead::heap`]).
//!
//! The buffer never records which of these is active. Only the vtable knows,
//! and only the managers in [`crate::manager`] ever reinterpret the bytes.
//!
//! # Layout invariant
//!
//! Every representation keeps its primary pointer at offset 0 of the buffer.
//! This is checked at compile time at the bottom of this module.

use core::{
    cell::UnsafeCell,
    mem::{MaybeUninit, offset_of, size_of},
};

/// Alignment of every [`Buffer`], and the largest alignment a target may have
/// while still being stored inline or in a trivial heap block.
pub const MAX_ALIGN: usize = 16;

/// Byte pattern written into relocated-from buffers in debug builds.
#[cfg(debug_assertions)]
const POISON: u8 = 0xA5;

/// Untyped small-object storage.
///
/// # Safety
///
/// Implementors must guarantee that:
///
/// 1. `SIZE == size_of::<Self>()` and `SIZE >= size_of::<BufferHead>()`.
/// 2. The alignment of `Self` is exactly [`MAX_ALIGN`].
/// 3. [`Buffer::as_ptr`] returns a pointer to the first byte of `SIZE`
///    contiguous bytes owned by `self` that may be both read and written
///    through, even when only a shared reference to `self` exists.
/// 4. `Self` has no drop glue and no validity requirements on its bytes, so
///    that any byte pattern (including uninitialized memory) is a valid
///    value.
pub unsafe trait Buffer: 'static {
    /// The size of the buffer in bytes.
    const SIZE: usize;

    /// Creates a new buffer with uninitialized contents.
    fn uninit() -> Self;

    /// Returns a pointer to the start of the buffer.
    fn as_ptr(&self) -> *mut u8;
}

/// A [`Buffer`] made of `W` pointer-width words aligned to [`MAX_ALIGN`].
///
/// `W` must be at least 2 so the heap block descriptor fits.
#[repr(C, align(16))]
pub struct InlineBuffer<const W: usize> {
    /// The storage. Wrapped in [`UnsafeCell`] because stored targets may
    /// contain interior mutability and are reached through `&self`.
    words: UnsafeCell<[MaybeUninit<usize>; W]>,
}

/// The buffer used by the provided policies: four pointer widths.
pub type DefaultBuffer = InlineBuffer<4>;

impl<const W: usize> InlineBuffer<W> {
    /// Compile-time check that the head always fits.
    const HEAD_FITS: () = assert!(
        W * size_of::<usize>() >= size_of::<BufferHead>(),
        "an inline buffer needs at least two words"
    );
}

// SAFETY:
// 1. `SIZE` is `size_of::<Self>()`. `HEAD_FITS` is evaluated in `uninit`,
//    which rejects any `W` too small for the head at compile time.
// 2. Guaranteed by `align(16)`, which equals `MAX_ALIGN`.
// 3. The pointer comes from `UnsafeCell::get`, which permits writes through a
//    shared reference, and covers the whole struct because the cell is the
//    only field and sits at offset 0.
// 4. `MaybeUninit<usize>` has neither drop glue nor validity requirements.
unsafe impl<const W: usize> Buffer for InlineBuffer<W> {
    const SIZE: usize = size_of::<Self>();

    #[inline]
    fn uninit() -> Self {
        let () = Self::HEAD_FITS;
        Self {
            words: UnsafeCell::new([MaybeUninit::uninit(); W]),
        }
    }

    #[inline]
    fn as_ptr(&self) -> *mut u8 {
        self.words.get().cast::<u8>()
    }
}

/// A heap block together with its size in bytes.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct HeapBlock {
    /// Start of the block.
    pub(crate) ptr: *mut u8,
    /// Size of the block in bytes, as passed to the allocator.
    pub(crate) size: usize,
}

/// The shape of a method bound to its receiver.
///
/// Never produced at runtime. It exists so the layout assertions below cover
/// the widest pointer pair a buffer head has to accommodate.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct BoundShape {
    /// The method.
    pub(crate) method: fn(),
    /// The receiver.
    pub(crate) object: *mut (),
}

/// Structured view over the first bytes of a [`Buffer`].
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) union BufferHead {
    /// Pointer to a heap record.
    pub(crate) obj_ptr: *mut (),
    /// A plain function pointer.
    pub(crate) func_ptr: fn(),
    /// A heap block with its recorded size.
    pub(crate) heap: HeapBlock,
    /// Bound-method layout.
    pub(crate) bound: BoundShape,
}

impl BufferHead {
    /// Returns a pointer to the head of `buffer`.
    #[inline]
    pub(crate) fn of<B: Buffer>(buffer: &B) -> *mut BufferHead {
        buffer.as_ptr().cast::<BufferHead>()
    }
}

/// Overwrites the first `len` bytes of `buffer` with a recognizable pattern.
///
/// Only does something in debug builds.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `len <= B::SIZE`.
/// 2. No live value is stored in the first `len` bytes of `buffer`.
#[inline]
pub(crate) unsafe fn poison<B: Buffer>(buffer: &mut B, len: usize) {
    #[cfg(debug_assertions)]
    {
        debug_assert!(len <= B::SIZE);
        // SAFETY:
        // 1. The pointer is valid for writes of `B::SIZE` bytes by the safety
        //    invariants of `Buffer`, and `len <= B::SIZE` by the caller.
        // 2. No live value is overwritten, guaranteed by the caller.
        unsafe {
            core::ptr::write_bytes(buffer.as_ptr(), POISON, len);
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (buffer, len);
    }
}

const _: () = {
    assert!(offset_of!(HeapBlock, ptr) == 0);
    assert!(offset_of!(BoundShape, method) == 0);
    assert!(size_of::<BufferHead>() == 2 * size_of::<usize>());
    assert!(size_of::<fn()>() == size_of::<*mut ()>());
    assert!(core::mem::align_of::<BufferHead>() <= MAX_ALIGN);
    assert!(core::mem::align_of::<DefaultBuffer>() == MAX_ALIGN);
};
