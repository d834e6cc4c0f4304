// Opaque handle types and the monotonic allocator shared by one registry.
// Handles are non-zero and never reused by the allocator that issued them.
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct ContextHandle(NonZeroU64);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct ComponentHandle(NonZeroU64);

macro_rules! raw_handle {
    ($ty:ident, $what:literal) => {
        impl $ty {
            pub fn from_raw(raw: u64) -> Result<Self, Error> {
                NonZeroU64::new(raw).map(Self).ok_or_else(|| {
                    Error::new(ErrorKind::InvalidHandle).with_message(concat!($what, " is null"))
                })
            }

            pub fn to_raw(self) -> u64 {
                self.0.get()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $what, self.0)
            }
        }
    };
}

raw_handle!(ContextHandle, "context");
raw_handle!(ComponentHandle, "component");

#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    fn next_raw(&self) -> NonZeroU64 {
        let raw = self.next.fetch_add(1, Ordering::Relaxed);
        // Wrapping would need 2^64 allocations; treat it as unreachable.
        NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN)
    }

    pub fn next_context(&self) -> ContextHandle {
        ContextHandle(self.next_raw())
    }

    pub fn next_component(&self) -> ComponentHandle {
        ComponentHandle(self.next_raw())
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentHandle, ContextHandle, HandleAllocator};
    use crate::core::error::ErrorKind;

    #[test]
    fn handles_are_unique_and_increasing() {
        let ids = HandleAllocator::new();
        let a = ids.next_context();
        let b = ids.next_component();
        let c = ids.next_component();
        assert!(a.to_raw() < b.to_raw());
        assert!(b < c);
    }

    #[test]
    fn zero_is_the_null_handle() {
        let err = ContextHandle::from_raw(0).expect_err("null");
        assert_eq!(err.kind(), ErrorKind::InvalidHandle);
        let handle = ComponentHandle::from_raw(42).expect("non-null");
        assert_eq!(handle.to_raw(), 42);
        assert_eq!(handle.to_string(), "component#42");
    }
}
