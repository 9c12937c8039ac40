//! Shared handles on live objects.
//!
//! The foreground and the render thread each hold a clone of the same
//! [`Shared`]. Whoever holds the lock has the object; the other side waits
//! for at most one mutation or one `update()+render()`.
//!
//! ```text
//!   Shared<Orbiter> ──clone──► Shared<Orbiter> ──into_dyn──► SharedDrawable
//!        │                                                      │
//!   foreground                                          renderer instance list
//!        └──────────────► Arc<Mutex<Orbiter>> ◄─────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::drawable::Drawable;

/// Lock-guarded, reference-counted handle.
///
/// Cloning is cheap (a refcount bump). The lock is `parking_lot`'s, so a
/// panic while it is held does not poison the object: the foreground can
/// still inspect and repair a drawable that crashed the render loop.
pub struct Shared<T: ?Sized> {
    inner: Arc<Mutex<T>>,
}

/// A type-erased drawable handle, as stored by the renderer.
pub type SharedDrawable = Shared<dyn Drawable>;

impl<T> Shared<T> {
    /// Wraps `value` in a new handle.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }
}

impl<T: ?Sized> Shared<T> {
    /// Locks the object, blocking until the other side releases it.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    /// Runs `f` with the object locked and returns its result.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Returns true if both handles point at the same object, whatever
    /// their static types.
    #[must_use]
    pub fn same_object<U: ?Sized>(&self, other: &Shared<U>) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.inner).cast::<()>(),
            Arc::as_ptr(&other.inner).cast::<()>(),
        )
    }

    /// Number of live handles on this object.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T: Drawable + 'static> Shared<T> {
    /// Erases the concrete type so the handle can join a renderer's
    /// instance list. The typed handle it was cloned from stays usable.
    #[must_use]
    pub fn into_dyn(self) -> SharedDrawable {
        let inner: Arc<Mutex<dyn Drawable>> = self.inner;
        Shared { inner }
    }

    /// Type-erased clone of this handle.
    #[must_use]
    pub fn to_dyn(&self) -> SharedDrawable {
        self.clone().into_dyn()
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .field("handles", &self.handle_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DrawResult;
    use crate::surface::Surface;

    #[derive(Default)]
    struct Tally {
        updates: u32,
    }

    impl Drawable for Tally {
        fn update(&mut self) -> DrawResult<()> {
            self.updates += 1;
            Ok(())
        }

        fn render(&mut self, _surface: &mut Surface) -> DrawResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_into_dyn_keeps_typed_handle_live() {
        let typed = Shared::new(Tally::default());
        let erased = typed.to_dyn();

        erased.lock().update().unwrap();
        erased.lock().update().unwrap();

        assert_eq!(typed.lock().updates, 2);
        assert!(typed.same_object(&erased));
        assert_eq!(typed.handle_count(), 2);
    }

    #[test]
    fn test_distinct_objects_differ() {
        let a = Shared::new(Tally::default());
        let b = Shared::new(Tally::default());
        assert!(!a.same_object(&b));
        assert!(a.same_object(&a.clone()));
    }

    #[test]
    fn test_with_returns_value() {
        let t = Shared::new(Tally { updates: 7 });
        assert_eq!(t.with(|t| t.updates * 2), 14);
    }

    #[test]
    fn test_lock_survives_panic() {
        let t = Shared::new(Tally::default());
        let t2 = t.clone();
        let result = std::thread::spawn(move || {
            let _guard = t2.lock();
            panic!("boom");
        })
        .join();
        assert!(result.is_err());
        t.lock().updates = 3;
        assert_eq!(t.lock().updates, 3);
    }
}
