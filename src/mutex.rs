//! A generic “mutex” trait and implementations for sharing the driver
//! between channel handles.

use core::cell::RefCell;

/// Common interface for mutex-like wrappers.
pub trait PortMutex {
    type Port;

    fn create(port: Self::Port) -> Self;

    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R;
}

/// A simple single-threaded “mutex” using `RefCell`.
///
/// Suitable when all channel handles live in a single execution context.
impl<T> PortMutex for RefCell<T> {
    type Port = T;

    fn create(port: Self::Port) -> Self {
        RefCell::new(port)
    }

    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R {
        let mut borrowed = self.borrow_mut();
        f(&mut borrowed)
    }
}

/// A critical-section based mutex, for sharing channel handles across
/// execution contexts (e.g. interrupt handlers).
#[cfg(feature = "critical-section")]
impl<T> PortMutex for critical_section::Mutex<RefCell<T>> {
    type Port = T;

    fn create(port: Self::Port) -> Self {
        critical_section::Mutex::new(RefCell::new(port))
    }

    fn lock<R, F: FnOnce(&mut Self::Port) -> R>(&self, f: F) -> R {
        critical_section::with(|cs| {
            let mut borrowed = self.borrow_ref_mut(cs);
            f(&mut borrowed)
        })
    }
}
