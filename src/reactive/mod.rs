//! # Reactive Values
//!
//! A small shared-value substrate: [`SharedValue`] holds a mutable value and notifies
//! subscribers on every assignment, [`DerivedValue`] recomputes a value whenever one of
//! its dependencies changes.
//!
//! ## Usage
//!
//! ```rust
//! use composition_player::reactive::{DerivedValue, SharedValue};
//!
//! let millis = SharedValue::new(1500.0_f64);
//! let source = millis.clone();
//! let seconds = DerivedValue::new(move || source.get() / 1000.0, &[&millis]);
//! assert_eq!(seconds.get(), 1.5);
//!
//! millis.set(2000.0);
//! assert_eq!(seconds.get(), 2.0);
//! ```

pub mod derived;
pub mod shared;
pub mod subscription;

pub use derived::DerivedValue;
pub use shared::SharedValue;
pub use subscription::Subscription;

use std::sync::Arc;

/// Listener invoked when an observable value changes
pub type ChangeNotifier = Arc<dyn Fn() + Send + Sync>;

/// Anything a [`DerivedValue`] can depend on
pub trait Observable: Send + Sync {
    /// Register `listener` to run after every change, until the returned token is dropped
    fn observe(&self, listener: ChangeNotifier) -> Subscription;
}
