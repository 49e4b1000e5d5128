//! Property definitions and normalization of their outcomes.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::PropertyError;
use crate::value::Arguments;

/// Values a property body may return
pub trait Testable {
    /// `Ok(())` when the property holds
    fn outcome(self) -> Result<(), PropertyError>;
}

impl Testable for bool {
    fn outcome(self) -> Result<(), PropertyError> {
        if self {
            Ok(())
        } else {
            Err(PropertyError::Falsified)
        }
    }
}

impl Testable for () {
    fn outcome(self) -> Result<(), PropertyError> {
        Ok(())
    }
}

impl<T: Testable, E: fmt::Display> Testable for Result<T, E> {
    fn outcome(self) -> Result<(), PropertyError> {
        match self {
            Ok(inner) => inner.outcome(),
            Err(error) => Err(PropertyError::raised(error)),
        }
    }
}

/// Type-erased property evaluator
pub type PropertyFn = Arc<dyn Fn(&Arguments) -> Result<(), PropertyError> + Send + Sync>;

/// Erase a property body into a [`PropertyFn`]
pub fn erase<F, R>(property: F) -> PropertyFn
where
    F: Fn(&Arguments) -> R + Send + Sync + 'static,
    R: Testable,
{
    Arc::new(move |args: &Arguments| property(args).outcome())
}

/// Evaluate a property, turning a panic into a failed outcome
pub fn evaluate(property: &PropertyFn, args: &Arguments) -> Result<(), PropertyError> {
    catch_unwind(AssertUnwindSafe(|| property(args)))
        .unwrap_or_else(|payload| Err(PropertyError::from_panic(payload)))
}
