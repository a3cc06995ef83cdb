//! Browser driver layer
//!
//! Drives a real browser through a WebDriver server for UI-level checks.

mod driver;
mod locator;

pub use driver::{BrowserSession, ElementRef};
pub use locator::{Locator, Selector};

#[cfg(test)]
pub(crate) use driver::test_support;
