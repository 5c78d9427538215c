//! Shared helpers for unit tests. Compiled only under `cfg(test)`.
//!
//! The fake image format used throughout the tests is a one-line header,
//! `IMG <width> <height> <format>`, understood by the mock codec
//! ([`crate::imaging::codec::tests::MockCodec`]). Tests never touch real
//! pixel data except in the production codec's own tests.

use crate::store::{PendingFile, PreviewHandle};
use crate::types::PageId;
use std::cell::Cell;
use std::rc::Rc;

/// Fake image bytes with the given header fields. A `format` of `corrupt`
/// makes the mock codec fail on these bytes.
pub fn fake_image(width: u32, height: u32, format: &str) -> Vec<u8> {
    format!("IMG {width} {height} {format}\n").into_bytes()
}

/// A small pending file with valid fake-image bytes.
pub fn pending(name: &str) -> PendingFile {
    PendingFile {
        name: name.to_string(),
        bytes: fake_image(800, 1200, "jpg"),
    }
}

/// A preview factory whose handles bump a shared counter on release, for
/// asserting release-exactly-once behavior.
pub fn counting_preview() -> (impl Fn(PageId) -> PreviewHandle + 'static, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&count);
    let factory = move |_id: PageId| {
        let counter = Rc::clone(&counter);
        PreviewHandle::new(move || counter.set(counter.get() + 1))
    };
    (factory, count)
}
