//! A native host and serializer in one shared library.
//!
//! Integration tests build this crate and load it through `hostlink-host`
//! exactly as a real host would be loaded. It declares the installer's five
//! types plus two of its own: `Fixture.Counted`, whose live instances are
//! reported by [`hostlink_fixture_live_counted`], and `Fixture.Sealed`, which
//! cannot be constructed.
//!
//! The default serializer options (`ConfigJsonSettings`) write `$type` tags
//! and indent; `JsonSerializerSettings_new` gives untagged compact options.

mod catalog;
mod host;
mod node;
mod serializer;

use std::sync::atomic::Ordering;

#[unsafe(no_mangle)]
pub extern "C" fn hostlink_fixture_live_counted() -> usize {
    node::LIVE_COUNTED.load(Ordering::SeqCst)
}
