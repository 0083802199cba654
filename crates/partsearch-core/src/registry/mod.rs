//! Root registry: the roots PartSearch knows about.
//!
//! The registry is a small JSON document (`index_roots.json` in the data
//! directory) read by both the indexer and the search fan-in. It is
//! replaced atomically on every write, so concurrent readers always see a
//! complete document.

pub mod root_registry;

pub use root_registry::{IndexRoot, RootRegistry, RootUpdate};
