//! API implementation submodules.
//!
//! Each submodule contains `impl PartSearch` blocks that extend the public
//! API with one area of functionality. The struct definition remains in
//! `lib.rs`.

mod builder;
mod index;
mod roots;
mod search;

pub use builder::PartSearchBuilder;
pub use roots::RootStatus;
