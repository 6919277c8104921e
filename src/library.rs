//! Track records and the metadata collaborator that produces them.
//!
//! `scan` walks a folder, `from_paths` takes explicit files; both read tags
//! with lofty and fall back to filename heuristics so a load never fails.

mod filename;
mod model;
mod scan;

pub use model::{CoverArt, Track, file_type_for};
pub use scan::{from_paths, read_track, scan};
