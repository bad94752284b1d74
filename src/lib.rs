//! # gridstitch
//!
//! Split images into grids of equal cells, and stitch image sequences into a
//! single vertical composite. A library plus the `gridstitch` CLI.
//!
//! # Architecture: Two Transformations, Four Drivers
//!
//! Everything reduces to two file-to-file transformations:
//!
//! ```text
//! split    one image   →  rows × cols cell images   (<stem>_1 … <stem>_N)
//! stitch   N ≥ 2 images →  one vertical composite    (stitched_<first stem>)
//! ```
//!
//! Around them sit the drivers that decide *when* they run:
//!
//! - **Batch** ([`batch`]) runs one split per source on the rayon pool and
//!   reports a per-source outcome, so one bad file never stops the others.
//! - **Preview** ([`preview`]) renders a downscaled stitch in memory on a
//!   background thread; a newer request supersedes and cancels older ones.
//! - **Thumbnails** ([`thumbnail`]) computes square thumbnails on a single
//!   worker thread and caches them per source.
//! - **CLI** (`main.rs`) wires all of the above to the filesystem.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`split`] | Grid split of one source into numbered cell files |
//! | [`stitch`] | Vertical composite of two or more sources into one file |
//! | [`preview`] | Cancellable, generation-tagged in-memory stitch previews |
//! | [`thumbnail`] | Background square-thumbnail worker with a per-source cache |
//! | [`batch`] | Parallel split jobs, stitch jobs, outcomes, progress events, selection policy |
//! | [`naming`] | Output file names: cell numbering, stitch extension reconciliation |
//! | [`imaging`] | Geometry, raster operations, EXIF, and the `image`-crate backend |
//! | [`error`] | `ProcessError` and its serializable `ErrorKind` |
//! | [`config`] | `gridstitch.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting: per-job progress and summaries |
//!
//! # Design Decisions
//!
//! ## Backend Trait at the Raster Seam
//!
//! Decoding and encoding go through [`imaging::ImageBackend`]. Geometry and
//! pixel work stay in pure functions over `DynamicImage`, so split, stitch,
//! preview and thumbnail logic is tested against an in-memory mock backend
//! that records every save, with no disk access and no codecs.
//!
//! ## Sources Are Identities, Not Paths
//!
//! A [`imaging::SourceId`] is either a file path or a named byte buffer.
//! Thumbnail caching and preview requests key on it, and output names derive
//! from its stem, so clipboard-style in-memory images behave like files.
//!
//! ## Preview Generations
//!
//! Every preview request gets a strictly increasing generation. Results from
//! anything but the latest generation are discarded, never delivered, so a
//! slow early render can never overwrite a newer one.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate with Lanczos3 resampling. No
//! system libraries, no external processes.

pub mod batch;
pub mod config;
pub mod error;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod preview;
pub mod split;
pub mod stitch;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod test_helpers;
