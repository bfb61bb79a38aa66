//! Pipeline stages for image-to-PDF conversion.
//!
//! Each submodule implements exactly one step. Only [`layout`] does real
//! geometry; the other stages move bytes around it.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ load ──▶ layout ──▶ assemble
//! (path/URL)  (measure)  (pure)    (printpdf)
//! ```
//!
//! 1. [`input`]: turn a path, URL or `data:` URI into an `ImageSource`
//! 2. [`load`]: reject non-image batches up front, then measure every
//!    image concurrently on the blocking pool; all or nothing
//! 3. [`layout`]: scale every image to the usable width and stack them;
//!    synchronous and side-effect free
//! 4. [`assemble`]: feed placements to a `DocumentAssembler` in input order,
//!    reporting progress after each one

pub mod assemble;
pub mod input;
pub mod layout;
pub mod load;
