//! docanon — reversible document anonymization.
//!
//! Identified values are substituted with stable, human-readable tags
//! (`NOM1`, `TEL2`, ...) and can later be restored from the returned
//! tag-to-value mapping. Page-based documents are rewritten in place: each
//! positioned text run is erased and redrawn with a matching base-14 font,
//! fitted into the original bounding box.
//!
//! Library layout:
//! - `entity`, `tags`, `mapping`: input records, tag allocation, the
//!   tag/value store shared between both phases
//! - `anonymizer`, `deanonymizer`: the substitution and restoration engines
//! - `page`, `fonts`, `metrics`, `fit`, `rewrite`: the in-place,
//!   format-preserving page rewriting layer
//! - `pdf`, `docx`, `convert`: container adapters and the external
//!   office-conversion fallback chain
//!
//! Binaries:
//! - `pdf-anon`: anonymize/deanonymize PDF files
//! - `docx-anon`: anonymize/deanonymize DOCX files
//! - `text-anon`: anonymize/deanonymize plain text

pub mod anonymizer;
pub mod convert;
pub mod deanonymizer;
pub mod docx;
pub mod entity;
pub mod error;
pub mod fit;
pub mod fonts;
pub mod mapping;
pub mod metrics;
pub mod page;
pub mod pdf;
pub mod rewrite;
pub mod tags;

pub use anonymizer::{AnonymizeOptions, AnonymizeSession};
pub use deanonymizer::Deanonymizer;
pub use entity::TierRecord;
pub use error::{Error, Result, ValidationError};
pub use mapping::Mapping;
pub use rewrite::{PageRewriter, RewriteReport};
