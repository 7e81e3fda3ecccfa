//! Club info records stored in the guild store.
//!
//! Admins upload a small text file (markdown or YAML) per topic; it is
//! kept as a JSON-encoded [`ClubRecord`] under the lowercased topic name.

pub mod card;
pub mod record;

pub use card::{Card, CardField};
pub use record::{ClubRecord, LastUpdated, RecordKind, UploadLimits};
