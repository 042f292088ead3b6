pub mod normalizer;
pub mod spreadsheet;

pub use normalizer::{AliasTable, Field, RowNormalizer};
pub use spreadsheet::{assign_ids, read_path, read_upload, SheetFormat};
