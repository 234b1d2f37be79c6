pub mod classify;
pub mod normalize;
pub mod raw_table;
pub mod utils;

pub use classify::{classify, CodeType};
pub use normalize::{normalize, CodeTable, ExtractedRow, Extraction};
pub use raw_table::RawTable;
