pub mod file_collection;
pub mod file_filter;

pub use file_collection::{detect_case_insensitive, ExtensionStatistics, FileCollection};
pub use file_filter::{ExtensionParsing, FileFilter};
