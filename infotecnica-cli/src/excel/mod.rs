//! Spreadsheet input and output

pub mod reader;
pub mod writer;

pub use reader::{read_all_sheets, read_first_sheet, read_sheet, sheet_names};
pub use writer::{new_report_path, write_partitioned, write_sheets, write_table};
