// File management module
pub mod json_ops;

pub use json_ops::{
    append_json_record, initialize_json_file, read_json_file, read_json_file_or_default,
    write_json_file,
};
