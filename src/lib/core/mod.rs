pub mod errors;
pub mod fs;
pub mod io;
pub mod sharded;

pub mod prelude {
    pub use super::errors::{Error, Result};
    pub use super::fs::{is_gzipped, make_parent_dirs};
    pub use super::io::{get_reader, get_tsv_writer, get_writer};
    pub use super::sharded::{is_sharded_file_spec, parse_sharded_file_spec, resolve_filespec};
}
