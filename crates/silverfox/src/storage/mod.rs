pub mod filesystem;

pub use filesystem::{archive_file, move_file, BatchFolders, OrderStorage};
