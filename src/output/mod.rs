pub mod writer;

pub use writer::{read_json, write_json_atomic};
