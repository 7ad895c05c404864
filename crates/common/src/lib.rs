pub mod bytes;
pub mod utils;
