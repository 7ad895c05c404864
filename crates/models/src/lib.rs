pub mod errors;
pub mod row;
pub mod table;
