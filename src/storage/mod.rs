pub mod index;
pub mod row;
pub mod table;
