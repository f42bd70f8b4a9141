pub mod audit;
pub mod board;
pub mod table;
