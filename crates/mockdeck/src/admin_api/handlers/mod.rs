pub mod records;
pub mod streams;
pub mod system;
pub mod workspace;
