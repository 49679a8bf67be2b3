pub mod matcher;
pub mod parser;
pub mod runner;
pub mod store;
pub mod types;
