pub mod attribution;
pub mod config;
pub mod db;
pub mod harvest;
pub mod model;
pub mod source;
pub mod store;
pub mod vocabulary;
