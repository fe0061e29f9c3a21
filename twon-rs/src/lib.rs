pub mod cli;
pub mod config;
pub mod console;
pub mod json_store;
pub mod script;
pub mod var;
