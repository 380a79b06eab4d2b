pub mod cache;
pub mod database;
pub mod memory;
pub mod repositories;
pub mod search;
pub mod security;
pub mod storage;
