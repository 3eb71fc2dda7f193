//! dupfind: find duplicate files by size, then content hash, and log, move
//! or remove the surplus copies.

pub mod catalog;
pub mod config;
pub mod disposition;
pub mod driver;
pub mod error;
pub mod hash;
pub mod logging;
pub mod matcher;
pub mod report;
pub mod resolver;
pub mod types;
