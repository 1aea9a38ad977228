pub mod config;
pub mod datetime;
pub mod dialogue;
pub mod error;
pub mod model;
pub mod storage;
pub mod webhook;
