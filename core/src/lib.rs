pub mod catalog;
pub mod db;
pub mod export;
pub mod legacy;
pub mod merge;
pub mod models;
pub mod service;
