pub mod ai;
pub mod config;
pub mod db;
pub mod fetcher;
pub mod host;
pub mod http;
pub mod model;
pub mod slug;
pub mod store;
pub mod sync;
pub mod transform;
