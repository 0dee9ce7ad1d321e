pub mod block_codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod store;
