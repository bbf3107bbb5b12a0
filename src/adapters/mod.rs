pub mod http;
pub mod inference;
pub mod render;
pub mod storage;
