pub mod result_store;
pub mod upload_store;
