pub mod detection;
pub mod errors;
pub mod model;
pub mod normalizer;
pub mod record;
pub mod result;
