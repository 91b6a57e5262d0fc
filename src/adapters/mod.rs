pub mod audit;
pub mod crypto;
pub mod sanitizer;
pub mod storage;
pub mod transport;
