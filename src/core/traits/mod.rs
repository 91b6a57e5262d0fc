pub mod audit;
pub mod crypto;
pub mod key_value;
pub mod sanitizer;
pub mod transport;
