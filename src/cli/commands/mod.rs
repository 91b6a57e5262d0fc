pub mod audit_helpers;
pub mod backup;
pub mod fetch;
pub mod identity;
pub mod init;
pub mod keys;
pub mod log;
pub mod offers;
pub mod read;
pub mod send;
pub mod session;
pub mod watch;
