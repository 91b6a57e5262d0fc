pub mod armored_block;
pub mod audit_entry;
pub mod backup;
pub mod compose;
pub mod fingerprint;
pub mod key_record;
pub mod pgp;
pub mod render_item;
