pub mod armor;
pub mod gpg_provider;
