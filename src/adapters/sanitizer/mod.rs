pub mod tag_allowlist;
