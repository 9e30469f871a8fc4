pub mod admin_token;
pub mod config;
pub mod http;
pub mod oplog;
pub mod smt;
pub mod version;
pub mod yast;
