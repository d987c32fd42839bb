pub mod auth_log;

pub use auth_log::{parse_auth_log, parse_line, read_auth_log, AuthLogReader, InputError};
