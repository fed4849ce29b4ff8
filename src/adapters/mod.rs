pub mod ntp_client;
pub mod resolver;
pub mod reverse;
