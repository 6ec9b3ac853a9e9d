pub mod credential;
pub mod firebase_sink;
pub mod service_account;
