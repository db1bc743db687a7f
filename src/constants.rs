//! Application constants and configuration

pub const DEFAULT_API_BASE_URL: &str = "https://jsonplaceholder.typicode.com";
pub const API_URL_ENV: &str = "USER_MANAGER_API_URL";
pub const USERS_PATH: &str = "users";
pub const APP_NAME: &str = "User Manager";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
