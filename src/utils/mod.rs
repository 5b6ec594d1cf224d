pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{base_url_of, is_valid_url, screenshot_path};
