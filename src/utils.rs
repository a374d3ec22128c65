#![forbid(unsafe_code)]

pub mod config;
pub mod dictionary;
pub mod errors;
pub mod wp_utils;
