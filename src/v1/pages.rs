#![forbid(unsafe_code)]

pub mod page_get;
pub mod version;
