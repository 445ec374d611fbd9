pub mod fetch;
pub mod log;
pub mod validation;
