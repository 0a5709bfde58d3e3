pub mod constants;
pub mod numbering;
pub mod test_helpers;
pub mod types;
pub mod validation;
