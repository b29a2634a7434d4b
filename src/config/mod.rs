pub mod address;
pub mod settings;
