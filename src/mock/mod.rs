pub mod definition;
pub mod url;
pub mod variant;
