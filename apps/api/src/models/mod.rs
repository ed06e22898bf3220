pub mod document;
pub mod suggestion;
pub mod variant;
