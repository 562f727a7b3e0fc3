pub mod label;
pub mod split;
