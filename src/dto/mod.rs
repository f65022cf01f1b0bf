pub mod fields;
pub mod orders;
pub mod payments;
