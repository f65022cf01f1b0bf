//! Storage access shared by the services. Every function takes any
//! connection or transaction so callers decide the transaction boundary.

pub mod orders;
pub mod payments;
