//! Access-path selection and the grouping stage of SELECT.

pub mod access;
pub mod aggregate;
