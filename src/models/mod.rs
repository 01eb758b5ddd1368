//! Declaring models in code

pub mod macros;
