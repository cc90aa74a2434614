//! Background tasks

pub mod retention;
