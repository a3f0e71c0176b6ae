//! Route modules.

pub mod items;
