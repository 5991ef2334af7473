//! Platform descriptions
//!
//! Board initializers populate a [`Repository`](crate::repository::Repository)
//! before it is frozen.

pub mod dcfg;
pub mod lx2160a_rdb;
