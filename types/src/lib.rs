pub mod checkpoint;
pub mod consts;
pub mod containers;
pub mod primitives;
pub mod summaries;
