pub mod frames;
pub mod global_view;
pub mod month;
pub mod region;
pub mod source_kind;
pub mod station;
