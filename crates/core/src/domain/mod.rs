pub mod cell;
pub mod item;
pub mod storage;
