pub mod process;
pub mod queue;
pub mod storage;
