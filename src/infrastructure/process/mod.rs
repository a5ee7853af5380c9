pub mod runner;

pub use runner::{ProcessError, ProcessOutput, ProcessRunner, ProcessSpec, TokioProcessRunner};
