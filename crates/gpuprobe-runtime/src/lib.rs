#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

pub mod process;
pub mod system;

pub use process::TokioCommandRunner;
pub use system::SysinfoCpuProbe;
