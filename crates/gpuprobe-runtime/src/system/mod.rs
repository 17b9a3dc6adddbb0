//! Host system probing.

mod cpu;

pub use cpu::SysinfoCpuProbe;
