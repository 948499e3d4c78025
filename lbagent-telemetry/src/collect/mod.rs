//! Kernel statistics collectors.

pub mod cpu;
