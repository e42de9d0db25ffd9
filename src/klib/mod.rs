//! Utilitários Internos do Kernel.

pub mod align;
