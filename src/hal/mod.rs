//! # HAL — Interfaces de Hardware
//!
//! O núcleo nunca toca hardware diretamente: portas de E/S, registradores
//! de controle de paginação, troca de contexto e memória física ficam atrás
//! dos traits de `traits`. Um build bare-metal implementa esses traits com
//! assembly inline; os testes usam a máquina por software de `machine`.

pub mod machine;
pub mod traits;

pub use traits::{CpuOps, PagingOps, PhysMemory, PortIo};
