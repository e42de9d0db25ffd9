//! Memory Management Subsystem
//! ===========================
//!
//! Este módulo concentra todo o gerenciamento de memória do kernel.
//!
//! ---------------------------------------------------------------------
//! VISÃO GERAL DOS SUBMÓDULOS
//! ---------------------------------------------------------------------
//!
//! - `pmm` — **Physical Memory Manager**
//!   Pools de frames físicos de 4 KiB com alocação contígua. Cada pool
//!   guarda um mapa de dois bits por frame na própria memória física;
//!   todos os pools ficam registrados em um `FramePoolSet`, de modo que
//!   um frame pode ser liberado conhecendo apenas o seu número.
//!
//! - `vmm` — **Virtual Memory Manager**
//!   Tabelas de página x86 de dois níveis (diretório → tabela). Cada
//!   `PageTable` mapeia por identidade a região compartilhada do kernel e
//!   resolve o restante sob demanda, no page fault.
//!
//! - `fault` — Decodificação e resolução de page faults.
//!
//! - `aspace` — **VM Pools**
//!   Regiões de endereço virtual por espaço de endereçamento. Cada pool
//!   entrega faixas alinhadas a página dentro de uma janela fixa e valida
//!   endereços para o fault handler.
//!
//! ---------------------------------------------------------------------
//! FLUXO DE DEPENDÊNCIA
//! ---------------------------------------------------------------------
//!
//! ```text
//! pmm    ──▶ fornece frames físicos
//!  │
//!  ▼
//! vmm    ──▶ monta diretório/tabelas e resolve faults
//!  │
//!  ▼
//! aspace ──▶ entrega regiões virtuais e devolve páginas ao pmm
//! ```
//!
//! Não há estado global: os registros (`FramePoolSet`, `VmPoolSet`) são
//! valores explícitos, em geral pendurados no `Kernel`, e passados como
//! contexto a cada operação.

pub mod aspace;
pub mod config;
pub mod error;
pub mod fault;
pub mod pmm;
pub mod vmm;

#[cfg(test)]
mod test;

// Re-exports para conveniência
pub use config::{FRAME_SIZE, PAGE_SIZE};
pub use error::{MmError, MmResult};
