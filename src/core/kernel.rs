//! # Contexto do Kernel
//!
//! Os registros estáticos por classe do desenho clássico (lista de pools
//! de frames, arena de VM pools, tabela de handlers de IRQ) viram um valor
//! explícito, criado no boot e passado como contexto a quem precisar.

use crate::core::irq::IrqRouter;
use crate::mm::aspace::VmPoolSet;
use crate::mm::pmm::FramePoolSet;

/// Estado de processo inteiro do kernel.
pub struct Kernel {
    pub frame_pools: FramePoolSet,
    pub vm_pools: VmPoolSet,
    pub irq: IrqRouter,
}

impl Kernel {
    pub const fn new() -> Self {
        Self {
            frame_pools: FramePoolSet::new(),
            vm_pools: VmPoolSet::new(),
            irq: IrqRouter::new(),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
