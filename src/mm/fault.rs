//! # Page Fault Handler
//!
//! Decodifica o error code empilhado pela CPU e resolve o fault alocando
//! frames sob demanda. Roda conceitualmente com a thread faltosa ainda
//! corrente e com interrupções desabilitadas pela própria CPU.

use crate::hal::{PagingOps, PhysMemory};
use crate::mm::aspace::VmPoolSet;
use crate::mm::pmm::FramePoolSet;
use crate::mm::vmm::PageTable;
use crate::mm::{MmError, MmResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
}

/// Informação de um page fault: endereço faltoso (CR2) e o error code.
#[derive(Debug, Clone, Copy)]
pub struct PageFaultInfo {
    pub address: u32,
    pub error_code: u32,
}

impl PageFaultInfo {
    pub fn new(address: u32, error_code: u32) -> Self {
        Self {
            address,
            error_code,
        }
    }

    /// Bit 0: a página estava presente (fault de proteção, não de ausência).
    pub fn page_present(&self) -> bool {
        self.error_code & 0x1 != 0
    }

    /// Bit 1: acesso de escrita.
    pub fn access(&self) -> AccessType {
        if self.error_code & 0x2 != 0 {
            AccessType::Write
        } else {
            AccessType::Read
        }
    }

    /// Bit 2: o fault veio de modo usuário.
    pub fn user_mode(&self) -> bool {
        self.error_code & 0x4 != 0
    }
}

/// Resolve um page fault no espaço de endereçamento de `page_table`.
///
/// 1. Fault com página presente é violação de proteção: não há mudança de
///    permissão suportada.
/// 2. Havendo pools registrados, o endereço precisa pertencer a algum;
///    sem nenhum pool registrado, qualquer endereço é aceito (é assim que
///    o heap do kernel se materializa antes do primeiro pool existir).
/// 3. Tabela ausente: um frame do pool do kernel, zerado. Frame de dados:
///    pool de processo. Ambos com `PRESENT|WRITABLE`, mais `USER` se o
///    fault veio de modo usuário.
pub fn handle_page_fault(
    page_table: &mut PageTable,
    vm_pools: &VmPoolSet,
    pools: &mut FramePoolSet,
    mem: &mut dyn PhysMemory,
    paging: &mut dyn PagingOps,
    info: PageFaultInfo,
) -> MmResult<()> {
    if info.page_present() {
        crate::kerror!(
            "(Fault) Violação de proteção em {:#x} (err={:#x})",
            info.address,
            info.error_code
        );
        return Err(MmError::ProtectionFault);
    }

    let registered = page_table.vm_pools();
    if !registered.is_empty()
        && !registered
            .iter()
            .any(|id| vm_pools.pool(*id).is_legitimate(info.address))
    {
        crate::kerror!("(Fault) Endereço ilegítimo: {:#x}", info.address);
        return Err(MmError::IllegitimateAddress);
    }

    crate::kdebug!("(Fault) Alocação sob demanda para {:#x}", info.address);
    page_table.map_on_demand(mem, pools, paging, info.address, info.user_mode())
}
