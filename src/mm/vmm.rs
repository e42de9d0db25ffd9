//! Virtual Memory Manager (VMM).
//!
//! Tabelas de página x86 de dois níveis (diretório → tabela) e o
//! mapeamento Virtual → Físico. Cada `PageTable` possui um diretório de
//! 1024 entradas em um frame próprio; a região compartilhada do kernel é
//! mapeada por identidade na construção e o restante do espaço é resolvido
//! sob demanda pelo fault handler (`mm::fault`).
//!
//! A última entrada do diretório aponta para o próprio diretório
//! (mapeamento recursivo): com a paginação ligada, o diretório fica
//! alcançável em `0xFFFFF000` e qualquer tabela em
//! `(0x3FF << 22) | (pdi << 12)`. Aqui as tabelas são manipuladas pela
//! janela de memória física (`PhysMemory`), mas o slot recursivo é
//! instalado do mesmo jeito: é por ele que um build bare-metal alcança
//! as tabelas depois que a paginação liga.

use crate::hal::{PagingOps, PhysMemory};
use crate::mm::aspace::VmPoolId;
use crate::mm::config::{ENTRIES_PER_TABLE, PAGE_SIZE};
use crate::mm::pmm::{FramePoolId, FramePoolSet};
use crate::mm::MmResult;
use alloc::vec::Vec;
use bitflags::bitflags;

bitflags! {
    /// Flags de uma entrada de diretório/tabela (x86).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER = 1 << 2;
    }
}

/// Índice do slot recursivo no diretório.
const RECURSIVE_SLOT: u32 = 1023;

/// Máscara do endereço de frame numa entrada.
const ENTRY_ADDR_MASK: u32 = 0xFFFF_F000;

/// Configuração única de paginação do processo: de quais pools saem os
/// frames e qual o tamanho da região compartilhada mapeada por identidade.
#[derive(Debug, Clone, Copy)]
pub struct PagingConfig {
    /// Pool de onde saem diretórios e tabelas.
    pub kernel_pool: FramePoolId,
    /// Pool de onde saem os frames de dados mapeados sob demanda.
    pub process_pool: FramePoolId,
    /// Bytes mapeados por identidade no início do espaço (múltiplo de 4 MiB
    /// não é exigido, mas o total precisa caber em uma tabela: <= 4 MiB).
    pub shared_size: u32,
}

/// Uma tabela de páginas de processo: diretório + tabelas sob demanda.
pub struct PageTable {
    directory_frame: u32,
    config: PagingConfig,
    vm_pools: Vec<VmPoolId>,
}

impl PageTable {
    /// Monta um novo espaço de endereçamento.
    ///
    /// Aloca o diretório (pool do kernel) e a primeira tabela (pool de
    /// processo), mapeia por identidade as primeiras
    /// `shared_size / PAGE_SIZE` páginas com `PRESENT|WRITABLE` e instala o
    /// slot recursivo. As demais entradas do diretório ficam `WRITABLE`
    /// sem `PRESENT`.
    pub fn new(
        mem: &mut dyn PhysMemory,
        pools: &mut FramePoolSet,
        config: PagingConfig,
    ) -> MmResult<Self> {
        let shared_pages = config.shared_size / PAGE_SIZE;
        assert!(
            shared_pages <= ENTRIES_PER_TABLE,
            "(VMM) região compartilhada maior que uma tabela (4 MiB)"
        );

        let directory_frame = pools.get_frames(mem, config.kernel_pool, 1)?;
        let dir_base = directory_frame * PAGE_SIZE;
        mem.zero(dir_base, PAGE_SIZE);

        // primeira tabela: identidade para a região compartilhada
        let table_frame = pools.get_frames(mem, config.process_pool, 1)?;
        let table_base = table_frame * PAGE_SIZE;
        mem.zero(table_base, PAGE_SIZE);
        for i in 0..shared_pages {
            let flags = PageFlags::PRESENT | PageFlags::WRITABLE;
            mem.write_u32(table_base + i * 4, (i * PAGE_SIZE) | flags.bits());
        }

        // PDE 0 presente apontando para a tabela; demais entradas apenas
        // WRITABLE (inválidas até o primeiro fault)
        mem.write_u32(
            dir_base,
            table_base | (PageFlags::PRESENT | PageFlags::WRITABLE).bits(),
        );
        for i in 1..ENTRIES_PER_TABLE {
            mem.write_u32(dir_base + i * 4, PageFlags::WRITABLE.bits());
        }

        // slot recursivo: a última entrada referencia o próprio diretório
        mem.write_u32(
            dir_base + RECURSIVE_SLOT * 4,
            dir_base | (PageFlags::PRESENT | PageFlags::WRITABLE).bits(),
        );

        crate::kinfo!(
            "(VMM) Page table construída: diretório no frame {:#x}, {} páginas compartilhadas",
            directory_frame,
            shared_pages
        );

        Ok(Self {
            directory_frame,
            config,
            vm_pools: Vec::new(),
        })
    }

    /// Endereço físico do diretório (valor que vai para CR3).
    pub fn directory_base(&self) -> u32 {
        self.directory_frame * PAGE_SIZE
    }

    /// Instala este diretório em CR3.
    pub fn load(&self, paging: &mut dyn PagingOps) {
        paging.load_page_directory(self.directory_base());
        crate::kdebug!("(VMM) CR3 <- {:#x}", self.directory_base());
    }

    /// Registra um VM pool neste espaço de endereçamento. O fault handler
    /// só aceita endereços cobertos por algum pool registrado (ou qualquer
    /// endereço, enquanto não houver nenhum: bootstrap do heap).
    pub fn register_pool(&mut self, pool: VmPoolId) {
        self.vm_pools.push(pool);
        crate::kdebug!("(VMM) VM pool registrado");
    }

    pub fn vm_pools(&self) -> &[VmPoolId] {
        &self.vm_pools
    }

    fn pde_addr(&self, pdi: u32) -> u32 {
        self.directory_base() + pdi * 4
    }

    /// Resolve um endereço sob demanda: garante a tabela do diretório
    /// (frame do pool do kernel, zerado) e instala um frame de dados novo
    /// (pool de processo) na entrada da tabela.
    ///
    /// Idempotente: um segundo fault num endereço já mapeado não aloca
    /// nada.
    pub(crate) fn map_on_demand(
        &mut self,
        mem: &mut dyn PhysMemory,
        pools: &mut FramePoolSet,
        paging: &mut dyn PagingOps,
        vaddr: u32,
        user: bool,
    ) -> MmResult<()> {
        let mut flags = PageFlags::PRESENT | PageFlags::WRITABLE;
        if user {
            flags |= PageFlags::USER;
        }

        let pdi = vaddr >> 22;
        let pti = (vaddr >> 12) & 0x3FF;

        let pde_addr = self.pde_addr(pdi);
        let pde = mem.read_u32(pde_addr);
        let table_base = if pde & PageFlags::PRESENT.bits() == 0 {
            let frame = pools.get_frames(mem, self.config.kernel_pool, 1)?;
            let base = frame * PAGE_SIZE;
            mem.zero(base, PAGE_SIZE);
            mem.write_u32(pde_addr, base | flags.bits());
            base
        } else {
            pde & ENTRY_ADDR_MASK
        };

        let pte_addr = table_base + pti * 4;
        let pte = mem.read_u32(pte_addr);
        if pte & PageFlags::PRESENT.bits() != 0 {
            // outro caminho já resolveu este endereço
            return Ok(());
        }

        let frame = pools.get_frames(mem, self.config.process_pool, 1)?;
        mem.write_u32(pte_addr, (frame * PAGE_SIZE) | flags.bits());
        paging.flush_tlb_page(vaddr);
        Ok(())
    }

    /// Devolve ao pool de processo o frame que respalda `vaddr`, limpa o
    /// bit PRESENT da entrada e invalida a TLB.
    ///
    /// Páginas nunca tocadas (região alocada mas não sofrida fault) são
    /// toleradas: não há nada a liberar.
    pub fn free_page(
        &mut self,
        mem: &mut dyn PhysMemory,
        pools: &mut FramePoolSet,
        paging: &mut dyn PagingOps,
        vaddr: u32,
    ) -> MmResult<()> {
        let pdi = vaddr >> 22;
        let pti = (vaddr >> 12) & 0x3FF;

        let pde = mem.read_u32(self.pde_addr(pdi));
        if pde & PageFlags::PRESENT.bits() == 0 {
            return Ok(());
        }

        let pte_addr = (pde & ENTRY_ADDR_MASK) + pti * 4;
        let pte = mem.read_u32(pte_addr);
        if pte & PageFlags::PRESENT.bits() == 0 {
            return Ok(());
        }

        let frame_no = (pte & ENTRY_ADDR_MASK) / PAGE_SIZE;
        pools.release_frames(mem, frame_no)?;
        mem.write_u32(pte_addr, PageFlags::WRITABLE.bits());
        paging.flush_tlb_page(vaddr);
        Ok(())
    }

}

/// Liga o bit PG de CR0. A partir daqui a MMU passa a traduzir tudo.
pub fn enable_paging(paging: &mut dyn PagingOps) {
    paging.enable_paging();
    crate::kinfo!("(VMM) Paginação habilitada");
}
