//! # Máquina por Software
//!
//! Implementação de todos os traits de `hal` sobre um modelo em software:
//! RAM vetorial, controlador ATA nas portas 0x1F0–0x1F7/0x3F6, latch do PIT
//! (0x40/0x43), contadores de EOI do PIC e um gravador de trocas de
//! contexto.
//!
//! É a máquina de referência dos testes do crate: o mesmo código de driver
//! que falaria com um controlador IDE real conversa com `SoftMachine` sem
//! nenhuma alteração. O modelo é deliberadamente simples — um comando fica
//! com BSY ligado por algumas leituras de status e então completa,
//! enfileirando a IRQ correspondente.
//!
//! O handle é clonável (estado compartilhado): drivers podem possuir sua
//! própria cópia enquanto os testes inspecionam a mesma máquina.

use crate::sched::ThreadId;

use super::traits::{CpuOps, PagingOps, PhysMemory, PortIo};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use alloc::collections::VecDeque;
use spin::Mutex;

/// Quantas leituras de status um comando ATA permanece com BSY ligado.
const ATA_BUSY_POLLS: u8 = 3;

/// Tamanho de bloco do disco modelado (setor ATA).
const SECTOR_SIZE: usize = 512;

// Bits do Status Register do controlador modelado
const STATUS_ERR: u8 = 0x01;
const STATUS_DRQ: u8 = 0x08;
const STATUS_DRDY: u8 = 0x40;
const STATUS_BSY: u8 = 0x80;

/// Uma troca de contexto registrada pela máquina.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    pub prev: Option<ThreadId>,
    pub next: ThreadId,
}

/// Handle clonável para a máquina modelada.
#[derive(Clone)]
pub struct SoftMachine {
    state: Arc<Mutex<MachineState>>,
}

struct MachineState {
    // memória física
    ram: Vec<u8>,
    // paginação
    cr3: u32,
    paging_enabled: bool,
    page_flushes: Vec<u32>,
    full_flushes: u32,
    // CPU
    interrupts_enabled: bool,
    switches: Vec<Switch>,
    // dispositivos
    ata: SoftAta,
    pit: SoftPit,
    eoi_master: u32,
    eoi_slave: u32,
    pending_irqs: VecDeque<u8>,
}

/// Latch do 8254: byte de comando e divisor em dois bytes (lo/hi).
struct SoftPit {
    command: u8,
    divisor_lo: Option<u8>,
    divisor: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtaCommand {
    Read,
    Write,
    Flush,
}

/// Modelo do disco ATA primário (master).
struct SoftAta {
    storage: Vec<u8>,
    sector_count: u8,
    lba: [u8; 3],
    drive_head: u8,
    status: u8,
    busy_polls: u8,
    pending: Option<AtaCommand>,
    fifo: Vec<u8>,
    fifo_pos: usize,
}

impl SoftAta {
    fn new(blocks: usize) -> Self {
        Self {
            storage: vec![0u8; blocks * SECTOR_SIZE],
            sector_count: 0,
            lba: [0; 3],
            drive_head: 0,
            status: STATUS_DRDY,
            busy_polls: 0,
            pending: None,
            fifo: Vec::new(),
            fifo_pos: 0,
        }
    }

    fn lba28(&self) -> u32 {
        (self.lba[0] as u32)
            | ((self.lba[1] as u32) << 8)
            | ((self.lba[2] as u32) << 16)
            | (((self.drive_head & 0x0F) as u32) << 24)
    }

    fn start(&mut self, cmd: AtaCommand) {
        // o modelo só transfere um setor por comando
        debug_assert!(self.sector_count <= 1, "SoftAta: sector_count > 1");
        self.pending = Some(cmd);
        self.status = STATUS_BSY | STATUS_DRDY;
        self.busy_polls = ATA_BUSY_POLLS;
        self.fifo.clear();
        self.fifo_pos = 0;
    }

    /// Leitura do Status Register: cada poll consome uma fatia do tempo de
    /// BSY; ao esgotar, o comando pendente completa.
    fn poll_status(&mut self, irqs: &mut VecDeque<u8>) -> u8 {
        if self.busy_polls > 0 {
            self.busy_polls -= 1;
            if self.busy_polls == 0 {
                self.complete(irqs);
            }
        }
        self.status
    }

    fn complete(&mut self, irqs: &mut VecDeque<u8>) {
        let lba = self.lba28() as usize;
        match self.pending {
            Some(AtaCommand::Read) => {
                let start = lba * SECTOR_SIZE;
                assert!(
                    start + SECTOR_SIZE <= self.storage.len(),
                    "SoftAta: leitura além do disco (lba={})",
                    lba
                );
                self.fifo.clear();
                self.fifo.extend_from_slice(&self.storage[start..start + SECTOR_SIZE]);
                self.fifo_pos = 0;
                self.status = STATUS_DRDY | STATUS_DRQ;
                irqs.push_back(14);
            }
            Some(AtaCommand::Write) => {
                // pronto para receber os 256 words; a IRQ sai quando o
                // último word chegar
                self.fifo.clear();
                self.fifo_pos = 0;
                self.status = STATUS_DRDY | STATUS_DRQ;
            }
            Some(AtaCommand::Flush) => {
                self.status = STATUS_DRDY;
                self.pending = None;
                irqs.push_back(14);
            }
            None => {}
        }
    }

    fn read_data(&mut self) -> u16 {
        if self.fifo_pos + 1 >= self.fifo.len() || self.pending != Some(AtaCommand::Read) {
            return 0;
        }
        let word =
            (self.fifo[self.fifo_pos] as u16) | ((self.fifo[self.fifo_pos + 1] as u16) << 8);
        self.fifo_pos += 2;
        if self.fifo_pos >= self.fifo.len() {
            self.status = STATUS_DRDY;
            self.pending = None;
        }
        word
    }

    fn write_data(&mut self, word: u16, irqs: &mut VecDeque<u8>) {
        if self.pending != Some(AtaCommand::Write) {
            return;
        }
        self.fifo.push(word as u8);
        self.fifo.push((word >> 8) as u8);
        if self.fifo.len() >= SECTOR_SIZE {
            let lba = self.lba28() as usize;
            let start = lba * SECTOR_SIZE;
            assert!(
                start + SECTOR_SIZE <= self.storage.len(),
                "SoftAta: escrita além do disco (lba={})",
                lba
            );
            self.storage[start..start + SECTOR_SIZE].copy_from_slice(&self.fifo);
            self.status = STATUS_DRDY;
            self.pending = None;
            irqs.push_back(14);
        }
    }
}

impl SoftMachine {
    /// Cria a máquina com `ram_bytes` de RAM e um disco de `disk_blocks`
    /// setores de 512 bytes.
    pub fn new(ram_bytes: usize, disk_blocks: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MachineState {
                ram: vec![0u8; ram_bytes],
                cr3: 0,
                paging_enabled: false,
                page_flushes: Vec::new(),
                full_flushes: 0,
                interrupts_enabled: true,
                switches: Vec::new(),
                ata: SoftAta::new(disk_blocks),
                pit: SoftPit {
                    command: 0,
                    divisor_lo: None,
                    divisor: 0,
                },
                eoi_master: 0,
                eoi_slave: 0,
                pending_irqs: VecDeque::new(),
            })),
        }
    }

    // -------------------------
    // Inspeção (lado dos testes)
    // -------------------------

    /// Retira a próxima IRQ pendente, se houver.
    pub fn take_irq(&self) -> Option<u8> {
        self.state.lock().pending_irqs.pop_front()
    }

    pub fn pending_irqs(&self) -> usize {
        self.state.lock().pending_irqs.len()
    }

    /// Trocas de contexto registradas, em ordem.
    pub fn switches(&self) -> Vec<Switch> {
        self.state.lock().switches.clone()
    }

    pub fn cr3(&self) -> u32 {
        self.state.lock().cr3
    }

    pub fn paging_enabled(&self) -> bool {
        self.state.lock().paging_enabled
    }

    pub fn page_flushes(&self) -> Vec<u32> {
        self.state.lock().page_flushes.clone()
    }

    pub fn full_flushes(&self) -> u32 {
        self.state.lock().full_flushes
    }

    pub fn pit_divisor(&self) -> u16 {
        self.state.lock().pit.divisor
    }

    pub fn pit_command(&self) -> u8 {
        self.state.lock().pit.command
    }

    /// Contagem de EOIs enviados: `(master, slave)`.
    pub fn eoi_counts(&self) -> (u32, u32) {
        let st = self.state.lock();
        (st.eoi_master, st.eoi_slave)
    }

    /// Conteúdo de um setor do disco modelado.
    pub fn disk_block(&self, lba: u32) -> [u8; SECTOR_SIZE] {
        let st = self.state.lock();
        let start = lba as usize * SECTOR_SIZE;
        let mut out = [0u8; SECTOR_SIZE];
        out.copy_from_slice(&st.ata.storage[start..start + SECTOR_SIZE]);
        out
    }

    /// Caminha nas tabelas de página a partir de CR3 e traduz um endereço
    /// virtual, como a MMU faria. `None` para entradas não presentes.
    pub fn translate(&self, vaddr: u32) -> Option<u32> {
        let st = self.state.lock();
        if !st.paging_enabled {
            return Some(vaddr);
        }
        let pde = st.ram_u32(st.cr3 + (vaddr >> 22) * 4);
        if pde & 1 == 0 {
            return None;
        }
        let table = pde & 0xFFFF_F000;
        let pte = st.ram_u32(table + ((vaddr >> 12) & 0x3FF) * 4);
        if pte & 1 == 0 {
            return None;
        }
        Some((pte & 0xFFFF_F000) | (vaddr & 0xFFF))
    }
}

impl MachineState {
    fn ram_u32(&self, paddr: u32) -> u32 {
        let i = paddr as usize;
        u32::from_le_bytes([self.ram[i], self.ram[i + 1], self.ram[i + 2], self.ram[i + 3]])
    }
}

impl PortIo for SoftMachine {
    fn inb(&mut self, port: u16) -> u8 {
        let mut st = self.state.lock();
        let st = &mut *st;
        match port {
            0x1F7 => st.ata.poll_status(&mut st.pending_irqs),
            // Alternate Status: mesma leitura, sem consumir tempo de BSY
            0x3F6 => st.ata.status,
            0x1F1 => 0, // Error Register (nenhum erro modelado)
            _ => 0,
        }
    }

    fn outb(&mut self, port: u16, value: u8) {
        let mut st = self.state.lock();
        match port {
            0x1F2 => st.ata.sector_count = value,
            0x1F3 => st.ata.lba[0] = value,
            0x1F4 => st.ata.lba[1] = value,
            0x1F5 => st.ata.lba[2] = value,
            0x1F6 => st.ata.drive_head = value,
            0x1F7 => match value {
                0x20 => st.ata.start(AtaCommand::Read),
                0x30 => st.ata.start(AtaCommand::Write),
                0xE7 => st.ata.start(AtaCommand::Flush),
                _ => {}
            },
            0x20 => {
                if value == 0x20 {
                    st.eoi_master += 1;
                }
            }
            0xA0 => {
                if value == 0x20 {
                    st.eoi_slave += 1;
                }
            }
            0x43 => {
                st.pit.command = value;
                st.pit.divisor_lo = None;
            }
            0x40 => match st.pit.divisor_lo.take() {
                None => st.pit.divisor_lo = Some(value),
                Some(lo) => st.pit.divisor = ((value as u16) << 8) | lo as u16,
            },
            _ => {}
        }
    }

    fn inw(&mut self, port: u16) -> u16 {
        let mut st = self.state.lock();
        match port {
            0x1F0 => st.ata.read_data(),
            _ => 0,
        }
    }

    fn outw(&mut self, port: u16, value: u16) {
        let mut st = self.state.lock();
        let st = &mut *st;
        if port == 0x1F0 {
            st.ata.write_data(value, &mut st.pending_irqs);
        }
    }
}

impl PhysMemory for SoftMachine {
    fn read(&self, paddr: u32, buf: &mut [u8]) {
        let st = self.state.lock();
        let start = paddr as usize;
        let end = start + buf.len();
        assert!(end <= st.ram.len(), "acesso físico fora da RAM: {:#x}", paddr);
        buf.copy_from_slice(&st.ram[start..end]);
    }

    fn write(&mut self, paddr: u32, buf: &[u8]) {
        let mut st = self.state.lock();
        let start = paddr as usize;
        let end = start + buf.len();
        assert!(end <= st.ram.len(), "acesso físico fora da RAM: {:#x}", paddr);
        st.ram[start..end].copy_from_slice(buf);
    }
}

impl CpuOps for SoftMachine {
    fn interrupts_enabled(&self) -> bool {
        self.state.lock().interrupts_enabled
    }

    fn disable_interrupts(&mut self) {
        self.state.lock().interrupts_enabled = false;
    }

    fn enable_interrupts(&mut self) {
        self.state.lock().interrupts_enabled = true;
    }

    fn dispatch_to(&mut self, prev: Option<ThreadId>, next: ThreadId) {
        self.state.lock().switches.push(Switch { prev, next });
    }
}

impl PagingOps for SoftMachine {
    fn load_page_directory(&mut self, directory_phys: u32) {
        self.state.lock().cr3 = directory_phys;
    }

    fn enable_paging(&mut self) {
        self.state.lock().paging_enabled = true;
    }

    fn flush_tlb_page(&mut self, vaddr: u32) {
        self.state.lock().page_flushes.push(vaddr);
    }

    fn flush_tlb(&mut self) {
        self.state.lock().full_flushes += 1;
    }
}
