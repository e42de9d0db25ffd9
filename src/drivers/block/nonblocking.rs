//! # Disco Não-Bloqueante
//!
//! Mesmo protocolo LBA28 do driver PIO, mas a espera por BSY estaciona a
//! thread corrente em vez de queimar CPU: enquanto o controlador trabalha,
//! a thread entra numa fila de bloqueadas e cede a CPU; o atendimento da
//! IRQ 14 acorda **uma** thread por transição de pronto.
//!
//! Supressão de duplicatas é obrigatória: uma thread pode ser acordada
//! (cedo demais) antes de ter voltado a se estacionar, e ao re-checar o
//! estado do controlador ela se estaciona de novo.
//!
//! Antes de existir escalonador/thread corrente (boot), a espera degrada
//! para o polling simples.

use super::ata::{self, DiskOp};
use super::traits::{BlockDevice, BlockError, BLOCK_SIZE};
use crate::core::irq::{IrqEndpoint, IrqEnv, IrqFrame, IrqHandler, IrqRouter, IRQ_PRIMARY_IDE};
use crate::drivers::pic;
use crate::hal::{CpuOps, PortIo};
use crate::sched::{SchedulerOps, ThreadId};
use alloc::boxed::Box;
use alloc::collections::VecDeque;

/// Cliente de disco dirigido por interrupção.
pub struct NonBlockingAta {
    ports: Box<dyn PortIo>,
    size: u32,
    blocked: VecDeque<ThreadId>,
    waiting_for_interrupt: bool,
}

impl NonBlockingAta {
    /// Cria o cliente e registra o endpoint na linha IRQ 14.
    pub fn new(ports: Box<dyn PortIo>, size: u32, irq: &mut IrqRouter) -> Self {
        irq.register(IRQ_PRIMARY_IDE, IrqEndpoint::PrimaryIde);
        crate::kinfo!(
            "(ATA) Cliente não-bloqueante, {} blocos",
            size / BLOCK_SIZE as u32
        );
        Self {
            ports,
            size,
            blocked: VecDeque::new(),
            waiting_for_interrupt: false,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_busy(&mut self) -> bool {
        ata::is_busy(self.ports.as_mut())
    }

    /// Threads atualmente estacionadas à espera do disco.
    pub fn waiting_threads(&self) -> usize {
        self.blocked.len()
    }

    /// Espera o controlador desocupar sem segurar a CPU.
    ///
    /// Enquanto BSY estiver de pé: estaciona a thread corrente (se ainda
    /// não estiver na fila), cede a CPU e, ao voltar, sai da fila e
    /// re-checa. Sem thread corrente não há quem estacionar: espera
    /// ocupada, necessária durante o boot.
    fn wait_while_busy(&mut self, sched: &mut dyn SchedulerOps, cpu: &mut dyn CpuOps) {
        let current = match sched.current() {
            Some(thread) => thread,
            None => {
                while ata::is_busy(self.ports.as_mut()) {}
                return;
            }
        };

        while ata::is_busy(self.ports.as_mut()) {
            if !self.blocked.contains(&current) {
                self.blocked.push_back(current);
            }

            sched.yield_now(cpu);

            // ao ser re-despachada (ou quando ninguém mais podia rodar),
            // sai da fila de bloqueadas e reavalia o controlador
            if let Some(pos) = self.blocked.iter().position(|t| *t == current) {
                self.blocked.remove(pos);
            }
        }
    }

    /// Lê um bloco, estacionando a thread corrente enquanto o controlador
    /// estiver ocupado.
    pub fn read(
        &mut self,
        block_no: u32,
        buf: &mut [u8],
        sched: &mut dyn SchedulerOps,
        cpu: &mut dyn CpuOps,
    ) -> Result<(), BlockError> {
        if buf.len() < BLOCK_SIZE {
            return Err(BlockError::InvalidBuffer);
        }

        self.waiting_for_interrupt = true;
        let issued = ata::issue_command(self.ports.as_mut(), DiskOp::Read, block_no);
        if let Err(e) = issued {
            self.waiting_for_interrupt = false;
            return Err(e);
        }
        ata::settle(self.ports.as_mut());
        self.wait_while_busy(sched, cpu);
        self.waiting_for_interrupt = false;

        ata::completion_check(self.ports.as_mut(), true)?;
        ata::transfer_in(self.ports.as_mut(), buf);
        Ok(())
    }

    /// Escreve um bloco (com cache flush), estacionando a thread corrente
    /// nas duas esperas.
    pub fn write(
        &mut self,
        block_no: u32,
        buf: &[u8],
        sched: &mut dyn SchedulerOps,
        cpu: &mut dyn CpuOps,
    ) -> Result<(), BlockError> {
        if buf.len() < BLOCK_SIZE {
            return Err(BlockError::InvalidBuffer);
        }

        self.waiting_for_interrupt = true;
        let issued = ata::issue_command(self.ports.as_mut(), DiskOp::Write, block_no);
        if let Err(e) = issued {
            self.waiting_for_interrupt = false;
            return Err(e);
        }
        ata::settle(self.ports.as_mut());
        self.wait_while_busy(sched, cpu);

        let checked = ata::completion_check(self.ports.as_mut(), true);
        if let Err(e) = checked {
            self.waiting_for_interrupt = false;
            return Err(e);
        }
        ata::transfer_out(self.ports.as_mut(), buf);

        ata::flush_cache(self.ports.as_mut());
        ata::settle(self.ports.as_mut());
        self.wait_while_busy(sched, cpu);
        self.waiting_for_interrupt = false;

        ata::completion_check(self.ports.as_mut(), false)
    }

    /// Amarra o cliente a um escalonador/CPU, produzindo um `BlockDevice`
    /// utilizável pelo sistema de arquivos.
    pub fn bind<'a>(
        &'a mut self,
        sched: &'a mut dyn SchedulerOps,
        cpu: &'a mut dyn CpuOps,
    ) -> BoundAta<'a> {
        BoundAta {
            disk: self,
            sched,
            cpu,
        }
    }

    #[cfg(test)]
    pub(crate) fn park_for_test(&mut self, thread: ThreadId) {
        if !self.blocked.contains(&thread) {
            self.blocked.push_back(thread);
        }
    }

    #[cfg(test)]
    pub(crate) fn set_waiting_for_test(&mut self, waiting: bool) {
        self.waiting_for_interrupt = waiting;
    }
}

impl IrqHandler for NonBlockingAta {
    /// IRQ 14: ACK no PIC (slave + master) e, se o controlador sinaliza
    /// pronto no meio de uma operação, acorda exatamente uma thread.
    fn on_irq(&mut self, _frame: &IrqFrame, env: &mut IrqEnv<'_>) {
        pic::send_eoi(self.ports.as_mut(), IRQ_PRIMARY_IDE);

        if !self.waiting_for_interrupt || ata::is_busy(self.ports.as_mut()) {
            // interrupção espúria ou cedo demais: quem estiver estacionado
            // continua estacionado e volta a se estacionar sozinho
            return;
        }

        let IrqEnv { cpu, scheduler } = env;
        if let Some(sched) = scheduler.as_mut() {
            if let Some(thread) = self.blocked.pop_front() {
                crate::ktrace!("(ATA) IRQ14 acorda thread {}", thread.0);
                sched.resume(thread, &mut **cpu);
            }
        }
    }
}

/// `NonBlockingAta` amarrado a um escalonador: a visão `BlockDevice` que o
/// sistema de arquivos consome.
pub struct BoundAta<'a> {
    disk: &'a mut NonBlockingAta,
    sched: &'a mut dyn SchedulerOps,
    cpu: &'a mut dyn CpuOps,
}

impl BlockDevice for BoundAta<'_> {
    fn read_block(&mut self, lba: u32, buf: &mut [u8]) -> Result<(), BlockError> {
        self.disk.read(lba, buf, self.sched, self.cpu)
    }

    fn write_block(&mut self, lba: u32, buf: &[u8]) -> Result<(), BlockError> {
        self.disk.write(lba, buf, self.sched, self.cpu)
    }

    fn total_blocks(&self) -> u32 {
        self.disk.size / BLOCK_SIZE as u32
    }
}
