//! # Escalonador Round-Robin Preemptivo
//!
//! Compõe a fila FIFO cooperativa com um quantum dirigido pelo timer:
//! na construção o PIT é programado para `hz` interrupções por segundo e o
//! handler de IRQ 0 conta ticks. Quando `ticks >= hz` a thread corrente é
//! re-enfileirada (`resume`) e a CPU é cedida — preempção sem nenhuma
//! cooperação da thread.
//!
//! O EOI sai antes do dispatch: a troca de contexto pode não retornar por
//! este caminho, e o PIC precisa do ACK para entregar o próximo tick.

use super::scheduler::Scheduler;
use super::{SchedulerOps, ThreadId};
use crate::core::irq::{IrqEndpoint, IrqEnv, IrqFrame, IrqHandler, IrqRouter, IRQ_TIMER};
use crate::drivers::{pic, timer};
use crate::hal::{CpuOps, PortIo};
use alloc::boxed::Box;

/// Quantum padrão, em ticks de timer (~200 ms a 5 Hz).
pub const DEFAULT_HZ: u32 = 5;

/// Round-robin: FIFO + quantum por timer.
pub struct RrScheduler {
    fifo: Scheduler,
    ports: Box<dyn PortIo>,
    ticks: u32,
    hz: u32,
}

impl RrScheduler {
    /// Cria o escalonador, programa o PIT e se registra na linha IRQ 0.
    ///
    /// `hz` é ao mesmo tempo a frequência pedida ao timer e o limiar de
    /// ticks do quantum.
    pub fn new(hz: u32, mut ports: Box<dyn PortIo>, irq: &mut IrqRouter) -> Self {
        irq.register(IRQ_TIMER, IrqEndpoint::Timer);
        let actual = timer::program_interval(ports.as_mut(), hz);
        crate::kinfo!(
            "(Sched) Round-robin: quantum de {} ticks, PIT a {} Hz",
            hz,
            actual
        );
        Self {
            fifo: Scheduler::new(),
            ports,
            ticks: 0,
            hz,
        }
    }

    /// Ticks acumulados no quantum corrente.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn ready_len(&self) -> usize {
        self.fifo.ready_len()
    }
}

impl SchedulerOps for RrScheduler {
    fn add(&mut self, thread: ThreadId, cpu: &mut dyn CpuOps) {
        self.fifo.add(thread, cpu);
    }

    fn resume(&mut self, thread: ThreadId, cpu: &mut dyn CpuOps) {
        self.fifo.resume(thread, cpu);
    }

    fn yield_now(&mut self, cpu: &mut dyn CpuOps) {
        // quantum novo para quem assumir a CPU
        self.ticks = 0;
        self.fifo.yield_now(cpu);
    }

    fn terminate(&mut self, thread: ThreadId, cpu: &mut dyn CpuOps) {
        self.fifo.terminate(thread, cpu);
    }

    fn current(&self) -> Option<ThreadId> {
        self.fifo.current()
    }

    fn set_current(&mut self, thread: Option<ThreadId>) {
        self.fifo.set_current(thread);
    }
}

impl IrqHandler for RrScheduler {
    fn on_irq(&mut self, _frame: &IrqFrame, env: &mut IrqEnv<'_>) {
        self.ticks += 1;

        pic::send_eoi(self.ports.as_mut(), 0);

        if self.ticks >= self.hz {
            crate::ktrace!("(Sched) Quantum esgotado, rotacionando");
            if let Some(current) = self.fifo.current() {
                self.fifo.resume(current, env.cpu);
            }
            self.yield_now(env.cpu);
        }
    }
}
