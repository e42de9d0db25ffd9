//! # Escalonador FIFO Cooperativo
//!
//! Fila circular simples (`VecDeque`): `add`/`resume` enfileiram na cauda,
//! `yield_now` despacha a cabeça. Justo na ordem de chegada, sem
//! prioridades — o modelo mínimo sobre o qual o round-robin se apoia.

use super::{SchedulerOps, ThreadId};
use crate::hal::CpuOps;
use alloc::collections::VecDeque;

/// Escalonador cooperativo: só troca de thread quando alguém cede.
pub struct Scheduler {
    ready: VecDeque<ThreadId>,
    current: Option<ThreadId>,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            ready: VecDeque::new(),
            current: None,
        }
    }

    /// Quantidade de threads na fila de prontos.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    fn enqueue(&mut self, thread: ThreadId, cpu: &mut dyn CpuOps) {
        let was_enabled = cpu.interrupts_enabled();
        if was_enabled {
            cpu.disable_interrupts();
        }
        self.ready.push_back(thread);
        if was_enabled {
            cpu.enable_interrupts();
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerOps for Scheduler {
    fn add(&mut self, thread: ThreadId, cpu: &mut dyn CpuOps) {
        crate::ktrace!("(Sched) add: thread {}", thread.0);
        self.enqueue(thread, cpu);
    }

    fn resume(&mut self, thread: ThreadId, cpu: &mut dyn CpuOps) {
        self.enqueue(thread, cpu);
    }

    fn yield_now(&mut self, cpu: &mut dyn CpuOps) {
        if cpu.interrupts_enabled() {
            cpu.disable_interrupts();
        }

        let next = self.ready.pop_front();

        // reabilita antes do dispatch: um tick durante a troca não pode
        // encontrar a fila travada
        if !cpu.interrupts_enabled() {
            cpu.enable_interrupts();
        }

        if let Some(next) = next {
            let prev = self.current.replace(next);
            crate::ktrace!("(Sched) dispatch: thread {}", next.0);
            cpu.dispatch_to(prev, next);
        }
        // fila vazia: o chamador continua executando
    }

    fn terminate(&mut self, thread: ThreadId, cpu: &mut dyn CpuOps) {
        let was_enabled = cpu.interrupts_enabled();
        if was_enabled {
            cpu.disable_interrupts();
        }
        self.ready.retain(|t| *t != thread);
        if self.current == Some(thread) {
            self.current = None;
        }
        if was_enabled {
            cpu.enable_interrupts();
        }
    }

    fn current(&self) -> Option<ThreadId> {
        self.current
    }

    fn set_current(&mut self, thread: Option<ThreadId>) {
        self.current = thread;
    }
}
