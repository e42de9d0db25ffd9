//! # Roteamento de Interrupções
//!
//! Endpoints de IRQ são objetos que implementam `IrqHandler`; o roteador
//! associa linhas a endpoints e o kernel despacha pelo número da linha.
//! O frame empilhado pelos stubs de assembly fica fora do escopo — aqui
//! entra só o que os handlers consomem.

use crate::hal::CpuOps;
use crate::sched::SchedulerOps;

/// IRQ do timer (8254 PIT).
pub const IRQ_TIMER: u8 = 0;

/// IRQ do canal IDE primário.
pub const IRQ_PRIMARY_IDE: u8 = 14;

/// Estado relevante da CPU no momento da interrupção.
#[derive(Debug, Clone, Copy)]
pub struct IrqFrame {
    pub irq: u8,
    pub error_code: u32,
}

impl IrqFrame {
    pub fn new(irq: u8) -> Self {
        Self { irq, error_code: 0 }
    }
}

/// Contexto que o kernel empresta ao endpoint durante o atendimento.
pub struct IrqEnv<'a> {
    pub cpu: &'a mut dyn CpuOps,
    /// Escalonador, quando o endpoint não é ele próprio (ex.: o disco
    /// precisa acordar threads).
    pub scheduler: Option<&'a mut dyn SchedulerOps>,
}

/// Um endpoint capaz de atender interrupções.
pub trait IrqHandler {
    fn on_irq(&mut self, frame: &IrqFrame, env: &mut IrqEnv<'_>);
}

/// Tag do endpoint registrado em uma linha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqEndpoint {
    Timer,
    PrimaryIde,
}

/// Tabela linha → endpoint. Quem possui os objetos é o embedder; o
/// roteador só diz *quem* atende cada linha.
pub struct IrqRouter {
    lines: [Option<IrqEndpoint>; 16],
}

impl IrqRouter {
    pub const fn new() -> Self {
        Self { lines: [None; 16] }
    }

    pub fn register(&mut self, irq: u8, endpoint: IrqEndpoint) {
        assert!((irq as usize) < 16, "(IRQ) linha inválida");
        self.lines[irq as usize] = Some(endpoint);
        crate::kdebug!("(IRQ) Linha {} -> {:?}", irq, endpoint);
    }

    pub fn endpoint(&self, irq: u8) -> Option<IrqEndpoint> {
        self.lines.get(irq as usize).copied().flatten()
    }
}
