//! Testes dos escalonadores (FIFO cooperativo e round-robin).

use super::{RrScheduler, Scheduler, SchedulerOps, ThreadId};
use crate::core::irq::{IrqEndpoint, IrqEnv, IrqFrame, IrqRouter, IRQ_TIMER};
use crate::core::irq::IrqHandler;
use crate::drivers::timer;
use crate::hal::machine::SoftMachine;
use crate::hal::CpuOps;
use alloc::boxed::Box;

fn cpu() -> SoftMachine {
    SoftMachine::new(0, 1)
}

const A: ThreadId = ThreadId(1);
const B: ThreadId = ThreadId(2);
const C: ThreadId = ThreadId(3);

#[test]
fn despacho_fifo_na_ordem_de_chegada() {
    let mut cpu = cpu();
    let mut sched = Scheduler::new();

    sched.add(A, &mut cpu);
    sched.add(B, &mut cpu);
    sched.add(C, &mut cpu);

    sched.yield_now(&mut cpu);
    sched.yield_now(&mut cpu);
    sched.yield_now(&mut cpu);

    let switches = cpu.switches();
    assert_eq!(switches.len(), 3);
    assert_eq!(switches[0].next, A);
    assert_eq!(switches[0].prev, None);
    assert_eq!(switches[1].next, B);
    assert_eq!(switches[1].prev, Some(A));
    assert_eq!(switches[2].next, C);
    assert_eq!(sched.current(), Some(C));
}

#[test]
fn yield_com_fila_vazia_nao_troca() {
    let mut cpu = cpu();
    let mut sched = Scheduler::new();

    sched.set_current(Some(A));
    sched.yield_now(&mut cpu);

    assert!(cpu.switches().is_empty());
    assert_eq!(sched.current(), Some(A));
}

#[test]
fn yield_nao_reenfileira_o_chamador() {
    let mut cpu = cpu();
    let mut sched = Scheduler::new();

    sched.set_current(Some(A));
    sched.add(B, &mut cpu);

    // A cede sem se re-enfileirar: B assume e a fila esvazia
    sched.yield_now(&mut cpu);
    assert_eq!(sched.current(), Some(B));
    assert_eq!(sched.ready_len(), 0);

    // próximo yield é no-op: A ficou de fora por escolha própria
    sched.yield_now(&mut cpu);
    assert_eq!(sched.current(), Some(B));
}

#[test]
fn resume_antes_do_yield_mantem_a_thread_viva() {
    let mut cpu = cpu();
    let mut sched = Scheduler::new();

    sched.set_current(Some(A));
    sched.add(B, &mut cpu);

    sched.resume(A, &mut cpu);
    sched.yield_now(&mut cpu);
    assert_eq!(sched.current(), Some(B));

    sched.yield_now(&mut cpu);
    assert_eq!(sched.current(), Some(A));
}

#[test]
fn terminate_remove_por_id() {
    let mut cpu = cpu();
    let mut sched = Scheduler::new();

    sched.add(A, &mut cpu);
    sched.add(B, &mut cpu);
    sched.add(C, &mut cpu);

    sched.terminate(B, &mut cpu);
    assert_eq!(sched.ready_len(), 2);

    // remover quem não está na fila não é erro
    sched.terminate(ThreadId(99), &mut cpu);

    sched.yield_now(&mut cpu);
    sched.yield_now(&mut cpu);
    let switches = cpu.switches();
    assert_eq!(switches[0].next, A);
    assert_eq!(switches[1].next, C);
}

#[test]
fn mutacoes_preservam_o_estado_de_interrupcao() {
    let mut cpu = cpu();
    let mut sched = Scheduler::new();

    cpu.disable_interrupts();
    sched.add(A, &mut cpu);
    assert!(!cpu.interrupts_enabled());

    cpu.enable_interrupts();
    sched.add(B, &mut cpu);
    assert!(cpu.interrupts_enabled());

    // o yield reabilita antes do dispatch, mesmo entrando desabilitado
    cpu.disable_interrupts();
    sched.yield_now(&mut cpu);
    assert!(cpu.interrupts_enabled());
}

#[test]
fn pit_e_programado_na_construcao() {
    let machine = cpu();
    let mut router = IrqRouter::new();
    let _rr = RrScheduler::new(5, Box::new(machine.clone()), &mut router);

    // 0x34 = canal 0, lo/hi, modo rate generator
    assert_eq!(machine.pit_command(), 0x34);
    // 1193180/5 estoura 16 bits: o divisor satura
    assert_eq!(machine.pit_divisor(), 65535);
    // e o endpoint fica pendurado na linha do timer
    assert_eq!(router.endpoint(IRQ_TIMER), Some(IrqEndpoint::Timer));
}

#[test]
fn divisor_do_pit_sem_saturacao() {
    let mut machine = cpu();
    let actual = timer::program_interval(&mut machine, 100);
    assert_eq!(machine.pit_divisor(), 11931);
    assert_eq!(actual, 100);

    assert_eq!(timer::program_interval(&mut machine, 0), 0);
}

#[test]
fn quantum_preempta_no_quinto_tick() {
    let mut machine = cpu();
    let mut router = IrqRouter::new();
    let mut rr = RrScheduler::new(5, Box::new(machine.clone()), &mut router);

    rr.set_current(Some(A));
    rr.add(B, &mut machine);

    let frame = IrqFrame::new(0);

    // quatro ticks: A segue na CPU
    for _ in 0..4 {
        let mut env = IrqEnv {
            cpu: &mut machine,
            scheduler: None,
        };
        rr.on_irq(&frame, &mut env);
    }
    assert_eq!(rr.ticks(), 4);
    assert!(machine.switches().is_empty());

    // quinto tick: A é re-enfileirada e B assume
    {
        let mut env = IrqEnv {
            cpu: &mut machine,
            scheduler: None,
        };
        rr.on_irq(&frame, &mut env);
    }
    assert_eq!(rr.ticks(), 0);
    let switches = machine.switches();
    assert_eq!(switches.len(), 1);
    assert_eq!(switches[0].prev, Some(A));
    assert_eq!(switches[0].next, B);
    assert_eq!(rr.ready_len(), 1); // A espera a vez dela

    // mais um quantum inteiro: a CPU volta para A
    for _ in 0..5 {
        let mut env = IrqEnv {
            cpu: &mut machine,
            scheduler: None,
        };
        rr.on_irq(&frame, &mut env);
    }
    assert_eq!(machine.switches().last().unwrap().next, A);

    // um EOI por tick atendido
    assert_eq!(machine.eoi_counts().0, 10);
}
