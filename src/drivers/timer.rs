//! # PIT 8254 — Programação do Canal 0
//!
//! O oscilador de entrada corre a ~1.19 MHz; o canal 0 divide essa base e
//! gera a IRQ 0 periódica que alimenta o round-robin.

use crate::hal::PortIo;

// Portas de I/O do PIT
const PIT_CHANNEL0: u16 = 0x40; // Channel 0 data (System Timer)
const PIT_COMMAND: u16 = 0x43; // Command register

/// Frequência base do oscilador.
pub const PIT_BASE_FREQ: u32 = 1_193_180;

/// Programa o canal 0 em modo rate generator para `freq_hz` interrupções
/// por segundo.
///
/// O divisor é de 16 bits, então frequências abaixo de ~19 Hz saturam em
/// 65535. Retorna a frequência real obtida (0 se o pedido for inválido).
pub fn program_interval(ports: &mut dyn PortIo, freq_hz: u32) -> u32 {
    if freq_hz == 0 || freq_hz > PIT_BASE_FREQ {
        return 0;
    }

    let divisor = (PIT_BASE_FREQ / freq_hz).min(65535) as u16;

    // 0x34 = canal 0, acesso lobyte/hibyte, modo 2 (rate generator)
    ports.outb(PIT_COMMAND, 0x34);
    ports.outb(PIT_CHANNEL0, (divisor & 0xFF) as u8);
    ports.outb(PIT_CHANNEL0, (divisor >> 8) as u8);

    PIT_BASE_FREQ / divisor as u32
}
