//! Basalt Kernel Library.
//!
//! Núcleo didático de um kernel x86 (modo protegido, 32 bits): pools de
//! frames físicos contíguos, paginação de dois níveis sob demanda, pools de
//! endereço virtual por processo, escalonamento cooperativo e round-robin,
//! cliente de disco dirigido por interrupção e um sistema de arquivos em
//! blocos.
//!
//! Todo acesso a hardware passa pelos traits estreitos de `hal` (portas de
//! E/S, registradores de controle, troca de contexto, memória física), então
//! o núcleo inteiro pode ser exercitado em testes de host contra a máquina
//! por software de `hal::machine`.

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (necessário para Vec/VecDeque/Box)
extern crate alloc;

// --- Módulos de Baixo Nível (Hardware) ---
pub mod drivers; // Drivers (PIC, PIT, ATA)
pub mod hal; // Interfaces de hardware e máquina por software

// --- Módulos Centrais (Lógica do Kernel) ---
pub mod core; // Logging, contexto do kernel, roteamento de IRQs
pub mod klib; // Utilitários internos (alinhamento)
pub mod mm; // Gerenciamento de Memória (PMM, VMM, VM pools)
pub mod sched; // Escalonadores e threads

// --- Subsistemas ---
pub mod fs; // Sistema de arquivos em blocos
