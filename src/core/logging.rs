//! Sistema de Logging do Kernel
//! ============================
//!
//! Logger com filtragem por nível e destino plugável. O núcleo nunca
//! assume para onde o texto vai: o embedder registra um sink (serial,
//! console de vídeo, stdout nos testes) e os macros `kerror!`..`ktrace!`
//! escrevem através dele.
//!
//! # Níveis de Log
//! - `ERROR`: Erros críticos (sempre visíveis)
//! - `WARN`: Situações suspeitas
//! - `INFO`: Fluxo normal de execução
//! - `DEBUG`: Informações de debug
//! - `TRACE`: Detalhes extremos
//!
//! Zero alocações durante o log: a mensagem desce como `fmt::Arguments`.

use core::fmt;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use spin::Mutex;

/// Níveis de log - valores menores = mais críticos.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Prefixo textual do nível.
    #[inline]
    pub fn prefix(self) -> &'static str {
        match self {
            LogLevel::Error => "[ERRO]",
            LogLevel::Warn => "[WARN]",
            LogLevel::Info => "[INFO]",
            LogLevel::Debug => "[DEBG]",
            LogLevel::Trace => "[TRAC]",
        }
    }
}

// Configuração global
// - Feature 'verbose_logs' (Cargo.toml): nível Trace (todos os logs)
// - Sem feature: nível Info
#[cfg(feature = "verbose_logs")]
static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Trace as u8);

#[cfg(not(feature = "verbose_logs"))]
static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

static LOG_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Destino das mensagens já filtradas por nível.
type Sink = fn(LogLevel, fmt::Arguments);

static LOG_SINK: Mutex<Option<Sink>> = Mutex::new(None);

/// Logger global do kernel.
pub struct KernelLogger;

impl KernelLogger {
    /// Log com nível específico.
    pub fn log(level: LogLevel, args: fmt::Arguments) {
        let current = GLOBAL_LOG_LEVEL.load(Ordering::Relaxed);
        if (level as u8) > current {
            return;
        }

        LOG_COUNTER.fetch_add(1, Ordering::Relaxed);

        if let Some(sink) = *LOG_SINK.lock() {
            sink(level, args);
        }
    }

    /// Registra o destino das mensagens.
    pub fn set_sink(sink: Sink) {
        *LOG_SINK.lock() = Some(sink);
    }

    pub fn clear_sink() {
        *LOG_SINK.lock() = None;
    }

    /// Define o nível mínimo de log.
    pub fn set_level(level: LogLevel) {
        GLOBAL_LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level() -> LogLevel {
        match GLOBAL_LOG_LEVEL.load(Ordering::Relaxed) {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Total de mensagens aceitas desde o boot.
    pub fn message_count() -> u64 {
        LOG_COUNTER.load(Ordering::Relaxed)
    }
}

// === MACROS ===

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => ($crate::core::logging::KernelLogger::log(
        $crate::core::logging::LogLevel::Error,
        format_args!($($arg)*)
    ));
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => ($crate::core::logging::KernelLogger::log(
        $crate::core::logging::LogLevel::Warn,
        format_args!($($arg)*)
    ));
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => ($crate::core::logging::KernelLogger::log(
        $crate::core::logging::LogLevel::Info,
        format_args!($($arg)*)
    ));
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => ($crate::core::logging::KernelLogger::log(
        $crate::core::logging::LogLevel::Debug,
        format_args!($($arg)*)
    ));
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => ($crate::core::logging::KernelLogger::log(
        $crate::core::logging::LogLevel::Trace,
        format_args!($($arg)*)
    ));
}
