//! Dispositivos de Bloco.

pub mod ata;
pub mod nonblocking;
pub mod traits;


pub use ata::AtaDrive;
pub use nonblocking::NonBlockingAta;
pub use traits::{BlockDevice, BlockError, BLOCK_SIZE};
