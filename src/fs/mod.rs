//! # Sistema de Arquivos em Blocos
//!
//! Sistema de arquivos de disco único com identificadores numéricos:
//!
//! - bloco 0 — tabela fixa de inodes (32 registros de 16 bytes);
//! - bloco 1 — mapa de blocos livres, um byte por bloco;
//! - um bloco indireto por arquivo, listando até 128 blocos de dados;
//! - blocos >= 2 — dados.
//!
//! `FileSystem` cuida do layout e da alocação; `File` é um cursor
//! sequencial com cache write-through de um bloco. O acesso ao disco passa
//! pelo trait `BlockDevice`, entregue a cada operação — o sistema de
//! arquivos não serializa nada: a disciplina cooperativa dos chamadores é
//! quem garante exclusão.

pub mod error;
pub mod file;
pub mod file_system;
pub mod inode;

#[cfg(test)]
mod test;

pub use error::{FsError, FsResult};
pub use file::File;
pub use file_system::FileSystem;
pub use inode::{Inode, MAX_FILE_BLOCKS, MAX_INODES};
