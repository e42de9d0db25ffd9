//! Erros do Sistema de Arquivos.

use crate::drivers::block::BlockError;
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Id reservado (0) ou inválido
    InvalidId,
    /// Já existe arquivo com este id
    DuplicateId,
    /// Tabela de inodes cheia
    NoFreeInode,
    /// Sem blocos livres no disco
    NoFreeBlock,
    /// Id não encontrado
    FileNotFound,
    /// Falha no dispositivo de bloco
    Device(BlockError),
}

pub type FsResult<T> = Result<T, FsError>;

impl From<BlockError> for FsError {
    fn from(e: BlockError) -> Self {
        FsError::Device(e)
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::InvalidId => write!(f, "Id de arquivo inválido"),
            FsError::DuplicateId => write!(f, "Id de arquivo já existe"),
            FsError::NoFreeInode => write!(f, "Tabela de inodes cheia"),
            FsError::NoFreeBlock => write!(f, "Sem blocos livres"),
            FsError::FileNotFound => write!(f, "Arquivo não encontrado"),
            FsError::Device(e) => write!(f, "Erro de dispositivo: {}", e),
        }
    }
}
