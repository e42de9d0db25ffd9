//! Memory Management Errors
//!
//! Define os erros possíveis durante operações de memória.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    /// Nenhuma sequência contígua livre do tamanho pedido
    NoContiguousRun,
    /// Liberação de um frame que não é cabeça de sequência
    NotHeadOfSequence,
    /// Frame não pertence a nenhum pool registrado
    FrameNotOwned,
    /// Faixa fora dos limites do pool
    OutOfRange,
    /// Pool virtual sem espaço disponível
    PoolExhausted,
    /// Endereço não corresponde à base de nenhuma região
    NoSuchRegion,
    /// Page fault com página presente (violação de proteção)
    ProtectionFault,
    /// Endereço fora de todos os pools virtuais registrados
    IllegitimateAddress,
}

pub type MmResult<T> = Result<T, MmError>;
