//! Physical Memory Manager (PMM) — Pools de Frames Contíguos
//! ----------------------------------------------------------
//! Gerencia a alocação de frames físicos (4 KiB) em pools independentes,
//! com suporte a sequências contíguas. Cada pool mantém um mapa de estados
//! com **dois bits por frame** (quatro frames por byte), guardado na
//! própria memória física que administra:
//!
//! - `00` = `Free` — frame livre
//! - `01` = `Used` — frame alocado, continuação de uma sequência
//! - `11` = `HoS`  — Head-of-Sequence, primeiro frame de uma alocação
//!
//! ### Contratos / Invariantes
//! - Toda sequência alocada começa em exatamente um frame `HoS`; os frames
//!   `Used` seguintes pertencem a ela até o próximo `Free`/`HoS`.
//! - `release_frames` não recebe comprimento: a extensão da sequência é
//!   autodescritiva.
//! - Com `info_frame == 0` o mapa mora no início do próprio pool e os
//!   primeiros `needed_info_frames(n)` frames ficam reservados (marcados
//!   `HoS`+`Used` na construção).
//! - `free + frames alocados = n_frames` em qualquer ponto.
//!
//! A busca por sequência livre é linear, first-fit — simples e
//! determinística, adequada ao early-kernel.

use crate::hal::PhysMemory;
use crate::klib::align::div_ceil;
use crate::mm::config::FRAME_SIZE;
use crate::mm::{MmError, MmResult};
use alloc::vec::Vec;

/// Estado de um frame no mapa de dois bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Free,
    Used,
    HoS,
}

impl FrameState {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => FrameState::Free,
            0b11 => FrameState::HoS,
            _ => FrameState::Used,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            FrameState::Free => 0b00,
            FrameState::Used => 0b01,
            FrameState::HoS => 0b11,
        }
    }
}

/// Um pool de frames físicos contíguos `[base_frame, base_frame+n_frames)`.
pub struct FramePool {
    base_frame: u32,
    n_frames: u32,
    info_frame: u32,
    free_frames: u32,
}

impl FramePool {
    /// Constrói um pool.
    ///
    /// Com `info_frame == 0` o mapa de estados ocupa o início do próprio
    /// pool e os frames de gerência saem do jogo; caso contrário o mapa
    /// mora em `info_frame * FRAME_SIZE` e todos os frames nascem livres.
    pub fn new(mem: &mut dyn PhysMemory, base_frame: u32, n_frames: u32, info_frame: u32) -> Self {
        let mut pool = Self {
            base_frame,
            n_frames,
            info_frame,
            free_frames: n_frames,
        };

        // mapa inteiro zerado = todos os frames livres
        mem.zero(pool.map_base(), div_ceil(n_frames * 2, 8));

        if info_frame == 0 {
            let reserved = Self::needed_info_frames(n_frames);
            pool.mark_run(mem, 0, reserved);
            pool.free_frames -= reserved;
        }

        crate::kinfo!(
            "(PMM) Pool criado: base={:#x} frames={} info={:#x}",
            base_frame,
            n_frames,
            info_frame
        );

        pool
    }

    /// Quantos frames de gerência um pool de `n_frames` exige
    /// (dois bits por frame).
    pub fn needed_info_frames(n_frames: u32) -> u32 {
        div_ceil(n_frames * 2, FRAME_SIZE * 8)
    }

    fn map_base(&self) -> u32 {
        let frame = if self.info_frame == 0 {
            self.base_frame
        } else {
            self.info_frame
        };
        frame * FRAME_SIZE
    }

    /// Estado de um frame, por índice relativo ao pool.
    pub fn state(&self, mem: &dyn PhysMemory, frame: u32) -> FrameState {
        assert!(frame < self.n_frames, "(PMM) índice de frame fora do pool");
        let byte = mem.read_u8(self.map_base() + frame / 4);
        FrameState::from_bits(byte >> ((frame % 4) * 2))
    }

    fn set_state(&self, mem: &mut dyn PhysMemory, frame: u32, state: FrameState) {
        assert!(frame < self.n_frames, "(PMM) índice de frame fora do pool");
        let addr = self.map_base() + frame / 4;
        let shift = (frame % 4) * 2;
        let byte = mem.read_u8(addr);
        mem.write_u8(addr, (byte & !(0b11 << shift)) | (state.to_bits() << shift));
    }

    // marca `HoS` + `Used` a partir do índice relativo `start`
    fn mark_run(&mut self, mem: &mut dyn PhysMemory, start: u32, len: u32) {
        self.set_state(mem, start, FrameState::HoS);
        for i in 1..len {
            self.set_state(mem, start + i, FrameState::Used);
        }
    }

    /// Aloca a primeira sequência livre de `n` frames contíguos e retorna o
    /// número absoluto do frame cabeça.
    pub fn get_frames(&mut self, mem: &mut dyn PhysMemory, n: u32) -> MmResult<u32> {
        if n == 0 || n > self.free_frames {
            return Err(MmError::NoContiguousRun);
        }

        let mut run_start = 0u32;
        let mut run_len = 0u32;
        for idx in 0..self.n_frames {
            if self.state(mem, idx) == FrameState::Free {
                if run_len == 0 {
                    run_start = idx;
                }
                run_len += 1;
                if run_len == n {
                    self.mark_run(mem, run_start, n);
                    self.free_frames -= n;
                    return Ok(self.base_frame + run_start);
                }
            } else {
                run_len = 0;
            }
        }

        Err(MmError::NoContiguousRun)
    }

    /// Mesma contabilidade de `get_frames`, mas numa faixa escolhida pelo
    /// chamador (frames reservados a dispositivos, por exemplo). A faixa
    /// precisa caber inteira no pool.
    pub fn mark_inaccessible(
        &mut self,
        mem: &mut dyn PhysMemory,
        base_frame: u32,
        n: u32,
    ) -> MmResult<()> {
        if base_frame < self.base_frame
            || base_frame + n > self.base_frame + self.n_frames
            || n == 0
        {
            return Err(MmError::OutOfRange);
        }

        let start = base_frame - self.base_frame;
        // desconta apenas o que estava livre
        for i in 0..n {
            if self.state(mem, start + i) == FrameState::Free {
                self.free_frames -= 1;
            }
        }
        self.mark_run(mem, start, n);
        Ok(())
    }

    /// O frame (absoluto) pertence à janela deste pool?
    pub fn owns(&self, frame_no: u32) -> bool {
        frame_no >= self.base_frame && frame_no < self.base_frame + self.n_frames
    }

    // libera a sequência que começa no frame absoluto `first`
    fn release_run(&mut self, mem: &mut dyn PhysMemory, first: u32) -> MmResult<()> {
        let rel = first - self.base_frame;
        if self.state(mem, rel) != FrameState::HoS {
            return Err(MmError::NotHeadOfSequence);
        }

        self.set_state(mem, rel, FrameState::Free);
        self.free_frames += 1;

        let mut idx = rel + 1;
        while idx < self.n_frames && self.state(mem, idx) == FrameState::Used {
            self.set_state(mem, idx, FrameState::Free);
            self.free_frames += 1;
            idx += 1;
        }
        Ok(())
    }

    pub fn free_frames(&self) -> u32 {
        self.free_frames
    }

    pub fn n_frames(&self) -> u32 {
        self.n_frames
    }

    pub fn base_frame(&self) -> u32 {
        self.base_frame
    }
}

/// Identificador de um pool dentro do `FramePoolSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePoolId(usize);

/// Registro de todos os pools do processo.
///
/// É a versão explícita da lista estática de pools do desenho clássico:
/// `release_frames` localiza o pool dono conhecendo apenas o número do
/// frame, porque a extensão da sequência é autodescritiva no mapa.
pub struct FramePoolSet {
    pools: Vec<FramePool>,
}

impl FramePoolSet {
    pub const fn new() -> Self {
        Self { pools: Vec::new() }
    }

    /// Cria um pool e o registra no conjunto.
    pub fn create(
        &mut self,
        mem: &mut dyn PhysMemory,
        base_frame: u32,
        n_frames: u32,
        info_frame: u32,
    ) -> FramePoolId {
        let id = FramePoolId(self.pools.len());
        self.pools.push(FramePool::new(mem, base_frame, n_frames, info_frame));
        id
    }

    pub fn pool(&self, id: FramePoolId) -> &FramePool {
        &self.pools[id.0]
    }

    pub fn pool_mut(&mut self, id: FramePoolId) -> &mut FramePool {
        &mut self.pools[id.0]
    }

    pub fn get_frames(
        &mut self,
        mem: &mut dyn PhysMemory,
        id: FramePoolId,
        n: u32,
    ) -> MmResult<u32> {
        self.pools[id.0].get_frames(mem, n)
    }

    pub fn mark_inaccessible(
        &mut self,
        mem: &mut dyn PhysMemory,
        id: FramePoolId,
        base_frame: u32,
        n: u32,
    ) -> MmResult<()> {
        self.pools[id.0].mark_inaccessible(mem, base_frame, n)
    }

    /// Libera a sequência iniciada em `frame_no`, encontrando o pool dono
    /// pelo número do frame.
    pub fn release_frames(&mut self, mem: &mut dyn PhysMemory, frame_no: u32) -> MmResult<()> {
        for pool in self.pools.iter_mut() {
            if pool.owns(frame_no) {
                return pool.release_run(mem, frame_no);
            }
        }
        Err(MmError::FrameNotOwned)
    }
}
