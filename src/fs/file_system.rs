//! # FileSystem — layout e alocação
//!
//! Administra a tabela de inodes (bloco 0) e o mapa de blocos livres
//! (bloco 1, um byte por bloco: 0 = livre, 1 = ocupado; os bytes 0 e 1 são
//! sempre 1). Toda mutação desce para o disco em seguida — não há estado
//! sujo entre operações.
//!
//! O mapa inteiro precisa caber no bloco 1, o que limita o disco a 512
//! blocos (256 KiB). Suficiente de sobra para o propósito didático.

use super::error::{FsError, FsResult};
use super::inode::{Inode, INODE_SIZE, MAX_INODES};
use crate::drivers::block::{BlockDevice, BLOCK_SIZE};
use alloc::vec::Vec;

fn read_slot(block: &[u8], slot: usize) -> u32 {
    let off = slot * 4;
    u32::from_le_bytes([block[off], block[off + 1], block[off + 2], block[off + 3]])
}

pub(crate) fn write_slot(block: &mut [u8], slot: usize, value: u32) {
    block[slot * 4..slot * 4 + 4].copy_from_slice(&value.to_le_bytes());
}

/// Sistema de arquivos montado: tabela de inodes e mapa de livres em
/// memória, espelhados no disco a cada mutação.
pub struct FileSystem {
    total_blocks: u32,
    inodes: [Inode; MAX_INODES],
    free_map: Vec<u8>,
}

impl FileSystem {
    /// Formata o disco: zera a tabela de inodes, marca os blocos 0 e 1
    /// como ocupados e o resto como livre.
    pub fn format(dev: &mut dyn BlockDevice, size: u32) -> FsResult<()> {
        let total = size / BLOCK_SIZE as u32;
        debug_assert!(
            total as usize <= BLOCK_SIZE,
            "(FS) mapa de livres não cabe no bloco 1"
        );

        let zeroed = [0u8; BLOCK_SIZE];
        dev.write_block(0, &zeroed)?;

        let mut map_block = [0u8; BLOCK_SIZE];
        map_block[0] = 1;
        map_block[1] = 1;
        dev.write_block(1, &map_block)?;

        crate::kinfo!("(FS) Disco formatado: {} blocos", total);
        Ok(())
    }

    /// Monta o sistema de arquivos: carrega inodes e mapa de livres.
    pub fn mount(dev: &mut dyn BlockDevice) -> FsResult<Self> {
        let total = dev.total_blocks();
        let mut buf = [0u8; BLOCK_SIZE];

        dev.read_block(0, &mut buf)?;
        let mut inodes = [Inode::empty(); MAX_INODES];
        for (i, inode) in inodes.iter_mut().enumerate() {
            *inode = Inode::decode(&buf[i * INODE_SIZE..]);
        }

        dev.read_block(1, &mut buf)?;
        let free_map = buf[..total as usize].to_vec();

        crate::kinfo!("(FS) Montado: {} blocos", total);
        Ok(Self {
            total_blocks: total,
            inodes,
            free_map,
        })
    }

    /// Índice do inode com `id`, por varredura linear.
    pub fn lookup_file(&self, id: i32) -> Option<usize> {
        if id == 0 {
            return None;
        }
        self.inodes.iter().position(|inode| inode.id == id)
    }

    /// Cria um arquivo vazio: um inode livre + um bloco indireto zerado.
    pub fn create_file(&mut self, dev: &mut dyn BlockDevice, id: i32) -> FsResult<()> {
        if id == 0 {
            return Err(FsError::InvalidId);
        }
        if self.lookup_file(id).is_some() {
            return Err(FsError::DuplicateId);
        }

        let slot = self
            .inodes
            .iter()
            .position(|inode| inode.is_free())
            .ok_or(FsError::NoFreeInode)?;
        let indirect = self.get_free_block().ok_or(FsError::NoFreeBlock)?;

        // o bloco indireto nasce zerado no disco: slot 0 = vazio
        dev.write_block(indirect, &[0u8; BLOCK_SIZE])?;
        self.free_map[indirect as usize] = 1;
        self.inodes[slot] = Inode {
            id,
            indirect_block: indirect,
            num_blocks: 0,
            file_length: 0,
        };

        self.save_inodes(dev)?;
        self.save_free_list(dev)?;
        crate::kdebug!("(FS) Arquivo {} criado (indireto={})", id, indirect);
        Ok(())
    }

    /// Apaga um arquivo: libera todos os blocos de dados, o indireto e o
    /// inode.
    pub fn delete_file(&mut self, dev: &mut dyn BlockDevice, id: i32) -> FsResult<()> {
        let idx = self.lookup_file(id).ok_or(FsError::FileNotFound)?;
        let inode = self.inodes[idx];

        if inode.indirect_block != 0 {
            let mut slots = [0u8; BLOCK_SIZE];
            dev.read_block(inode.indirect_block, &mut slots)?;
            for slot in 0..inode.num_blocks as usize {
                let block = read_slot(&slots, slot);
                if block != 0 {
                    self.free_map[block as usize] = 0;
                }
            }
            self.free_map[inode.indirect_block as usize] = 0;
        }

        self.inodes[idx] = Inode::empty();
        self.save_inodes(dev)?;
        self.save_free_list(dev)?;
        crate::kdebug!("(FS) Arquivo {} apagado", id);
        Ok(())
    }

    /// Primeiro bloco livre a partir do 2 (first-fit).
    pub fn get_free_block(&self) -> Option<u32> {
        (2..self.total_blocks).find(|&b| self.free_map[b as usize] == 0)
    }

    /// `n` blocos livres, tudo-ou-nada.
    pub fn get_free_blocks(&self, n: usize) -> Option<Vec<u32>> {
        let mut found = Vec::with_capacity(n);
        for block in 2..self.total_blocks {
            if found.len() == n {
                break;
            }
            if self.free_map[block as usize] == 0 {
                found.push(block);
            }
        }
        (found.len() == n).then_some(found)
    }

    /// Persiste a tabela de inodes no bloco 0.
    pub fn save_inodes(&self, dev: &mut dyn BlockDevice) -> FsResult<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        for (i, inode) in self.inodes.iter().enumerate() {
            inode.encode(&mut buf[i * INODE_SIZE..i * INODE_SIZE + INODE_SIZE]);
        }
        dev.write_block(0, &buf)?;
        Ok(())
    }

    /// Persiste o mapa de livres no bloco 1.
    pub fn save_free_list(&self, dev: &mut dyn BlockDevice) -> FsResult<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..self.free_map.len()].copy_from_slice(&self.free_map);
        dev.write_block(1, &buf)?;
        Ok(())
    }

    pub fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    /// Blocos livres restantes no mapa.
    pub fn free_block_count(&self) -> u32 {
        self.free_map.iter().filter(|&&b| b == 0).count() as u32
    }

    pub fn inode(&self, idx: usize) -> &Inode {
        &self.inodes[idx]
    }

    pub(crate) fn inode_mut(&mut self, idx: usize) -> &mut Inode {
        &mut self.inodes[idx]
    }

    pub(crate) fn mark_block_used(&mut self, block: u32) {
        self.free_map[block as usize] = 1;
    }
}
