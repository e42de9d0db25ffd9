//! # File — cursor sequencial
//!
//! Um arquivo aberto é um cursor `(inode, posição)` com cache de um único
//! bloco. O cache é write-through: todo bloco modificado desce para o
//! disco imediatamente, então fechar o arquivo é um reforço de
//! consistência, não uma exigência de correção.

use super::error::{FsError, FsResult};
use super::file_system::{write_slot, FileSystem};
use super::inode::MAX_FILE_BLOCKS;
use crate::drivers::block::{BlockDevice, BLOCK_SIZE};

fn read_slot(block: &[u8], slot: usize) -> u32 {
    let off = slot * 4;
    u32::from_le_bytes([block[off], block[off + 1], block[off + 2], block[off + 3]])
}

/// Cursor de leitura/escrita sequencial sobre um arquivo.
pub struct File {
    inode_idx: usize,
    position: u32,
    /// Índice (no arquivo) do bloco atualmente em cache.
    cached_block: Option<u32>,
    cache: [u8; BLOCK_SIZE],
}

impl File {
    /// Abre um arquivo existente. O cursor nasce na posição 0 com o cache
    /// vazio.
    pub fn open(fs: &FileSystem, id: i32) -> FsResult<Self> {
        let inode_idx = fs.lookup_file(id).ok_or(FsError::FileNotFound)?;
        crate::kdebug!("(FS) Arquivo {} aberto", id);
        Ok(Self {
            inode_idx,
            position: 0,
            cached_block: None,
            cache: [0u8; BLOCK_SIZE],
        })
    }

    /// Lê a partir do cursor até encher `buf` ou alcançar o fim do
    /// arquivo. Retorna quantos bytes foram lidos.
    pub fn read(
        &mut self,
        fs: &FileSystem,
        dev: &mut dyn BlockDevice,
        buf: &mut [u8],
    ) -> FsResult<usize> {
        let inode = *fs.inode(self.inode_idx);
        if inode.indirect_block == 0 {
            return Ok(0);
        }

        let available = inode.file_length.saturating_sub(self.position) as usize;
        let to_read = buf.len().min(available);

        let mut slots = [0u8; BLOCK_SIZE];
        dev.read_block(inode.indirect_block, &mut slots)?;

        let mut done = 0usize;
        while done < to_read {
            let offset = (self.position as usize + done) % BLOCK_SIZE;
            let block_idx = (self.position as usize + done) / BLOCK_SIZE;
            if block_idx >= inode.num_blocks as usize {
                break;
            }
            let block_no = read_slot(&slots, block_idx);
            if block_no == 0 {
                break;
            }

            self.load_block(dev, block_idx as u32, block_no)?;

            let chunk = (BLOCK_SIZE - offset).min(to_read - done);
            buf[done..done + chunk].copy_from_slice(&self.cache[offset..offset + chunk]);
            done += chunk;
        }

        self.position += done as u32;
        Ok(done)
    }

    /// Escreve `buf` a partir do cursor, alocando blocos de dados sob
    /// demanda. A escrita é limitada ao tamanho máximo de arquivo e trunca
    /// se o disco ficar sem blocos livres. Retorna quantos bytes foram
    /// escritos.
    pub fn write(
        &mut self,
        fs: &mut FileSystem,
        dev: &mut dyn BlockDevice,
        buf: &[u8],
    ) -> FsResult<usize> {
        let indirect = fs.inode(self.inode_idx).indirect_block;
        if indirect == 0 {
            return Ok(0);
        }

        let max_file = (MAX_FILE_BLOCKS * BLOCK_SIZE) as u32;
        let to_write = buf.len().min(max_file.saturating_sub(self.position) as usize);

        let mut slots = [0u8; BLOCK_SIZE];
        dev.read_block(indirect, &mut slots)?;

        let mut done = 0usize;
        while done < to_write {
            let offset = (self.position as usize + done) % BLOCK_SIZE;
            let block_idx = (self.position as usize + done) / BLOCK_SIZE;

            if block_idx >= fs.inode(self.inode_idx).num_blocks as usize {
                // bloco novo; sem bloco livre, a escrita trunca aqui
                let Some(new_block) = fs.get_free_block() else {
                    crate::kwarn!("(FS) Sem blocos livres, escrita truncada");
                    break;
                };
                write_slot(&mut slots, block_idx, new_block);
                fs.mark_block_used(new_block);
                fs.inode_mut(self.inode_idx).num_blocks += 1;

                dev.write_block(new_block, &[0u8; BLOCK_SIZE])?;
                dev.write_block(indirect, &slots)?;
                fs.save_free_list(dev)?;
            }

            let block_no = read_slot(&slots, block_idx);
            self.load_block(dev, block_idx as u32, block_no)?;

            let chunk = (BLOCK_SIZE - offset).min(to_write - done);
            self.cache[offset..offset + chunk].copy_from_slice(&buf[done..done + chunk]);

            // write-through: o bloco modificado desce imediatamente
            dev.write_block(block_no, &self.cache)?;
            done += chunk;
        }

        self.position += done as u32;
        if self.position > fs.inode(self.inode_idx).file_length {
            fs.inode_mut(self.inode_idx).file_length = self.position;
        }
        fs.save_inodes(dev)?;
        Ok(done)
    }

    // carrega `block_no` no cache se o bloco `block_idx` ainda não estiver
    fn load_block(
        &mut self,
        dev: &mut dyn BlockDevice,
        block_idx: u32,
        block_no: u32,
    ) -> FsResult<()> {
        if self.cached_block != Some(block_idx) {
            dev.read_block(block_no, &mut self.cache)?;
            self.cached_block = Some(block_idx);
        }
        Ok(())
    }

    /// Volta o cursor ao início e invalida o cache.
    pub fn reset(&mut self) {
        self.position = 0;
        self.cached_block = None;
    }

    /// O cursor alcançou o fim do arquivo?
    pub fn eof(&self, fs: &FileSystem) -> bool {
        self.position >= fs.inode(self.inode_idx).file_length
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    /// Fecha o arquivo: desce o bloco em cache e persiste a tabela de
    /// inodes. Com o cache write-through isto é um reforço, mas mantém o
    /// contrato de que nada fica só em memória depois do fechamento.
    pub fn close(self, fs: &FileSystem, dev: &mut dyn BlockDevice) -> FsResult<()> {
        if let Some(block_idx) = self.cached_block {
            let inode = fs.inode(self.inode_idx);
            if inode.indirect_block != 0 && block_idx < inode.num_blocks {
                let mut slots = [0u8; BLOCK_SIZE];
                dev.read_block(inode.indirect_block, &mut slots)?;
                let block_no = read_slot(&slots, block_idx as usize);
                if block_no != 0 {
                    dev.write_block(block_no, &self.cache)?;
                }
            }
            fs.save_inodes(dev)?;
        }
        crate::kdebug!("(FS) Arquivo fechado");
        Ok(())
    }
}
