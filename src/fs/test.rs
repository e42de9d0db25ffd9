//! Testes do sistema de arquivos.

use super::error::FsError;
use super::file::File;
use super::file_system::FileSystem;
use super::inode::MAX_FILE_BLOCKS;
use crate::drivers::block::{AtaDrive, BlockDevice, BLOCK_SIZE};
use crate::hal::machine::SoftMachine;
use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

fn disk(blocks: u32) -> (SoftMachine, AtaDrive) {
    let m = SoftMachine::new(0, blocks as usize);
    let drive = AtaDrive::new(Box::new(m.clone()), blocks * BLOCK_SIZE as u32);
    (m, drive)
}

fn fresh_fs(blocks: u32) -> (SoftMachine, AtaDrive, FileSystem) {
    let (m, mut drive) = disk(blocks);
    FileSystem::format(&mut drive, blocks * BLOCK_SIZE as u32).unwrap();
    let fs = FileSystem::mount(&mut drive).unwrap();
    (m, drive, fs)
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn format_reserva_blocos_de_metadados() {
    let (_m, _drive, fs) = fresh_fs(64);

    assert_eq!(fs.total_blocks(), 64);
    // blocos 0 (inodes) e 1 (mapa) ocupados, resto livre
    assert_eq!(fs.free_block_count(), 62);
    assert_eq!(fs.lookup_file(7), None);
}

#[test]
fn criacao_consome_inode_e_bloco_indireto() {
    let (m, mut drive, mut fs) = fresh_fs(64);

    fs.create_file(&mut drive, 7).unwrap();
    assert!(fs.lookup_file(7).is_some());
    assert_eq!(fs.free_block_count(), 61);

    // o bloco indireto nasce zerado no disco
    let idx = fs.lookup_file(7).unwrap();
    let indirect = fs.inode(idx).indirect_block;
    assert!(indirect >= 2);
    assert!(m.disk_block(indirect).iter().all(|&b| b == 0));

    // id duplicado e id reservado
    assert_eq!(fs.create_file(&mut drive, 7), Err(FsError::DuplicateId));
    assert_eq!(fs.create_file(&mut drive, 0), Err(FsError::InvalidId));
}

#[test]
fn arquivo_de_2048_bytes_ocupa_4_blocos() {
    let (_m, mut drive, mut fs) = fresh_fs(64);
    let livres = fs.free_block_count();

    fs.create_file(&mut drive, 42).unwrap();
    let mut file = File::open(&fs, 42).unwrap();
    let data = pattern(2048);
    assert_eq!(file.write(&mut fs, &mut drive, &data).unwrap(), 2048);

    let idx = fs.lookup_file(42).unwrap();
    assert_eq!(fs.inode(idx).num_blocks, 4);
    assert_eq!(fs.inode(idx).file_length, 2048);
    // 1 indireto + 4 de dados
    assert_eq!(fs.free_block_count(), livres - 5);

    // apagar devolve os 5 blocos
    fs.delete_file(&mut drive, 42).unwrap();
    assert_eq!(fs.free_block_count(), livres);
    assert_eq!(fs.lookup_file(42), None);
}

#[test]
fn escrita_e_leitura_fecham_o_ciclo() {
    let (_m, mut drive, mut fs) = fresh_fs(64);

    fs.create_file(&mut drive, 1).unwrap();
    let mut file = File::open(&fs, 1).unwrap();

    // 1300 bytes cruzam três blocos
    let data = pattern(1300);
    assert_eq!(file.write(&mut fs, &mut drive, &data).unwrap(), 1300);
    assert!(file.eof(&fs));

    file.reset();
    assert_eq!(file.position(), 0);
    assert!(!file.eof(&fs));

    let mut back = vec![0u8; 1300];
    assert_eq!(file.read(&fs, &mut drive, &mut back).unwrap(), 1300);
    assert_eq!(back, data);
    assert!(file.eof(&fs));

    // ler além do fim devolve zero bytes
    let mut extra = [0u8; 64];
    assert_eq!(file.read(&fs, &mut drive, &mut extra).unwrap(), 0);

    file.close(&fs, &mut drive).unwrap();
}

#[test]
fn leitura_parcial_respeita_o_comprimento() {
    let (_m, mut drive, mut fs) = fresh_fs(64);

    fs.create_file(&mut drive, 3).unwrap();
    let mut file = File::open(&fs, 3).unwrap();
    file.write(&mut fs, &mut drive, &pattern(700)).unwrap();
    file.reset();

    // pede mais do que existe: clampa em file_length
    let mut buf = vec![0u8; 4096];
    assert_eq!(file.read(&fs, &mut drive, &mut buf).unwrap(), 700);
}

#[test]
fn escrita_trunca_sem_blocos_livres() {
    // 6 blocos: 0 e 1 reservados, 1 indireto, sobram 3 para dados
    let (_m, mut drive, mut fs) = fresh_fs(6);

    fs.create_file(&mut drive, 9).unwrap();
    let mut file = File::open(&fs, 9).unwrap();

    let data = pattern(4 * BLOCK_SIZE);
    let written = file.write(&mut fs, &mut drive, &data).unwrap();
    assert_eq!(written, 3 * BLOCK_SIZE);

    let idx = fs.lookup_file(9).unwrap();
    assert_eq!(fs.inode(idx).file_length, 3 * BLOCK_SIZE as u32);
    assert_eq!(fs.free_block_count(), 0);

    // o que entrou é recuperável
    file.reset();
    let mut back = vec![0u8; 4 * BLOCK_SIZE];
    assert_eq!(file.read(&fs, &mut drive, &mut back).unwrap(), 3 * BLOCK_SIZE);
    assert_eq!(&back[..3 * BLOCK_SIZE], &data[..3 * BLOCK_SIZE]);
}

#[test]
fn arquivo_para_no_tamanho_maximo() {
    let (_m, mut drive, mut fs) = fresh_fs(192);

    fs.create_file(&mut drive, 5).unwrap();
    let mut file = File::open(&fs, 5).unwrap();

    let max = MAX_FILE_BLOCKS * BLOCK_SIZE;
    let data = pattern(max + 100);
    assert_eq!(file.write(&mut fs, &mut drive, &data).unwrap(), max);

    // cursor no limite: nada mais entra
    assert_eq!(file.write(&mut fs, &mut drive, &[1, 2, 3]).unwrap(), 0);

    let idx = fs.lookup_file(5).unwrap();
    assert_eq!(fs.inode(idx).num_blocks as usize, MAX_FILE_BLOCKS);
    assert_eq!(fs.inode(idx).file_length as usize, max);
}

#[test]
fn conteudo_sobrevive_a_remontagem() {
    let (_m, mut drive, mut fs) = fresh_fs(64);

    fs.create_file(&mut drive, 11).unwrap();
    let mut file = File::open(&fs, 11).unwrap();
    let data = pattern(900);
    file.write(&mut fs, &mut drive, &data).unwrap();
    file.close(&fs, &mut drive).unwrap();
    drop(fs);

    // remonta do zero a partir do mesmo disco
    let mut fs2 = FileSystem::mount(&mut drive).unwrap();
    let mut file = File::open(&fs2, 11).unwrap();
    let mut back = vec![0u8; 900];
    assert_eq!(file.read(&fs2, &mut drive, &mut back).unwrap(), 900);
    assert_eq!(back, data);

    // e o mapa de livres também persistiu
    fs2.create_file(&mut drive, 12).unwrap();
    assert!(fs2.lookup_file(12).is_some());
}

#[test]
fn blocos_apagados_sao_realocaveis() {
    let (_m, mut drive, mut fs) = fresh_fs(16);

    fs.create_file(&mut drive, 1).unwrap();
    let first_indirect = fs.inode(fs.lookup_file(1).unwrap()).indirect_block;
    fs.delete_file(&mut drive, 1).unwrap();

    // first-fit: o mesmo bloco volta a servir
    fs.create_file(&mut drive, 2).unwrap();
    assert_eq!(
        fs.inode(fs.lookup_file(2).unwrap()).indirect_block,
        first_indirect
    );
}

#[test]
fn lote_de_blocos_livres_e_tudo_ou_nada() {
    let (_m, mut drive, mut fs) = fresh_fs(8);
    fs.create_file(&mut drive, 1).unwrap();

    // 8 blocos - 2 reservados - 1 indireto = 5 livres
    assert_eq!(fs.get_free_blocks(5).unwrap().len(), 5);
    assert_eq!(fs.get_free_blocks(6), None);
}

#[test]
fn arquivo_vazio() {
    let (_m, mut drive, mut fs) = fresh_fs(16);

    fs.create_file(&mut drive, 4).unwrap();
    let mut file = File::open(&fs, 4).unwrap();

    assert!(file.eof(&fs));
    let mut buf = [0u8; 32];
    assert_eq!(file.read(&fs, &mut drive, &mut buf).unwrap(), 0);

    assert_eq!(File::open(&fs, 99).err(), Some(FsError::FileNotFound));
}

#[test]
fn tabela_de_inodes_esgota() {
    let (_m, mut drive, mut fs) = fresh_fs(192);

    // 32 slots na tabela do bloco 0
    for id in 1..=32 {
        fs.create_file(&mut drive, id).unwrap();
    }
    assert_eq!(fs.create_file(&mut drive, 33), Err(FsError::NoFreeInode));
}
