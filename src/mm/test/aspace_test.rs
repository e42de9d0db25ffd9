//! Testes dos VM pools (regiões de endereço virtual).

use crate::hal::machine::SoftMachine;
use crate::mm::aspace::VmPoolSet;
use crate::mm::fault::{handle_page_fault, PageFaultInfo};
use crate::mm::pmm::FramePoolSet;
use crate::mm::vmm::{PageTable, PagingConfig};
use crate::mm::{MmError, PAGE_SIZE};

const BASE: u32 = 0x4000_0000;
const SIZE: u32 = 16 * 1024 * 1024;

struct Fixture {
    mem: SoftMachine,
    paging: SoftMachine,
    pools: FramePoolSet,
    config: PagingConfig,
    page_table: PageTable,
    vm_pools: VmPoolSet,
    pool: crate::mm::aspace::VmPoolId,
}

fn fixture() -> Fixture {
    let mut mem = SoftMachine::new(8 * 1024 * 1024, 1);
    let paging = mem.clone();
    let mut pools = FramePoolSet::new();
    let kernel = pools.create(&mut mem, 0x200, 0x100, 0);
    let process = pools.create(&mut mem, 0x300, 0x100, 0);
    let config = PagingConfig {
        kernel_pool: kernel,
        process_pool: process,
        shared_size: 4 * 1024 * 1024,
    };
    let mut page_table = PageTable::new(&mut mem, &mut pools, config).unwrap();
    let mut vm_pools = VmPoolSet::new();
    let pool = vm_pools.create(BASE, SIZE, process, &mut page_table);
    Fixture {
        mem,
        paging,
        pools,
        config,
        page_table,
        vm_pools,
        pool,
    }
}

#[test]
fn alocacoes_empacotadas_na_ordem() {
    let mut fx = fixture();
    let pool = fx.vm_pools.pool_mut(fx.pool);

    // a primeira página é a região 0 (metadados)
    assert_eq!(pool.available(), SIZE - PAGE_SIZE);

    let a = pool.allocate(PAGE_SIZE).unwrap();
    let b = pool.allocate(2 * PAGE_SIZE).unwrap();
    let c = pool.allocate(3 * PAGE_SIZE - 100).unwrap();

    assert_eq!(a, BASE + 0x1000);
    assert_eq!(b, BASE + 0x2000);
    assert_eq!(c, BASE + 0x4000);
    assert_eq!(pool.available(), SIZE - PAGE_SIZE - 0x6000);
}

#[test]
fn contabilidade_fecha_sempre() {
    let mut fx = fixture();
    let pool = fx.vm_pools.pool_mut(fx.pool);

    pool.allocate(10).unwrap();
    pool.allocate(PAGE_SIZE + 1).unwrap();
    pool.allocate(5 * PAGE_SIZE).unwrap();

    let total: u32 = pool.regions().iter().map(|r| r.length).sum();
    assert_eq!(pool.available() + total, SIZE);

    // regiões ordenadas e sem sobreposição
    let regions = pool.regions();
    for pair in regions.windows(2) {
        assert!(pair[0].base + pair[0].length <= pair[1].base);
    }
}

#[test]
fn release_devolve_paginas_e_espaco() {
    let mut fx = fixture();

    let region = fx.vm_pools.pool_mut(fx.pool).allocate(2 * PAGE_SIZE).unwrap();

    // materializa as duas páginas via fault handler
    for offset in [0, PAGE_SIZE] {
        handle_page_fault(
            &mut fx.page_table,
            &fx.vm_pools,
            &mut fx.pools,
            &mut fx.mem,
            &mut fx.paging,
            PageFaultInfo::new(region + offset, 0),
        )
        .unwrap();
    }

    let process_before = fx.pools.pool(fx.config.process_pool).free_frames();
    let available_before = fx.vm_pools.pool(fx.pool).available();

    fx.vm_pools
        .pool_mut(fx.pool)
        .release(
            region,
            &mut fx.page_table,
            &mut fx.pools,
            &mut fx.mem,
            &mut fx.paging,
        )
        .unwrap();

    assert_eq!(
        fx.pools.pool(fx.config.process_pool).free_frames(),
        process_before + 2
    );
    assert_eq!(
        fx.vm_pools.pool(fx.pool).available(),
        available_before + 2 * PAGE_SIZE
    );
}

#[test]
fn release_tolera_paginas_nunca_tocadas() {
    let mut fx = fixture();

    let region = fx.vm_pools.pool_mut(fx.pool).allocate(3 * PAGE_SIZE).unwrap();
    let process_before = fx.pools.pool(fx.config.process_pool).free_frames();

    // nenhuma página sofreu fault: liberar não devolve frames, só espaço
    fx.vm_pools
        .pool_mut(fx.pool)
        .release(
            region,
            &mut fx.page_table,
            &mut fx.pools,
            &mut fx.mem,
            &mut fx.paging,
        )
        .unwrap();

    assert_eq!(
        fx.pools.pool(fx.config.process_pool).free_frames(),
        process_before
    );
}

#[test]
fn release_exige_base_exata() {
    let mut fx = fixture();

    let region = fx.vm_pools.pool_mut(fx.pool).allocate(2 * PAGE_SIZE).unwrap();

    // endereço contido na região, mas que não é a base
    let result = fx.vm_pools.pool_mut(fx.pool).release(
        region + PAGE_SIZE,
        &mut fx.page_table,
        &mut fx.pools,
        &mut fx.mem,
        &mut fx.paging,
    );
    assert_eq!(result, Err(MmError::NoSuchRegion));

    // a página de metadados nunca é liberável
    let result = fx.vm_pools.pool_mut(fx.pool).release(
        BASE,
        &mut fx.page_table,
        &mut fx.pools,
        &mut fx.mem,
        &mut fx.paging,
    );
    assert_eq!(result, Err(MmError::NoSuchRegion));
}

#[test]
fn esgotamento_do_pool() {
    let mut fx = fixture();
    let pool = fx.vm_pools.pool_mut(fx.pool);

    assert_eq!(pool.allocate(SIZE), Err(MmError::PoolExhausted));

    // tudo menos a página de metadados cabe
    pool.allocate(SIZE - PAGE_SIZE).unwrap();
    assert_eq!(pool.available(), 0);
    assert_eq!(pool.allocate(1), Err(MmError::PoolExhausted));
}

#[test]
fn janela_de_legitimidade() {
    let fx = fixture();
    let pool = fx.vm_pools.pool(fx.pool);

    assert!(pool.is_legitimate(BASE));
    assert!(pool.is_legitimate(BASE + SIZE - 1));
    assert!(!pool.is_legitimate(BASE - 1));
    assert!(!pool.is_legitimate(BASE + SIZE));
}
