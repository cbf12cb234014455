use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use aero_d3d11::{CompilerOptions, ShaderCache, ShaderCacheSource, StateObjectSet};
use aero_dxbc::test_utils::*;
use aero_dxbc::{ComponentMask, Opcode, ShaderStage};
use pretty_assertions::assert_eq;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BlendDesc {
    enable: bool,
    write_mask: u8,
}

#[test]
fn equal_descriptors_share_one_object() {
    let set: StateObjectSet<BlendDesc, String> = StateObjectSet::new();
    let desc = BlendDesc {
        enable: true,
        write_mask: 0xf,
    };
    let a = set.get_or_create(&desc, |d| format!("blend {:?}", d.write_mask));
    let b = set.get_or_create(&desc.clone(), |_| unreachable!("already created"));
    assert!(Arc::ptr_eq(&a, &b));

    let other = set.get_or_create(
        &BlendDesc {
            enable: false,
            write_mask: 0xf,
        },
        |_| "opaque".to_owned(),
    );
    assert!(!Arc::ptr_eq(&a, &other));
    assert_eq!(set.len(), 2);
}

#[test]
fn failed_creation_is_not_remembered() {
    let set: StateObjectSet<u32, u32> = StateObjectSet::new();
    let err = set
        .get_or_try_create(&7, |_| Err::<u32, _>("device lost"))
        .unwrap_err();
    assert_eq!(err, "device lost");
    assert!(set.is_empty());

    let value = set.get_or_try_create(&7, |&d| Ok::<_, &str>(d * 2)).unwrap();
    assert_eq!(*value, 14);
}

#[test]
fn concurrent_requests_create_once() {
    const THREADS: usize = 8;
    let set: Arc<StateObjectSet<u32, usize>> = Arc::new(StateObjectSet::new());
    let created = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let set = Arc::clone(&set);
            let created = Arc::clone(&created);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                set.get_or_create(&1, |_| created.fetch_add(1, Ordering::SeqCst))
            })
        })
        .collect();
    let objects: Vec<Arc<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(objects.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

fn shader_bytes(value: u32) -> Vec<u8> {
    let body = [
        dcl_temps(1),
        InstBuilder::new(Opcode::Mov)
            .operand(temp_dst(0, ComponentMask::X))
            .operand(imm32_scalar(value))
            .build(),
        ret(),
    ];
    tokens_to_bytes(&build_program(ShaderStage::Pixel, &body))
}

#[test]
fn shader_cache_hits_on_identical_bytecode() {
    let mut cache = ShaderCache::new(CompilerOptions::default());
    let first = cache.get_or_compile(&shader_bytes(1)).unwrap();
    let second = cache.get_or_compile(&shader_bytes(1)).unwrap();
    let third = cache.get_or_compile(&shader_bytes(2)).unwrap();

    assert_eq!(first.source, ShaderCacheSource::Translated);
    assert_eq!(second.source, ShaderCacheSource::Memory);
    assert_eq!(third.source, ShaderCacheSource::Translated);
    assert!(Arc::ptr_eq(&first.shader, &second.shader));

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 2, 2));
}

#[test]
fn shader_cache_keys_include_options() {
    let bytes = shader_bytes(1);
    let mut cache = ShaderCache::default();
    let default = cache.get_or_compile(&bytes).unwrap();

    cache.set_options(CompilerOptions {
        debug_names: false,
        ..CompilerOptions::default()
    });
    let stripped = cache.get_or_compile(&bytes).unwrap();
    assert_eq!(stripped.source, ShaderCacheSource::Translated);
    assert_ne!(
        default.shader.shader.code().len(),
        stripped.shader.shader.code().len()
    );

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(
        cache.get_or_compile(&bytes).unwrap().source,
        ShaderCacheSource::Translated
    );
}
