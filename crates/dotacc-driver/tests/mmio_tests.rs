//! Register protocol over a real mapping
//!
//! A regular file stands in for the device node: `MappedRegion` maps it with
//! the same mmap path it uses for `/dev/mem`. The file has no datapath, so
//! the result register reads back whatever was last stored there.

use dotacc_driver::chip::{RegisterMap, BLOCK_SIZE};
use dotacc_driver::{
    select_backend, to_fixed, AccelConfig, AccelError, BackendSelection, ChunkBackend,
    HardwareBackend, MappedRegion, RegisterIo,
};
use std::os::unix::fs::FileExt;

const BASE: u64 = 0x3000;

fn device_file() -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().expect("tempfile");
    file.as_file().set_len(0x4000).expect("set_len");
    file
}

fn word_at(file: &tempfile::NamedTempFile, offset: u64) -> i32 {
    let mut buf = [0u8; 4];
    file.as_file().read_exact_at(&mut buf, offset).expect("read");
    i32::from_ne_bytes(buf)
}

#[test]
fn register_writes_land_at_stride() {
    let file = device_file();
    let region = MappedRegion::map(file.path(), BASE, BLOCK_SIZE).unwrap();
    let mut hw = HardwareBackend::new(region);
    hw.set_inputs(&[1.0, -2.0, 0.5, 3.0], 4);
    hw.set_weights(&[0.25, 0.0], 2);

    let map = RegisterMap::DEFAULT;
    assert_eq!(word_at(&file, BASE + map.input_word(0) as u64), to_fixed(1.0, 16));
    assert_eq!(word_at(&file, BASE + map.input_word(1) as u64), to_fixed(-2.0, 16));
    assert_eq!(word_at(&file, BASE + map.input_word(3) as u64), to_fixed(3.0, 16));
    assert_eq!(word_at(&file, BASE + map.weight_word(0) as u64), to_fixed(0.25, 16));
    assert_eq!(word_at(&file, BASE + map.weight_word(2) as u64), 0);
    assert_eq!(word_at(&file, BASE + map.weight_word(3) as u64), 0);
}

#[test]
fn result_read_from_result_register() {
    let file = device_file();
    let map = RegisterMap::DEFAULT;
    file.as_file()
        .write_all_at(&to_fixed(42.5, 16).to_ne_bytes(), BASE + map.result as u64)
        .unwrap();
    let region = MappedRegion::map(file.path(), BASE, BLOCK_SIZE).unwrap();
    let mut hw = HardwareBackend::new(region);
    assert_eq!(hw.compute_chunk(&[1.0; 4], &[1.0; 4], 4), to_fixed(42.5, 16));
}

#[test]
fn initialize_zeroes_blocks() {
    let file = device_file();
    file.as_file().write_all_at(&[0xFF; BLOCK_SIZE], BASE).unwrap();
    let region = MappedRegion::map(file.path(), BASE, BLOCK_SIZE).unwrap();
    let mut hw = HardwareBackend::new(region);
    hw.initialize();
    for offset in (0..RegisterMap::DEFAULT.result).step_by(4) {
        assert_eq!(word_at(&file, BASE + offset as u64), 0, "offset {offset:#x}");
    }
    // Result register is status: initialize leaves it alone
    assert_eq!(hw.registers_mut().read32(RegisterMap::DEFAULT.result), u32::MAX);
}

#[test]
fn block_past_end_of_file_rejected() {
    let file = device_file();
    let err = MappedRegion::map(file.path(), 0x3FF0, BLOCK_SIZE).unwrap_err();
    assert!(matches!(err, AccelError::MapFailed { .. }));
}

#[test]
fn hardware_selection_uses_mapping() {
    let file = device_file();
    let config = AccelConfig::default()
        .with_selection(BackendSelection::Hardware)
        .with_device(file.path())
        .with_base_address(BASE);
    let mut backend = select_backend(&config).unwrap();
    backend.initialize();
    assert_eq!(backend.compute_chunk(&[1.0; 4], &[1.0; 4], 4), 0);
}

#[test]
#[ignore] // Requires the accelerator: DOTACC_DEVICE / DOTACC_BASE or DOTACC_CSR_CSV
fn hardware_matches_software() {
    let config = AccelConfig::from_env()
        .expect("config")
        .with_selection(BackendSelection::Hardware);
    let mut hw = dotacc_driver::DotProductEngine::from_config(&config).expect("hardware");
    hw.initialize();
    let mut sw = dotacc_driver::DotProductEngine::software();

    let x: Vec<f64> = (0..64).map(|i| f64::from(i) / 64.0).collect();
    let w: Vec<f64> = (0..64).map(|i| 1.0 - f64::from(i) / 32.0).collect();
    let h = hw.dot_product(64, &x, &w);
    let s = sw.dot_product(64, &x, &w);
    assert!((h - s).abs() < 64.0 * 4.0 / 65_536.0, "hw={h} sw={s}");
}
