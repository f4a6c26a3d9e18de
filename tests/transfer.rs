use a64_rs::exec::IntExecutor;
use a64_rs::isa::a64::A64Decoder;
use a64_rs::{Bus, Cpu, CpuConfig, LinearMemory, Trap, Width};
use pretty_assertions::assert_eq;

fn setup(words: &[u32]) -> (Cpu, LinearMemory) {
    let mut mem = LinearMemory::new(4096);
    for (i, w) in words.iter().enumerate() {
        mem.write_u32(i as u64 * 4, *w).unwrap();
    }
    let mut cpu = Cpu::new(CpuConfig::default());
    cpu.reset(0);
    (cpu, mem)
}

fn step(cpu: &mut Cpu, mem: &mut LinearMemory) -> Result<(), Trap> {
    cpu.step(mem, &A64Decoder::new(), &IntExecutor)
}

#[test]
fn unsigned_offset_is_scaled_by_access_size() {
    // str x0, [x1, #40]
    let (mut cpu, mut mem) = setup(&[0xF900_1420]);
    cpu.store(0, 0x1122_3344_5566_7788, Width::W64).unwrap();
    cpu.store(1, 0x100, Width::W64).unwrap();
    step(&mut cpu, &mut mem).unwrap();
    assert_eq!(mem.read_u64(0x128).unwrap(), 0x1122_3344_5566_7788);
    assert_eq!(cpu.regs()[1], 0x100);
}

#[test]
fn narrow_load_zero_extends() {
    // ldr w2, [x1, #8]
    let (mut cpu, mut mem) = setup(&[0xB940_0822]);
    mem.write_u64(0x108, 0xAAAA_BBBB_CCCC_DDDD).unwrap();
    cpu.store(1, 0x100, Width::W64).unwrap();
    cpu.store(2, u64::MAX, Width::W64).unwrap();
    step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.regs()[2], 0xCCCC_DDDD);
}

#[test]
fn pre_indexed_updates_base_before_access() {
    // ldr x0, [x1, #8]!
    let (mut cpu, mut mem) = setup(&[0xF840_8C20]);
    mem.write_u64(0x108, 42).unwrap();
    cpu.store(1, 0x100, Width::W64).unwrap();
    step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.regs()[0], 42);
    assert_eq!(cpu.regs()[1], 0x108);
}

#[test]
fn post_indexed_accesses_old_base() {
    // ldr x0, [x1], #-8
    let (mut cpu, mut mem) = setup(&[0xF85F_8420]);
    mem.write_u64(0x100, 7).unwrap();
    cpu.store(1, 0x100, Width::W64).unwrap();
    step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.regs()[0], 7);
    assert_eq!(cpu.regs()[1], 0xF8);
}

#[test]
fn load_into_base_keeps_loaded_value() {
    // ldr x1, [x1, #8]!
    let (mut cpu, mut mem) = setup(&[0xF840_8C21]);
    mem.write_u64(0x108, 0x55).unwrap();
    cpu.store(1, 0x100, Width::W64).unwrap();
    step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.regs()[1], 0x55);
}

#[test]
fn register_offset_store_writes_low_word() {
    // str w0, [x1, x2]
    let (mut cpu, mut mem) = setup(&[0xB822_6820]);
    cpu.store(0, 0xFFFF_FFFF_1234_5678, Width::W64).unwrap();
    cpu.store(1, 0x100, Width::W64).unwrap();
    cpu.store(2, 0x20, Width::W64).unwrap();
    step(&mut cpu, &mut mem).unwrap();
    assert_eq!(mem.read_u32(0x120).unwrap(), 0x1234_5678);
    assert_eq!(mem.read_u32(0x124).unwrap(), 0);
}

#[test]
fn literal_load_is_pc_relative() {
    // ldr x0, #8
    let (mut cpu, mut mem) = setup(&[0x5800_0040]);
    mem.write_u64(8, 0x0123_4567_89AB_CDEF).unwrap();
    step(&mut cpu, &mut mem).unwrap();
    assert_eq!(cpu.regs()[0], 0x0123_4567_89AB_CDEF);
}

#[test]
fn out_of_bounds_store_is_a_bus_trap() {
    // str x0, [x1]
    let (mut cpu, mut mem) = setup(&[0xF900_0020]);
    cpu.store(1, 4094, Width::W64).unwrap();
    let err = step(&mut cpu, &mut mem).unwrap_err();
    assert!(matches!(err, Trap::Bus { addr: 4094, .. }));
}
