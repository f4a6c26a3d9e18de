use a64_asm::{assemble, assemble_file, to_bytes, AsmError};
use a64_rs::dump::{FinalState, MemoryWord};
use a64_rs::exec::IntExecutor;
use a64_rs::isa::a64::A64Decoder;
use a64_rs::{Cpu, CpuConfig, LinearMemory, Pstate, MEMORY_SIZE};
use pretty_assertions::assert_eq;

fn run(src: &str) -> (Cpu, LinearMemory) {
    let words = assemble(src).unwrap();
    let mut mem = LinearMemory::new(MEMORY_SIZE);
    mem.load_image(&to_bytes(&words)).unwrap();
    let mut cpu = Cpu::new(CpuConfig {
        max_steps: Some(10_000),
    });
    cpu.run(&mut mem, &A64Decoder::new(), &IntExecutor).unwrap();
    (cpu, mem)
}

#[test]
fn add_two_constants() {
    let (cpu, _) = run("movz x0, #5\nmovz x1, #7\nadd x2, x0, x1\nand x0, x0, x0\n");
    assert_eq!(cpu.regs()[2], 12);
    assert_eq!(cpu.pstate, Pstate::Z);
    assert_eq!(cpu.pc, 12);
}

#[test]
fn countdown_loop_with_labels() {
    let src = "
        mov x0, #5
        mov x1, #0
    loop:
        add x1, x1, #2      // accumulate
        subs x0, x0, #1
        b.ne loop
        and x0, x0, x0      ; halt
    ";
    let (cpu, _) = run(src);
    assert_eq!(cpu.regs()[0], 0);
    assert_eq!(cpu.regs()[1], 10);
    assert_eq!(cpu.pstate, Pstate::Z | Pstate::C);
}

#[test]
fn literal_loads_read_data_words() {
    let src = "
        ldr x0, value
        ldr w1, value
        b end
    value:
        .int 0x89abcdef
        .int 0x01234567
    end:
        and x0, x0, x0
    ";
    let (cpu, _) = run(src);
    assert_eq!(cpu.regs()[0], 0x0123_4567_89AB_CDEF);
    assert_eq!(cpu.regs()[1], 0x89AB_CDEF);
}

#[test]
fn store_shows_up_in_memory_dump() {
    let src = "
        movz x1, #0x100
        movz x0, #0xbeef
        str x0, [x1, #40]
        and x0, x0, x0
    ";
    let (cpu, mem) = run(src);
    let state = FinalState::capture(&cpu, &mem);
    assert!(state.memory.contains(&MemoryWord {
        address: 0x128,
        value: 0xBEEF
    }));
    // four code words plus the stored one
    assert_eq!(state.memory.len(), 5);
}

#[test]
fn pre_and_post_indexed_round_trip() {
    let src = "
        movz x1, #0x200
        movz x2, #9
        str x2, [x1, #8]!
        ldr x3, [x1], #-8
        and x0, x0, x0
    ";
    let (cpu, _) = run(src);
    assert_eq!(cpu.regs()[3], 9);
    assert_eq!(cpu.regs()[1], 0x200);
}

#[test]
fn conditional_branches_follow_flags() {
    let src = "
        b.eq start          // Z is set out of reset
        movz x9, #1
    start:
        cmp x9, #0
        b.ne fail
        movz x2, #3
        cmp x2, #4
        b.lt less
    fail:
        movz x0, #0xbad
        and x0, x0, x0
    less:
        b.al done
        movz x0, #0xbad
    done:
        and x0, x0, x0
    ";
    let (cpu, _) = run(src);
    assert_eq!(cpu.regs()[9], 0);
    assert_eq!(cpu.regs()[0], 0);
    assert_eq!(cpu.regs()[2], 3);
}

#[test]
fn register_branch() {
    let src = "
        movz x5, #12
        br x5
        movz x0, #1
        movz x0, #2
        and x0, x0, x0
    ";
    let (cpu, _) = run(src);
    assert_eq!(cpu.regs()[0], 2);
}

#[test]
fn errors_carry_line_numbers() {
    let err = assemble("top:\n  nop\n").unwrap_err();
    assert!(matches!(err, AsmError::Line { line: 2, .. }));
    assert!(matches!(err.kind(), AsmError::UnknownMnemonic(m) if m == "nop"));

    let err = assemble("a:\nb a\na:\n").unwrap_err();
    assert!(matches!(err, AsmError::Line { line: 3, .. }));
    assert!(matches!(err.kind(), AsmError::DuplicateLabel(_)));

    let err = assemble("b nowhere\n").unwrap_err();
    assert!(matches!(err.kind(), AsmError::UndefinedLabel(l) if l == "nowhere"));
}

#[test]
fn file_round_trip_and_no_output_on_error() {
    let dir = std::env::temp_dir().join(format!("a64-asm-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let good = dir.join("good.s");
    let good_out = dir.join("good.bin");
    std::fs::write(&good, "movz x0, #1\nand x0, x0, x0\n").unwrap();
    assert_eq!(assemble_file(&good, &good_out).unwrap(), 2);
    assert_eq!(
        std::fs::read(&good_out).unwrap(),
        vec![0x20, 0x00, 0x80, 0xD2, 0x00, 0x00, 0x00, 0x8A]
    );

    let bad = dir.join("bad.s");
    let bad_out = dir.join("bad.bin");
    std::fs::write(&bad, "movz x0, #1\nb missing\n").unwrap();
    assert!(assemble_file(&bad, &bad_out).is_err());
    assert!(!bad_out.exists());

    std::fs::remove_dir_all(&dir).unwrap();
}
