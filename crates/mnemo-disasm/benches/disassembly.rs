//! Benchmarks for disassembly performance.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mnemo_core::Mode;
use mnemo_disasm::{ArmDisassembler, Disassembler, WalkControl};

#[cfg(feature = "arm64")]
use mnemo_disasm::Arm64Disassembler;

#[cfg(feature = "riscv")]
use mnemo_disasm::RiscVDisassembler;

/// Sample Thumb code: a small leaf function with an IT block and a
/// literal load.
const THUMB_CODE: &[u8] = &[
    0x70, 0xB5, // push {r4, r5, r6, lr}
    0x04, 0x46, // mov r4, r0
    0x03, 0x48, // ldr r0, [pc, #12]
    0x88, 0x42, // cmp r0, r1
    0x0A, 0xBF, // itet eq
    0x40, 0x18, // addeq r0, r0, r1
    0x40, 0x1A, // subne r0, r0, r1
    0x00, 0x20, // moveq r0, #0
    0x00, 0xF0, 0x04, 0xF8, // bl
    0x70, 0xBD, // pop {r4, r5, r6, pc}
    0x00, 0xBF, // nop
    0x78, 0x56, 0x34, 0x12, // literal
];

/// Sample A32 code.
const A32_CODE: &[u8] = &[
    0x02, 0x10, 0x80, 0xE0, // add r1, r0, r2
    0x00, 0x30, 0x91, 0xE5, // ldr r3, [r1]
    0x04, 0xE0, 0x2D, 0xE5, // str lr, [sp, #-4]!
    0x93, 0x02, 0x01, 0xE0, // mul r1, r3, r2
    0x1E, 0xFF, 0x2F, 0xE1, // bx lr
];

/// Sample ARM64 code: basic function.
#[cfg(feature = "arm64")]
const ARM64_CODE: &[u8] = &[
    // stp x29, x30, [sp, #-16]!
    0xfd, 0x7b, 0xbf, 0xa9, // mov x29, sp
    0xfd, 0x03, 0x00, 0x91, // mov w8, w0
    0xe8, 0x03, 0x00, 0x2a, // add w0, w8, #1
    0x00, 0x05, 0x00, 0x11, // ldp x29, x30, [sp], #16
    0xfd, 0x7b, 0xc1, 0xa8, // ret
    0xc0, 0x03, 0x5f, 0xd6,
];

/// Sample RV32I code.
#[cfg(feature = "riscv")]
const RISCV_CODE: &[u8] = &[
    0x13, 0x01, 0x01, 0xff, // addi sp, sp, -16
    0x23, 0x26, 0x11, 0x00, // sw ra, 12(sp)
    0x13, 0x05, 0xa0, 0x02, // li a0, 42
    0x33, 0x85, 0xc5, 0x02, // mul a0, a1, a2
    0x83, 0x20, 0xc1, 0x00, // lw ra, 12(sp)
    0x67, 0x80, 0x00, 0x00, // ret
];

/// Larger code block for throughput testing (repeated pattern).
fn repeat_block(pattern: &[u8], size: usize) -> Vec<u8> {
    pattern.iter().copied().cycle().take(size).collect()
}

fn walk<D: Disassembler>(disasm: &mut D, code: &[u8]) -> usize {
    let mut lines = 0;
    let _ = disasm.disassemble_buffer(code, 0x1000, |_, text| {
        black_box(text);
        lines += 1;
        WalkControl::Continue
    });
    lines
}

fn bench_thumb_disassembly(c: &mut Criterion) {
    let mut disasm = ArmDisassembler::new();

    let mut group = c.benchmark_group("thumb_disassembly");

    group.bench_function("single_instruction", |b| {
        b.iter(|| {
            disasm.set_address(0x1000);
            let _ = disasm.decode_thumb(black_box(0x1840), 0);
        })
    });

    group.bench_function("small_function", |b| {
        b.iter(|| walk(&mut disasm, black_box(THUMB_CODE)))
    });

    // Only the 16-bit instructions repeat cleanly; the tail holds a
    // literal and a 32-bit branch.
    let narrow = &THUMB_CODE[..16];
    for size in [1024, 4096, 16384, 65536] {
        let code = repeat_block(narrow, size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("throughput", size), &code, |b, code| {
            b.iter(|| walk(&mut disasm, black_box(code)))
        });
    }

    group.finish();
}

fn bench_a32_disassembly(c: &mut Criterion) {
    let mut disasm = ArmDisassembler::new();

    let mut group = c.benchmark_group("a32_disassembly");

    group.bench_function("single_instruction", |b| {
        b.iter(|| {
            disasm.set_address(0x1000);
            let _ = disasm.decode_arm(black_box(0xE080_1002));
        })
    });

    let code = repeat_block(A32_CODE, 16384);
    group.throughput(Throughput::Bytes(code.len() as u64));
    group.bench_function("throughput", |b| {
        b.iter(|| {
            let _ = disasm.disassemble_buffer_in(black_box(&code), 0, Mode::Arm, |_, text| {
                black_box(text);
                WalkControl::Continue
            });
        })
    });

    group.finish();
}

#[cfg(feature = "arm64")]
fn bench_arm64_disassembly(c: &mut Criterion) {
    let mut disasm = Arm64Disassembler::new();

    let mut group = c.benchmark_group("arm64_disassembly");

    group.bench_function("single_instruction", |b| {
        b.iter(|| {
            let _ = disasm.decode_instruction(black_box(&ARM64_CODE[..4]), 0x1000);
        })
    });

    group.bench_function("small_function", |b| {
        b.iter(|| walk(&mut disasm, black_box(ARM64_CODE)))
    });

    group.finish();
}

#[cfg(feature = "riscv")]
fn bench_riscv_disassembly(c: &mut Criterion) {
    let mut disasm = RiscVDisassembler::new();

    let mut group = c.benchmark_group("riscv_disassembly");

    group.bench_function("small_function", |b| {
        b.iter(|| walk(&mut disasm, black_box(RISCV_CODE)))
    });

    let code = repeat_block(RISCV_CODE, 16384);
    group.throughput(Throughput::Bytes(code.len() as u64));
    group.bench_function("throughput", |b| {
        b.iter(|| walk(&mut disasm, black_box(&code)))
    });

    group.finish();
}

#[cfg(all(feature = "arm64", feature = "riscv"))]
criterion_group!(
    benches,
    bench_thumb_disassembly,
    bench_a32_disassembly,
    bench_arm64_disassembly,
    bench_riscv_disassembly
);

#[cfg(not(all(feature = "arm64", feature = "riscv")))]
criterion_group!(benches, bench_thumb_disassembly, bench_a32_disassembly);

criterion_main!(benches);
