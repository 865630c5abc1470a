//! Throughput benchmarks for the master-clock scheduler.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use nesemu_core::Console;
use std::time::Duration;

/// Build a minimal valid NROM image: 32KiB PRG filled with `JMP $8000`.
fn create_minimal_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 16 + 32 * 1024 + 8 * 1024];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 2; // 32KiB PRG
    rom[5] = 1; // 8KiB CHR
    rom[6] = 0x01; // vertical mirroring, mapper 0

    rom[16] = 0x4C; // JMP absolute
    rom[17] = 0x00;
    rom[18] = 0x80;

    rom[16 + 0x7FFC] = 0x00;
    rom[16 + 0x7FFD] = 0x80;

    rom
}

fn bench_run_frame(c: &mut Criterion) {
    let rom_data = create_minimal_rom();
    let mut console = Console::load_rom(&rom_data).expect("failed to build console");

    let mut group = c.benchmark_group("console");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("run_frame", |b| {
        b.iter(|| {
            console.run_frame();
            black_box(console.framebuffer());
        });
    });

    group.bench_function("60_frames", |b| {
        b.iter(|| {
            for _ in 0..60 {
                console.run_frame();
            }
            black_box(console.framebuffer());
        });
    });

    group.finish();
}

fn bench_load_rom(c: &mut Criterion) {
    let rom_data = create_minimal_rom();

    let mut group = c.benchmark_group("initialization");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("load_rom", |b| {
        b.iter(|| {
            let console = Console::load_rom(black_box(&rom_data)).expect("failed to build console");
            black_box(console);
        });
    });

    group.bench_function("reset", |b| {
        let mut console = Console::load_rom(&rom_data).expect("failed to build console");
        b.iter(|| {
            console.reset();
            black_box(console.total_cycles());
        });
    });

    group.finish();
}

fn bench_peek(c: &mut Criterion) {
    let rom_data = create_minimal_rom();
    let console = Console::load_rom(&rom_data).expect("failed to build console");

    let mut group = c.benchmark_group("memory");
    group.throughput(Throughput::Bytes(1));
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("peek_ram", |b| {
        b.iter(|| black_box(console.peek(black_box(0x0000))));
    });

    group.bench_function("peek_prg", |b| {
        b.iter(|| black_box(console.peek(black_box(0x8000))));
    });

    group.bench_function("peek_sequential_256", |b| {
        b.iter(|| {
            for addr in 0..256u16 {
                black_box(console.peek(addr));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_run_frame, bench_load_rom, bench_peek);
criterion_main!(benches);
