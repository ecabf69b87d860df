// src/bin/inspect.rs
// ============================================================================
// ROM INSPECTOR - Valida y muestra un archivo ROM hex
// ============================================================================
//
// Uso: rom-inspect weight_rom_hex.txt --width 8 --groups 4
//
// ============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rom_maker::rom::{lane_groups, validate_rom};

#[derive(Parser)]
#[command(name = "rom-inspect")]
#[command(about = "Validate and inspect a hex ROM file")]
struct Args {
    /// ROM file to inspect
    file: PathBuf,

    /// Word width in bits (8 for weights, 32 for biases)
    #[arg(short, long)]
    width: u32,

    /// MAC lanes per group
    #[arg(short, long, default_value_t = 4)]
    mac_cnt: usize,

    /// Lane groups to print
    #[arg(short, long, default_value_t = 4)]
    groups: usize,

    /// Max errors to print
    #[arg(long, default_value_t = 20)]
    max_errors: usize,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn log_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level(args.verbose)))
        .init();

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Cannot read {}", args.file.display()))?;
    let report = validate_rom(&text, args.width, args.mac_cnt)?;

    println!("\n{}", "=".repeat(72));
    println!("ROM INSPECT: {}", args.file.display());
    println!("{}", "=".repeat(72));
    println!("  Palabras:     {}", report.lines);
    println!("  Ancho:        {} bits ({} dígitos hex)", report.width_bits, report.hex_chars);
    println!("  Lane groups:  {} x {}", report.groups, report.mac_cnt);
    println!("  Ceros:        {}", report.zero_words);

    if report.valid && args.width <= 64 {
        println!("\n{}", "─".repeat(72));
        for (idx, group) in lane_groups(&text, args.width, args.mac_cnt, args.groups)?
            .iter()
            .enumerate()
        {
            let cells: Vec<String> = group.iter().map(|v| format!("{:>6}", v)).collect();
            println!("  [{:4}] {}", idx, cells.join(" "));
        }
    }

    if !report.errors.is_empty() {
        println!("\n  Errores:");
        for err in report.errors.iter().take(args.max_errors) {
            println!("    • {}", err);
        }
        if report.errors.len() > args.max_errors {
            println!("    ... {} más", report.errors.len() - args.max_errors);
        }
    }

    println!("\n{}", "=".repeat(72));
    if report.valid {
        println!("✓ VALIDACIÓN EXITOSA");
    } else {
        println!("✗ VALIDACIÓN FALLIDA");
    }
    println!("{}\n", "=".repeat(72));

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}
