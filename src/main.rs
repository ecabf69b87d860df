// src/main.rs
// ============================================================================
// ROM-MAKER CLI
// ============================================================================
//
// Uso simple (arrays en ./quantized_params, ROMs en el directorio actual):
//   rom-maker
//
// Uso completo:
//   rom-maker \
//       --input-dir ./quantized_params \
//       --config accel.json \
//       -o ./rom \
//       --manifest ./rom/manifest.json
//
// ============================================================================

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use rom_maker::{
    builder::{load_layers, write_manifest, write_roms},
    diagnostics,
    RomConfig, RomError,
};

#[derive(Parser, Debug)]
#[command(name = "rom-maker")]
#[command(about = "Convert quantized weights/biases (.npy) to fixed-point hex ROM files")]
#[command(version)]
struct Args {
    /// Directory with layerN_bias.npy / layerN_weight.npy
    #[arg(short, long, default_value = "quantized_params")]
    input_dir: PathBuf,

    /// Output directory for the ROM files
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Accelerator config (JSON): mac_cnt, widths, layers, patterns
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a JSON manifest with ROM geometry and checksums
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Skip the fixed-point scale check
    #[arg(long)]
    skip_scales: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let start = Instant::now();

    let config = match &args.config {
        Some(path) => RomConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RomConfig::default(),
    };
    config.validate()?;

    println!("═══════════════════════════════════════════════════════════════");
    println!("  ROM DATA MAKER v{}", env!("CARGO_PKG_VERSION"));
    println!("═══════════════════════════════════════════════════════════════");
    println!("  MAC lanes:  {}", config.mac_cnt);
    println!("  Widths:     W={} bits, B={} bits", config.w_width, config.b_width);
    println!("  Layers:     {:?}", config.layers);
    println!("  Input:      {}", args.input_dir.display());
    println!("  Output:     {}", args.out_dir.display());
    println!("═══════════════════════════════════════════════════════════════");

    // ══════════════════════════════════════════════════════════════════════
    // CARGA (todo antes de crear ninguna ROM)
    // ══════════════════════════════════════════════════════════════════════

    println!("\n[LOAD] Reading {} layers...", config.layers.len());
    let layers = load_layers(&config, &args.input_dir)
        .with_context(|| format!("Failed to load arrays from {}", args.input_dir.display()))?;

    if let Some(first) = layers.first() {
        log::info!("Shape of layer1 weights: {:?}", first.weight.shape());
        for row in first.weight.head_rows(10) {
            log::info!("  {:?}{}", &row[..row.len().min(16)], if row.len() > 16 { " ..." } else { "" });
        }
    }
    println!("  ✓ {} bias + {} weight arrays", layers.len(), layers.len());

    // ══════════════════════════════════════════════════════════════════════
    // CHEQUEO DE ESCALAS (solo diagnóstico)
    // ══════════════════════════════════════════════════════════════════════

    if !args.skip_scales {
        println!();
        match diagnostics::scale_report(&config.scales, config.frac_bits) {
            Ok(report) => println!("{}", report),
            // No bloquea la generación de ROMs
            Err(e @ RomError::OutOfRange { .. }) => log::error!("Scale check failed: {}", e),
            Err(e) => return Err(e.into()),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // ROMs
    // ══════════════════════════════════════════════════════════════════════

    println!("\n[ROM] Writing bias and weight ROMs...");
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Cannot create {}", args.out_dir.display()))?;
    let stats = write_roms(&config, &layers, &args.out_dir)?;

    for layer in &stats.layers {
        println!(
            "  [L{}] {:>4} neurons x {:>4} inputs  bias @{:<6} weight @{:<8} (pad {}+{})",
            layer.index + 1,
            layer.weight_rows,
            layer.inputs,
            layer.bias_base,
            layer.weight_base,
            layer.bias_padding,
            layer.weight_padding
        );
    }

    if let Some(path) = &args.manifest {
        write_manifest(path, &config, &stats)
            .with_context(|| format!("Cannot write manifest {}", path.display()))?;
        println!("  ✓ Manifest: {}", path.display());
    }

    // ══════════════════════════════════════════════════════════════════════
    // SUMMARY
    // ══════════════════════════════════════════════════════════════════════

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  ROMS COMPLETE");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Time:       {:.2}s", start.elapsed().as_secs_f64());
    for rom in [&stats.bias_rom, &stats.weight_rom].into_iter().flatten() {
        println!(
            "  {:<11} {} words x {} bits (xxh3 {:016x})",
            format!("{}:", rom.path.file_name().and_then(|n| n.to_str()).unwrap_or("rom")),
            rom.words,
            rom.width_bits,
            rom.checksum
        );
    }
    println!("  Padding:    {} words", stats.padding_words());
    if stats.truncated() > 0 {
        println!("  ⚠ Truncated: {} values", stats.truncated());
    }
    println!("═══════════════════════════════════════════════════════════════");

    Ok(())
}
