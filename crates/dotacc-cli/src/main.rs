// SPDX-License-Identifier: AGPL-3.0-only

//! `dotacc` — command-line interface for the dot-product accelerator.
//!
//! ```text
//! USAGE:
//!   dotacc dot --inputs 1,2,3,4 --weights .5,.5,.5,.5   Evaluate one dot product
//!   dotacc parity [--size 64] [--trials 100]            Software vs simulated hardware
//!   dotacc classify --model FILE --features ...         Score a logistic-regression model
//!   dotacc info                                         Show resolved configuration
//! ```
//!
//! Configuration comes from `DOTACC_*` environment variables; the global
//! flags override them.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dotacc_driver::chip::{CHUNK_WIDTH, FRACTIONAL_BITS, RESOLUTION};
use dotacc_driver::config::parse_address;
use dotacc_driver::{
    AccelConfig, BackendSelection, CsrMap, DotProductEngine, HardwareBackend, LogisticModel,
    SimulatedAccelerator,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dotacc", about = "Dot-product accelerator CLI", version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args)]
struct GlobalArgs {
    /// Backend: auto, hardware, simulated or software.
    #[arg(long, global = true)]
    backend: Option<BackendSelection>,

    /// Device file holding the CSR block (/dev/mem, /dev/uioN, PCIe resourceN).
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Offset of the CSR block inside the device file (hex or decimal).
    #[arg(long, global = true, value_parser = parse_base)]
    base: Option<u64>,

    /// LiteX csr.csv of the running gateware.
    #[arg(long, global = true)]
    csr_csv: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Cmd {
    /// Evaluate one dot product.
    Dot {
        /// Comma-separated input vector.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        inputs: Vec<f64>,
        /// Comma-separated weight vector.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        weights: Vec<f64>,
        /// Number of elements to use (default: shorter vector length).
        #[arg(long)]
        size: Option<usize>,
    },
    /// Compare the software fallback against the simulated accelerator.
    Parity {
        /// Vector length.
        #[arg(long, default_value_t = 64)]
        size: usize,
        /// Number of random vector pairs.
        #[arg(long, default_value_t = 100)]
        trials: usize,
        /// PRNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Classify a feature vector with a logistic-regression model file.
    Classify {
        /// Model file (one class per line: intercept then coefficients).
        #[arg(long)]
        model: PathBuf,
        /// Comma-separated feature vector.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        features: Vec<f64>,
    },
    /// Print the resolved configuration and register map.
    Info,
}

fn parse_base(s: &str) -> std::result::Result<u64, String> {
    parse_address(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.global.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let config = resolve_config(&cli.global)?;

    match cli.command {
        Cmd::Dot { inputs, weights, size } => cmd_dot(&config, &inputs, &weights, size)?,
        Cmd::Parity { size, trials, seed } => cmd_parity(size, trials, seed)?,
        Cmd::Classify { model, features } => cmd_classify(&config, &model, &features)?,
        Cmd::Info => cmd_info(&config),
    }

    Ok(())
}

fn resolve_config(args: &GlobalArgs) -> Result<AccelConfig> {
    let mut config = AccelConfig::from_env().context("reading DOTACC_* environment")?;
    if let Some(device) = &args.device {
        config = config.with_device(device);
    }
    if let Some(base) = args.base {
        config = config.with_base_address(base);
    }
    if let Some(path) = &args.csr_csv {
        let map = CsrMap::load(path).with_context(|| format!("loading {}", path.display()))?;
        config = config.with_csr_map(&map);
    }
    if let Some(selection) = args.backend {
        config = config.with_selection(selection);
    }
    Ok(config)
}

fn open_engine(config: &AccelConfig) -> Result<DotProductEngine> {
    let mut engine = DotProductEngine::from_config(config).context("bringing up backend")?;
    engine.initialize();
    Ok(engine)
}

fn cmd_dot(config: &AccelConfig, inputs: &[f64], weights: &[f64], size: Option<usize>) -> Result<()> {
    let available = inputs.len().min(weights.len());
    let size = size.unwrap_or(available);
    if size > available {
        bail!("--size {size} exceeds vector length {available}");
    }
    if size % CHUNK_WIDTH != 0 {
        eprintln!(
            "note: {} trailing element(s) ignored (chunk width {CHUNK_WIDTH})",
            size % CHUNK_WIDTH
        );
    }

    let mut engine = open_engine(config)?;
    let result = engine.dot_product(size, inputs, weights);
    println!("{result}");
    tracing::info!("dot product of {size} elements on {}", engine.backend_type());
    Ok(())
}

fn cmd_parity(size: usize, trials: usize, seed: u64) -> Result<()> {
    let mut rng = Xoshiro::new(seed);
    let mut sw = DotProductEngine::software();
    let mut hw =
        DotProductEngine::new(Box::new(HardwareBackend::simulated(SimulatedAccelerator::new())));

    let mut max_diff = 0.0f64;
    let mut sum_diff = 0.0f64;
    for _ in 0..trials {
        let x = rng.gen_f64(size);
        let w = rng.gen_f64(size);
        let diff = (hw.dot_product(size, &x, &w) - sw.dot_product(size, &x, &w)).abs();
        max_diff = max_diff.max(diff);
        sum_diff += diff;
    }

    // Four Q16.16 steps per element for factors in [-1, 1)
    #[allow(clippy::cast_precision_loss)]
    let tolerance = 4.0 * RESOLUTION * (size - size % CHUNK_WIDTH) as f64;
    #[allow(clippy::cast_precision_loss)]
    let mean = if trials == 0 { 0.0 } else { sum_diff / trials as f64 };

    println!("Parity: software vs simulated accelerator (Q{}.{})", 32 - FRACTIONAL_BITS, FRACTIONAL_BITS);
    println!("  size       {size}");
    println!("  trials     {trials}");
    println!("  max |Δ|    {max_diff:.3e}");
    println!("  mean |Δ|   {mean:.3e}");
    println!("  tolerance  {tolerance:.3e}");

    if max_diff > tolerance {
        bail!("divergence {max_diff:.3e} exceeds tolerance {tolerance:.3e}");
    }
    println!("  ✅ within tolerance");
    Ok(())
}

fn cmd_classify(config: &AccelConfig, model: &std::path::Path, features: &[f64]) -> Result<()> {
    let model = LogisticModel::load(model)
        .with_context(|| format!("loading model {}", model.display()))?;
    if features.len() < model.features() {
        bail!(
            "model expects {} features, got {}",
            model.features(),
            features.len()
        );
    }

    let mut engine = open_engine(config)?;
    let (class, proba) = model.classify(&mut engine, features);

    println!("class {class}");
    for (k, p) in proba.iter().enumerate() {
        println!("  [{k}] {p:.4}");
    }
    Ok(())
}

fn cmd_info(config: &AccelConfig) {
    let regs = &config.registers;
    println!("Backend      : {}", config.selection);
    println!("Present      : {}", config.present);
    match &config.device {
        Some(d) => println!("Device       : {}", d.display()),
        None => println!("Device       : (none)"),
    }
    println!("CSR base     : {:#x}", config.base_address);
    println!("Input block  : +{:#x} ({CHUNK_WIDTH} words)", regs.input);
    println!("Weight block : +{:#x} ({CHUNK_WIDTH} words)", regs.weight);
    println!("Result       : +{:#x}", regs.result);
    println!("Format       : Q{}.{}", 32 - FRACTIONAL_BITS, FRACTIONAL_BITS);

    match DotProductEngine::from_config(config) {
        Ok(engine) => println!("Active       : {}", engine.backend_type()),
        Err(e) => println!("Active       : unavailable ({e})"),
    }
}

// ── PRNG ─────────────────────────────────────────────────────────────────────

struct Xoshiro {
    s: [u64; 4],
}

impl Xoshiro {
    fn new(seed: u64) -> Self {
        let s = [
            seed ^ 0x9e37_79b9_7f4a_7c15,
            seed.wrapping_add(0x6c62_272e_07bb_0142),
            seed.rotate_left(17),
            seed.rotate_right(5),
        ];
        let mut rng = Self { s };
        for _ in 0..20 {
            let _ = rng.next_u64();
        }
        rng
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);
        let t = self.s[1].wrapping_shl(17);
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);
        result
    }

    /// Uniform in [-1, 1)
    fn next_f64(&mut self) -> f64 {
        // Mantissa bits under exponent 1 give [2, 4)
        let bits = (self.next_u64() >> 12) | 0x4000_0000_0000_0000;
        f64::from_bits(bits) - 3.0
    }

    fn gen_f64(&mut self, len: usize) -> Vec<f64> {
        (0..len).map(|_| self.next_f64()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_negative_vectors() {
        let cli = Cli::try_parse_from([
            "dotacc", "dot", "--inputs", "-1,2.5,-3,4", "--weights", "1,1,1,1", "--backend", "sw",
        ])
        .unwrap();
        match cli.command {
            Cmd::Dot { inputs, .. } => assert_eq!(inputs, vec![-1.0, 2.5, -3.0, 4.0]),
            _ => panic!("expected dot"),
        }
        assert_eq!(cli.global.backend, Some(BackendSelection::Software));
    }

    #[test]
    fn parses_hex_base() {
        let cli = Cli::try_parse_from(["dotacc", "info", "--base", "0xf0003000"]).unwrap();
        assert_eq!(cli.global.base, Some(0xf000_3000));
    }

    #[test]
    fn prng_range_and_determinism() {
        let a = Xoshiro::new(7).gen_f64(1000);
        let b = Xoshiro::new(7).gen_f64(1000);
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn parity_passes_for_default_sizes() {
        cmd_parity(64, 20, 1).unwrap();
        cmd_parity(6, 20, 2).unwrap();
    }
}
