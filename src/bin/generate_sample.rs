//! Writes a synthetic porphyry-copper block model to `sample_blocks.csv` and
//! `sample_blocks.parquet`, for running the viewer offline:
//!
//! ```text
//! cargo run --bin generate_sample
//! cargo run -- --source sample_blocks.csv
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

#[derive(Debug, Parser)]
#[command(name = "generate_sample", about = "Generate a synthetic Cu block model")]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Blocks along X and Y
    #[arg(long, default_value = "24")]
    grid: usize,

    /// Benches along Z
    #[arg(long, default_value = "10")]
    benches: usize,

    /// Block edge length in metres
    #[arg(long, default_value = "10.0")]
    block_size: f64,

    #[arg(long, default_value = "42")]
    seed: u64,
}

/// SplitMix64: enough randomness for a reproducible synthetic model.
struct BlockRng(u64);

impl BlockRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// Standard normal via Box-Muller.
    fn normal(&mut self) -> f64 {
        let u1 = self.unit().max(1e-15);
        let u2 = self.unit();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// Multiplicative noise with median 1, as assay grades scatter.
    fn lognormal(&mut self, sigma: f64) -> f64 {
        (sigma * self.normal()).exp()
    }
}

struct Block {
    x: f64,
    y: f64,
    z: f64,
    cu: Option<f64>,
    class: &'static str,
}

/// Grade decays away from an inclined ore body axis, plus lognormal-ish noise.
fn porphyry_grade(x: f64, y: f64, z: f64, extent: f64, rng: &mut BlockRng) -> f64 {
    let cx = extent * 0.5 + (z - extent * 0.2) * 0.3;
    let cy = extent * 0.45;
    let r2 = ((x - cx).powi(2) + (y - cy).powi(2)) / (extent * 0.22).powi(2);
    let core = 1.8 * (-r2).exp();
    (core * rng.lognormal(0.25) + 0.05 + 0.02 * rng.normal()).max(0.0)
}

fn classify(cu: f64) -> &'static str {
    if cu >= 0.5 {
        "Ore"
    } else if cu >= 0.2 {
        "Low grade"
    } else {
        "Esteril"
    }
}

fn generate(args: &Args) -> Vec<Block> {
    let mut rng = BlockRng(args.seed);
    let extent = args.grid as f64 * args.block_size;
    let mut blocks = Vec::with_capacity(args.grid * args.grid * args.benches);

    for k in 0..args.benches {
        for j in 0..args.grid {
            for i in 0..args.grid {
                let x = (i as f64 + 0.5) * args.block_size;
                let y = (j as f64 + 0.5) * args.block_size;
                let z = 3000.0 - k as f64 * args.block_size;
                let cu = porphyry_grade(x, y, (args.benches - k) as f64 * args.block_size, extent, &mut rng);
                // Roughly one block in two hundred has no assay.
                let cu = (!rng.chance(0.005)).then_some(cu);
                // And about one in a hundred was never logged.
                let class = if rng.chance(0.01) {
                    ""
                } else {
                    classify(cu.unwrap_or(0.0))
                };
                blocks.push(Block { x, y, z, cu, class });
            }
        }
    }
    blocks
}

fn write_csv(path: &Path, blocks: &[Block]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record(["X", "Y", "Z", "Cu", "Classification"])?;
    for b in blocks {
        let cu = b.cu.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"));
        writer.write_record([
            b.x.to_string(),
            b.y.to_string(),
            b.z.to_string(),
            cu,
            b.class.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, blocks: &[Block]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("X", DataType::Float64, false),
        Field::new("Y", DataType::Float64, false),
        Field::new("Z", DataType::Float64, false),
        Field::new("Cu", DataType::Float64, true),
        Field::new("Classification", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from_iter_values(blocks.iter().map(|b| b.x))),
            Arc::new(Float64Array::from_iter_values(blocks.iter().map(|b| b.y))),
            Arc::new(Float64Array::from_iter_values(blocks.iter().map(|b| b.z))),
            Arc::new(Float64Array::from_iter(blocks.iter().map(|b| b.cu))),
            Arc::new(StringArray::from_iter_values(blocks.iter().map(|b| b.class))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let blocks = generate(&args);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let csv_path = args.output.join("sample_blocks.csv");
    let parquet_path = args.output.join("sample_blocks.parquet");
    write_csv(&csv_path, &blocks)?;
    write_parquet(&parquet_path, &blocks)?;

    let missing = blocks.iter().filter(|b| b.cu.is_none()).count();
    println!(
        "Wrote {} blocks ({missing} without assay) to {} and {}",
        blocks.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
