//! Write a random count matrix into an on-disk experiment
//!
//! ```text
//! RUST_LOG=soma=debug cargo run --example ingest_matrix -- --root /tmp/soma --rows 50000
//! ```

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use soma::{
    CsrMatrix, Experiment, FsStorage, SomaContext, SomaOptions, SourceMatrix, SparseMatrix,
    StorageEngine,
};

#[derive(Parser, Debug)]
#[command(about = "Ingest a random CSR matrix as an assay matrix")]
struct Args {
    /// Directory holding the store
    #[arg(long)]
    root: String,

    /// Experiment name under the root
    #[arg(long, default_value = "experiment")]
    experiment: String,

    #[arg(long, default_value_t = 10_000)]
    rows: usize,

    #[arg(long, default_value_t = 2_000)]
    cols: usize,

    /// Fraction of cells holding a value
    #[arg(long, default_value_t = 0.01)]
    density: f64,

    /// Options file; overrides the defaults below
    #[arg(long)]
    options: Option<String>,

    /// Nonzero budget per chunk
    #[arg(long)]
    goal_chunk_nnz: Option<usize>,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn random_counts(args: &Args) -> CsrMatrix<f32> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut indptr = vec![0];
    let mut indices = Vec::new();
    let mut data = Vec::new();
    for _ in 0..args.rows {
        for col in 0..args.cols {
            if rng.gen_bool(args.density) {
                indices.push(col);
                data.push(rng.gen_range(1..50) as f32);
            }
        }
        indptr.push(indices.len());
    }
    CsrMatrix::new(args.rows, args.cols, indptr, indices, data).expect("generated matrix is valid")
}

fn main() -> soma::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut options = match &args.options {
        Some(path) => SomaOptions::from_path(path)?,
        None => SomaOptions::default(),
    };
    if let Some(budget) = args.goal_chunk_nnz {
        options = options.with_goal_chunk_nnz(budget);
    }

    let storage = Arc::new(FsStorage::new(&args.root)?);
    storage.stats().enable();
    let ctx = SomaContext::new(storage.clone()).with_options(options)?;

    let start = Instant::now();
    let matrix = random_counts(&args);
    println!(
        "Generated {} x {} matrix with {} nonzeros in {:?}",
        args.rows,
        args.cols,
        matrix.nnz(),
        start.elapsed()
    );

    // Barcodes in reverse so chunking has something to sort
    let obs: Vec<String> = (0..args.rows).rev().map(|i| format!("cell_{i:09}")).collect();
    let var: Vec<String> = (0..args.cols).map(|j| format!("gene_{j:06}")).collect();

    let exp = Experiment::new(&args.experiment, &ctx);
    exp.create()?;
    let ms = exp.add_collection("ms")?;
    let rna = ms.add_measurement("RNA")?;
    let x = rna.add_collection("X")?;
    let data = x.assay_matrix("data", "obs_id", "var_id");

    let start = Instant::now();
    let summary = data.from_matrix(&SourceMatrix::from(matrix), &obs, &var)?;
    println!(
        "Wrote {} cells in {} fragments ({} chunks, {} empty) in {:?}",
        summary.nnz,
        summary.fragments,
        summary.chunks,
        summary.empty_chunks,
        start.elapsed()
    );
    println!("{}", storage.stats().dump());
    println!("\nRun 'cargo run --example inspect -- --root {}' to walk it", args.root);
    Ok(())
}
