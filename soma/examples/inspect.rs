//! Walk an on-disk store and print every object the factory recognizes

use std::sync::Arc;

use clap::Parser;
use soma::{construct_member, FsStorage, SomaContext, SomaObject};

#[derive(Parser, Debug)]
#[command(about = "Print the object tree under a SOMA object")]
struct Args {
    /// Directory holding the store
    #[arg(long)]
    root: String,

    /// Object to start from
    #[arg(long, default_value = "experiment")]
    uri: String,
}

fn print_tree(obj: &SomaObject, ctx: &SomaContext) -> soma::Result<()> {
    let indent = "  ".repeat(obj.info().depth());
    println!("{indent}{} [{}]", obj.name(), obj.object_type());

    let members = match obj {
        SomaObject::Collection(c) => c.members()?,
        SomaObject::Experiment(e) => e.members()?,
        SomaObject::Measurement(m) => m.members()?,
        SomaObject::SparseNdArray(array) => {
            let schema = array.schema()?;
            println!(
                "{indent}  {} values, capacity {}",
                schema.value_attribute().data_type,
                schema.capacity
            );
            if let Ok(matrix) = array.as_assay_matrix() {
                for (i, fragment) in matrix.fragments()?.iter().enumerate() {
                    println!(
                        "{indent}  fragment {i}: {} cells, {} .. {}",
                        fragment.cell_count, fragment.dim0_min, fragment.dim0_max
                    );
                }
            }
            return Ok(());
        }
        SomaObject::DataFrame(frame) => {
            let schema = frame.schema()?;
            let dims: Vec<_> = schema.dimensions.iter().map(|d| d.name.as_str()).collect();
            println!("{indent}  index: {}", dims.join(", "));
            return Ok(());
        }
        SomaObject::DenseNdArray(array) => {
            println!("{indent}  shape: {:?}", array.shape()?);
            return Ok(());
        }
    };

    let lineage = obj.info().lineage();
    for name in members {
        let uri = obj.info().child_uri(&name);
        match construct_member(&uri, ctx, Some(&lineage)) {
            Ok(Some(child)) => print_tree(&child, ctx)?,
            Ok(None) => println!("{indent}  {name} [not a SOMA object]"),
            Err(err) => println!("{indent}  {name} [{err}]"),
        }
    }
    Ok(())
}

fn main() -> soma::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let ctx = SomaContext::new(Arc::new(FsStorage::new(&args.root)?));

    match construct_member(&args.uri, &ctx, None)? {
        Some(obj) => print_tree(&obj, &ctx),
        None => {
            println!("nothing stored at {}", args.uri);
            Ok(())
        }
    }
}
