use clap::Parser;
use schemadiag::dot::DotWriter;
use schemadiag::ir::{ConnectionFilter, GraphIR};
use schemadiag::loader::SchemaLoader;
use schemadiag::render::{DiagramRenderer, ImageFormat};
use std::path::PathBuf;
use std::process;
use tracing::info;

const DEFAULT_TABLES: &[&str] = &[
    "CUSTOMER",
    "SITE",
    "CONTACT",
    "OPPOR",
    "QUOTE",
    "QUOTEITEM",
    "CONTRACT",
    "CONTRACTITEM",
    "PROJECTS",
    "SERVICECONTRACT",
    "MACHINE",
    "MACHINEDETAIL",
    "MASTER",
    "ASSET",
    "VENDINVOICE",
    "VENDINVOICEITEM",
    "INVOICE",
    "INVOICEITEM",
    "DISPATCH",
];

/// Render a database schema export as an entity-relationship diagram
#[derive(Parser, Debug)]
#[command(name = "schemadiag", version)]
struct Args {
    /// Column-level schema export (CSV)
    #[arg(short, long, default_value = "Q360 Diagrams/tables.csv")]
    input: PathBuf,

    /// Tables to include, comma-separated (case-insensitive)
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_TABLES.iter().map(|s| s.to_string()).collect::<Vec<_>>()
    )]
    tables: Vec<String>,

    /// Link every shared column, not only shared `...NO` columns
    #[arg(long)]
    all_connections: bool,

    /// Directory the image is written to; must exist
    #[arg(long, default_value = "Q360 Diagrams/generated")]
    output_dir: PathBuf,

    /// Base file name; a timestamp and extension are appended
    #[arg(short, long, default_value = "output_diagram")]
    output: String,

    /// Image format: png or svg
    #[arg(short, long, default_value = "png", value_parser = parse_format)]
    format: ImageFormat,

    /// Print the DOT source to stdout instead of rendering
    #[arg(long)]
    emit_dot: bool,
}

fn parse_format(s: &str) -> Result<ImageFormat, String> {
    ImageFormat::from_str(s)
        .ok_or_else(|| format!("unsupported format `{}` (expected png or svg)", s))
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("schemadiag=info")),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let records = SchemaLoader::load_path(&args.input, &args.tables)?;
    info!(rows = records.len(), input = %args.input.display(), "schema loaded");

    let filter = ConnectionFilter::from_limit(!args.all_connections);
    let ir = GraphIR::from_records(&records, filter);
    info!(tables = ir.nodes.len(), relationships = ir.edges.len(), "diagram built");

    if args.emit_dot {
        print!("{}", DotWriter::default().write(&ir));
        return Ok(());
    }

    let path = DiagramRenderer::new(&args.output_dir)
        .with_format(args.format)
        .render(&ir, &args.output)?;
    println!("Database diagram saved as {}", path.display());
    Ok(())
}
