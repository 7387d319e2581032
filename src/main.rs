use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use anchortable::core::error::SinkError;
use anchortable::core::report::ExtractionReport;
use anchortable::export::{CsvExporter, JsonExporter, RawTextSink, TableSink, TextSink};
use anchortable::ocr::renderer::DEFAULT_DPI;
use anchortable::ocr::{OcrBridge, PageRenderer, Rasterizer};
use anchortable::{extract_document, LayoutConfig};

#[derive(Parser, Debug)]
#[command(name = "anchortable")]
#[command(version, about = "Extract anchored column tables from scanned PDFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the table from a PDF file
    Extract {
        /// Input PDF file path
        input: PathBuf,

        #[command(flatten)]
        opts: ExtractOpts,
    },

    /// Extract tables from multiple PDF files
    Batch {
        /// Input PDF files
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        opts: ExtractOpts,
    },

    /// Show page count and the columns a layout declares
    Info {
        /// Input PDF file path
        input: PathBuf,

        /// Layout JSON file (default: built-in work-order layout)
        #[arg(short, long)]
        layout: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct ExtractOpts {
    /// Output directory (default: ./<input_name>_output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Layout JSON file (default: built-in work-order layout)
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Output format(s) to generate
    #[arg(short, long, value_enum, default_values_t = vec![Format::Csv])]
    format: Vec<Format>,

    /// CSV delimiter
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Rasterization DPI
    #[arg(long, default_value_t = DEFAULT_DPI)]
    dpi: u32,

    /// Also write the raw OCR fragments of each column to <output>/raw/
    #[arg(long)]
    raw_text: bool,

    /// OCR bridge script
    #[arg(long, default_value = "ocr/bridge/easyocr_bridge.py")]
    script: PathBuf,

    /// Python interpreter used to run the bridge
    #[arg(long, default_value = "python3")]
    python: String,

    /// OCR languages passed to the bridge
    #[arg(long, default_value = "es,en")]
    lang: String,

    /// Keep rendered page images in <output>/pages/
    #[arg(long)]
    keep_pages: bool,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Format {
    Csv,
    Json,
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("anchortable=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Extract { input, opts } => convert_single(&input, &opts).map(|_| ()),
        Commands::Batch { inputs, opts } => convert_batch(&inputs, &opts),
        Commands::Info { input, layout } => show_info(&input, layout.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if let Some(sink_error) = error.chain().find_map(|e| e.downcast_ref::<SinkError>()) {
                if sink_error.is_retryable() {
                    eprintln!("[!] Output file is open in another program; close it and run again");
                }
            }
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_layout(path: Option<&Path>) -> Result<LayoutConfig> {
    match path {
        Some(path) => LayoutConfig::load(path)
            .with_context(|| format!("Failed to load layout: {}", path.display())),
        None => Ok(LayoutConfig::default()),
    }
}

fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    PathBuf::from(format!("{}_output", stem))
}

fn convert_single(input: &Path, opts: &ExtractOpts) -> Result<ExtractionReport> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }
    if !opts.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    let layout = load_layout(opts.layout.as_deref())?;
    let output_dir = opts.output.clone().unwrap_or_else(|| default_output_dir(input));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let renderer =
        PageRenderer::new(output_dir.join("pages"), opts.dpi).keep_images(opts.keep_pages);

    if !opts.quiet {
        println!("[*] Processing: {}", input.display());
        println!("[*] Output: {}", output_dir.display());
        println!("[*] DPI: {}", renderer.dpi());
    }

    let bridge = OcrBridge::new(output_dir.join("ocr"))
        .with_script(opts.script.clone())
        .with_python(opts.python.clone())
        .with_lang(opts.lang.clone());

    let mut raw_sink = if opts.raw_text {
        let columns = layout.columns.iter().map(|c| c.name.as_str());
        Some(RawTextSink::create(&output_dir.join("raw"), columns)?)
    } else {
        None
    };

    let extraction = extract_document(
        input,
        &layout,
        &renderer,
        &bridge,
        raw_sink.as_mut().map(|s| s as &mut dyn TextSink),
    )
    .with_context(|| format!("Failed to process PDF: {}", input.display()))?;

    if let Some(sink) = raw_sink {
        sink.finish()?;
    }

    for format in &opts.format {
        let sink: Box<dyn TableSink> = match format {
            Format::Csv => Box::new(
                CsvExporter::new(output_dir.join("table.csv")).with_delimiter(opts.delimiter as u8),
            ),
            Format::Json => Box::new(JsonExporter::new(output_dir.join("table.json"))),
        };
        sink.write(&extraction.table)?;
    }

    let report = extraction.report;
    if !opts.quiet {
        println!(
            "[+] Pages: {} extracted / {} scanned / {} total",
            report.pages_extracted, report.pages_scanned, report.pages_total
        );
        if let Some(page) = report.stopped_at_page {
            println!("[+] Table ends before page {}", page + 1);
        }
        println!("[+] Rows: {}", report.row_count);
        if !report.warnings.is_empty() {
            println!("[!] {} warning(s); set RUST_LOG=anchortable=warn for details", report.warnings.len());
        }
        println!("\n[✓] Done! Results saved to: {}", output_dir.display());
    }

    Ok(report)
}

fn convert_batch(inputs: &[PathBuf], opts: &ExtractOpts) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    let base_output = opts.output.clone().unwrap_or_else(|| PathBuf::from("batch_output"));

    println!("[*] Batch processing {} file(s)", inputs.len());
    println!("[*] Base output: {}\n", base_output.display());

    let mut success = 0;
    let mut failed = 0;

    for (i, input) in inputs.iter().enumerate() {
        println!("[{}/{}] Processing: {}", i + 1, inputs.len(), input.display());

        let mut file_opts = opts.clone();
        file_opts.output = Some(base_output.join(default_output_dir(input)));
        file_opts.quiet = true;

        match convert_single(input, &file_opts) {
            Ok(report) => {
                println!("  [✓] {} row(s)", report.row_count);
                success += 1;
            }
            Err(e) => {
                eprintln!("  [✗] Failed: {:#}", e);
                failed += 1;
            }
        }
    }

    println!("\n[*] Summary: {} succeeded, {} failed", success, failed);

    if failed > 0 {
        anyhow::bail!("{} file(s) failed to process", failed);
    }

    Ok(())
}

fn show_info(input: &Path, layout: Option<&Path>) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let layout = load_layout(layout)?;
    let renderer = PageRenderer::new(std::env::temp_dir(), DEFAULT_DPI);
    let page_count = renderer
        .page_count(input)
        .with_context(|| format!("Failed to open PDF: {}", input.display()))?;

    println!("PDF Information");
    println!("===============");
    println!("File: {}", input.display());
    println!("Pages: {}", page_count);
    println!();
    println!("Layout columns");
    println!("==============");
    for column in &layout.columns {
        let marker = if column.name == layout.primary_column { "*" } else { " " };
        println!(
            "{marker} {:<12} {:?} .. {:?}  {:?}",
            column.name,
            column.left_anchor.matcher,
            column.right_anchor.matcher,
            column.cleaning_policy
        );
    }

    Ok(())
}
