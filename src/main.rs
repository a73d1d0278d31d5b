use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quotepress::invoice::{format_amount, CompanyProfile, Invoice};
use quotepress::preview::render_preview_html;
use quotepress::{
    Capture, ExportConfig, ExportError, ExportReport, ExportRequest, Exporter, FileDelivery, PageSlicer,
};

#[derive(Parser)]
#[command(
    name = "quotepress",
    about = "Paginate quotation previews into print-ready PDFs",
    author,
    version
)]
struct Cli {
    /// JSON export configuration; defaults apply when omitted
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export an element of an HTML document to PDF
    ExportHtml(ExportHtmlArgs),
    /// Render a quotation JSON file and export it to PDF
    ExportInvoice(ExportInvoiceArgs),
    /// Fetch a quotation from the API and export it to PDF
    #[cfg(feature = "api")]
    ExportRemote(ExportRemoteArgs),
    /// Write the preview HTML for a quotation JSON file
    Preview(PreviewArgs),
    /// Print the page plan for a bitmap of the given size
    Slices(SlicesArgs),
}

#[derive(Args)]
struct OutputArgs {
    /// Directory the PDF is written to
    #[arg(long, short, value_name = "DIR", default_value = ".")]
    out: PathBuf,
}

#[derive(Args)]
struct CompanyArgs {
    /// JSON company profile shown in the header
    #[arg(long, value_name = "PATH")]
    company: Option<PathBuf>,
}

#[derive(Args)]
struct ExportHtmlArgs {
    /// HTML document holding the preview
    html: PathBuf,
    /// Quotation or invoice number
    #[arg(long)]
    number: String,
    /// Client or party name
    #[arg(long)]
    party: String,
    /// Element id to capture instead of the configured one
    #[arg(long)]
    target: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct ExportInvoiceArgs {
    /// Quotation JSON file
    invoice: PathBuf,
    #[command(flatten)]
    company: CompanyArgs,
    #[command(flatten)]
    output: OutputArgs,
}

#[cfg(feature = "api")]
#[derive(Args)]
struct ExportRemoteArgs {
    /// Quotation number to fetch
    number: String,
    /// API root
    #[arg(long, default_value = "http://localhost:5000/api")]
    api: String,
    /// File holding the bearer token
    #[arg(long, value_name = "PATH")]
    token_file: Option<PathBuf>,
    #[command(flatten)]
    company: CompanyArgs,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct PreviewArgs {
    /// Quotation JSON file
    invoice: PathBuf,
    #[command(flatten)]
    company: CompanyArgs,
    /// Output file; stdout when omitted
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SlicesArgs {
    /// Bitmap width in pixels
    #[arg(long)]
    width: u32,
    /// Bitmap height in pixels
    #[arg(long)]
    height: u32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ExportError>() {
                Some(export) => eprintln!("error: {} ({})", export.user_message(), export),
                None => eprintln!("error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ExportConfig::from_path(path)?,
        None => ExportConfig::default(),
    };

    match cli.command {
        Commands::ExportHtml(args) => {
            let html = fs::read_to_string(&args.html).with_context(|| format!("reading {}", args.html.display()))?;
            let mut request = ExportRequest::new(args.number, args.party);
            if let Some(target) = args.target {
                request = request.with_target(target);
            }
            export(&config, &html, &request, &args.output.out)
        }
        Commands::ExportInvoice(args) => {
            let invoice = Invoice::from_path(&args.invoice)?;
            let company = load_company(args.company.company.as_deref())?;
            export_invoice(&config, &invoice, &company, &args.output.out)
        }
        #[cfg(feature = "api")]
        Commands::ExportRemote(args) => {
            use quotepress::api::{ApiClient, FileTokenStore, MemoryTokenStore, TokenStore};
            use std::sync::Arc;

            let tokens: Arc<dyn TokenStore> = match args.token_file {
                Some(path) => Arc::new(FileTokenStore::new(path)),
                None => Arc::new(MemoryTokenStore::new()),
            };
            let client = ApiClient::new(&args.api, tokens)?;
            let invoice = client
                .get_invoice_by_number(&args.number)
                .with_context(|| format!("fetching quotation {}", args.number))?;
            let company = load_company(args.company.company.as_deref())?;
            export_invoice(&config, &invoice, &company, &args.output.out)
        }
        Commands::Preview(args) => {
            let invoice = Invoice::from_path(&args.invoice)?;
            let company = load_company(args.company.company.as_deref())?;
            let html = render_preview_html(&invoice, &company);
            match args.output {
                Some(path) => fs::write(&path, html).with_context(|| format!("writing {}", path.display()))?,
                None => print!("{}", html),
            }
            Ok(())
        }
        Commands::Slices(args) => {
            let slicer = PageSlicer::new(config.page_geometry()?);
            let slices = slicer.plan(args.width, args.height)?;
            println!(
                "{}x{} px -> {:.2} mm at {:.2} mm content height, {} page(s)",
                args.width,
                args.height,
                slicer.image_height_mm(args.width, args.height),
                slicer.geometry().content_height_mm(),
                slices.len()
            );
            for s in &slices {
                println!(
                    "page {:>3}: rows {:>6}..{:<6} ({:>5} px) -> {:.2} mm",
                    s.page_index + 1,
                    s.source_y,
                    s.source_end(),
                    s.source_height,
                    s.dest_height_mm
                );
            }
            Ok(())
        }
    }
}

fn load_company(path: Option<&Path>) -> Result<CompanyProfile> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
        }
        None => Ok(CompanyProfile::default()),
    }
}

fn export_invoice(config: &ExportConfig, invoice: &Invoice, company: &CompanyProfile, out: &Path) -> Result<()> {
    let html = render_preview_html(invoice, company);
    let request = ExportRequest::new(invoice.invoice_number.clone(), invoice.client_name.clone());
    export(config, &html, &request, out)?;
    println!("grand total {}", format_amount(invoice.totals().grand_total));
    Ok(())
}

fn export(config: &ExportConfig, html: &str, request: &ExportRequest, out: &Path) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    let mut capturer = quotepress::new_capturer(config)?;
    capturer.load_html(html)?;

    let exporter = Exporter::new(capturer, FileDelivery::new(out), config.clone())?;
    let report = exporter.export(request)?;
    print_report(&report);
    exporter.into_capturer().close()?;
    Ok(())
}

fn print_report(report: &ExportReport) {
    println!(
        "{} ({} page(s), {} bytes, sha256 {})",
        report.location.display(),
        report.page_count,
        report.byte_len,
        report.sha256
    );
}
