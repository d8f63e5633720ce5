use clap::Parser;
use log::{error, info};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use mdprint::{
    Config, Images, ImageSource, Preview, PrintServer, Printer, Renderer, Style, Unshortened,
    UrlShortener, PRINTER_DPI, PRINTER_WIDTH,
};

/// Print markdown documents on a thermal printer.
#[derive(Parser, Debug)]
#[command(name = "mdprint", version, about)]
struct Args {
    /// JSON stylesheet with fonts and block styles
    #[arg(long, value_name = "FILE")]
    style: Option<PathBuf>,

    /// Write printer commands to FILE, such as a serial device, instead of stdout
    #[arg(long, short, value_name = "FILE", conflicts_with = "preview")]
    output: Option<PathBuf>,

    /// Render to a PNG image instead of printing
    #[arg(long, value_name = "FILE.png")]
    preview: Option<PathBuf>,

    /// Printable width in dots
    #[arg(long, default_value_t = PRINTER_WIDTH)]
    width: u32,

    /// Printer resolution in dots per inch
    #[arg(long, default_value_t = PRINTER_DPI)]
    dpi: f64,

    /// Shorten link URLs with tinyurl.com before encoding them
    #[cfg(feature = "http")]
    #[arg(long)]
    shorten: bool,

    /// Serve the print and preview endpoints on ADDR instead of printing a file
    #[arg(long, value_name = "ADDR", conflicts_with_all = ["file", "preview"])]
    serve: Option<String>,

    /// Directory holding index.html, index.css and index.js for --serve
    #[arg(long, value_name = "DIR", default_value = ".")]
    assets: PathBuf,

    /// Markdown file to print
    #[arg(required_unless_present = "serve")]
    file: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}:{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> mdprint::Result<()> {
    let style = match &args.style {
        Some(path) => Style::load(path, args.dpi)?,
        None => Style::system(args.dpi)?,
    };

    let file = match (&args.serve, &args.file) {
        (Some(address), _) => {
            let images: Box<dyn ImageSource> = Box::new(Images::new(&args.assets));
            let renderer = Renderer::new(style, images, shortener(args));
            let printer = Printer::with_config(printer_output(args)?, config(args));
            return PrintServer::new(renderer, printer, &args.assets).serve(address);
        }
        (None, Some(file)) => file,
        (None, None) => unreachable!("a file is required without --serve"),
    };

    let markdown = fs::read_to_string(file)?;
    let base = file.parent().unwrap_or_else(|| Path::new("."));
    let images: Box<dyn ImageSource> = Box::new(Images::new(base));
    let renderer = Renderer::new(style, images, shortener(args));

    if let Some(path) = &args.preview {
        let mut preview = Preview::new(args.width, args.dpi);
        renderer.render_markdown(&mut preview, &markdown)?;
        return preview.save_png(path);
    }

    let mut printer = Printer::with_config(printer_output(args)?, config(args));
    renderer.render_markdown(&mut printer, &markdown)
}

fn config(args: &Args) -> Config {
    Config::new().max_width(args.width).dpi(args.dpi)
}

fn printer_output(args: &Args) -> mdprint::Result<BufWriter<Box<dyn Write>>> {
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => {
            info!("printing to {}", path.display());
            Box::new(File::create(path)?)
        }
        None => Box::new(io::stdout()),
    };
    Ok(BufWriter::new(writer))
}

#[cfg(feature = "http")]
fn shortener(args: &Args) -> Box<dyn UrlShortener> {
    if args.shorten {
        Box::new(mdprint::TinyUrl::new())
    } else {
        Box::new(Unshortened)
    }
}

#[cfg(not(feature = "http"))]
fn shortener(_args: &Args) -> Box<dyn UrlShortener> {
    Box::new(Unshortened)
}
