//! resume-export CLI - paginated PDF export of rendered resumes

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use resume_export::load::{to_json, JsonFormat};
use resume_export::{
    export::normalize, load_file, locate_source, Color, DirectorySink, ExportController,
    ExportEvent, ExportOptions, ExportStage, ImageEncoding, Metadata, Orientation, PageImageMode,
    PaperSize, VirtualDocument,
};

#[derive(Parser)]
#[command(name = "resume-export")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Export rendered resumes to paginated PDF", long_about = None)]
struct Cli {
    /// Input HTML or JSON document
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    export: ExportArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a document to PDF
    Export {
        /// Input HTML or JSON document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Print the export report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Render the export bitmap to a PNG without building a PDF
    Preview {
        /// Input HTML or JSON document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output PNG file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Show the page plan without building a PDF
    Plan {
        /// Input HTML or JSON document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Normalize lists in the source element and print the resulting tree
    Normalize {
        /// Input HTML or JSON document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Element to normalize (`#id`, `.class` or tag name)
        #[arg(short, long, env = "RESUME_EXPORT_TARGET")]
        target: Option<String>,

        /// Class marking section-content regions
        #[arg(long, default_value = "section-content")]
        section_class: String,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct ExportArgs {
    /// Element to export (`#id`, `.class` or tag name)
    #[arg(short, long, env = "RESUME_EXPORT_TARGET")]
    target: Option<String>,

    /// Paper size (a3, a4, a5, letter, legal)
    #[arg(long, env = "RESUME_EXPORT_PAPER", default_value = "a4", value_parser = parse_paper)]
    paper: PaperSize,

    /// Use landscape pages
    #[arg(long)]
    landscape: bool,

    /// Output file name
    #[arg(short, long, env = "RESUME_EXPORT_FILE_NAME")]
    name: Option<String>,

    /// Oversampling factor (2-8)
    #[arg(long, env = "RESUME_EXPORT_SCALE", default_value = "2")]
    scale: f32,

    /// Background colour (CSS syntax)
    #[arg(long, default_value = "#ffffff", value_parser = parse_color)]
    background: Color,

    /// How the bitmap is placed on pages
    #[arg(long, value_enum, default_value = "shared")]
    mode: ImageMode,

    /// Encode page images as JPEG with this quality (1-100)
    #[arg(long, value_name = "QUALITY")]
    jpeg: Option<u8>,

    /// Class marking section-content regions
    #[arg(long, default_value = "section-content")]
    section_class: String,

    /// Document title written to the PDF
    #[arg(long)]
    title: Option<String>,

    /// Document author written to the PDF
    #[arg(long)]
    author: Option<String>,

    /// Leave content streams uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Disable parallel encoding
    #[arg(long)]
    sequential: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ImageMode {
    /// One shared image drawn on every page
    Shared,
    /// One cropped image per page
    Sliced,
}

impl From<ImageMode> for PageImageMode {
    fn from(mode: ImageMode) -> Self {
        match mode {
            ImageMode::Shared => PageImageMode::Shared,
            ImageMode::Sliced => PageImageMode::Sliced,
        }
    }
}

fn parse_paper(s: &str) -> Result<PaperSize, String> {
    s.parse().map_err(|e: resume_export::Error| e.to_string())
}

fn parse_color(s: &str) -> Result<Color, String> {
    Color::parse(s).ok_or_else(|| format!("invalid colour '{}'", s))
}

impl ExportArgs {
    fn options(&self, input: &Path) -> ExportOptions {
        let mut options = ExportOptions::new()
            .with_paper_size(self.paper)
            .with_orientation(if self.landscape {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            })
            .with_scale(self.scale)
            .with_background(self.background)
            .with_section_class(self.section_class.clone())
            .with_image_mode(self.mode.into())
            .with_compression(!self.no_compress)
            .with_metadata(Metadata {
                title: self.title.clone(),
                author: self.author.clone(),
                creator: Some(format!("resume-export-cli {}", env!("CARGO_PKG_VERSION"))),
                ..Default::default()
            });
        if let Some(quality) = self.jpeg {
            options = options.with_image_encoding(ImageEncoding::Jpeg { quality });
        }
        if let Some(name) = &self.name {
            options = options.with_file_name(name.clone());
        } else if let Some(stem) = input.file_stem() {
            options = options.with_file_name(format!("{}.pdf", stem.to_string_lossy()));
        }
        if let Some(dir) = input.parent() {
            options = options.with_base_dir(dir);
        }
        if self.sequential {
            options = options.sequential();
        }
        options
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Export {
            input,
            output,
            json,
            export,
        }) => cmd_export(&input, output.as_deref(), &export, json),
        Some(Commands::Preview {
            input,
            output,
            export,
        }) => cmd_preview(&input, output.as_deref(), &export),
        Some(Commands::Plan {
            input,
            compact,
            export,
        }) => cmd_plan(&input, &export, compact),
        Some(Commands::Normalize {
            input,
            output,
            target,
            section_class,
            compact,
        }) => cmd_normalize(
            &input,
            output.as_deref(),
            target.as_deref(),
            &section_class,
            compact,
        ),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: export if input is provided
            if let Some(input) = cli.input {
                cmd_export(&input, cli.output.as_deref(), &cli.export, false)
            } else {
                println!("{}", "Usage: resume-export <FILE> [OUTPUT]".yellow());
                println!("       resume-export --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn load(input: &Path, target: Option<&str>) -> Result<(VirtualDocument, resume_export::NodeId), Box<dyn std::error::Error>> {
    let doc = load_file(input)?;
    let source = locate_source(&doc, target).ok_or_else(|| match target {
        Some(t) => format!("No element matches '{}'", t),
        None => "No element to export".to_string(),
    })?;
    Ok((doc, source))
}

fn cmd_export(
    input: &Path,
    output: Option<&Path>,
    args: &ExportArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut doc, source) = load(input, args.target.as_deref())?;
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let pb = ProgressBar::new(6);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    if json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let progress = pb.clone();
    let controller = ExportController::new(args.options(input))
        .with_sink(Arc::new(DirectorySink::new(&output_dir)))
        .with_observer(Arc::new(move |event: &ExportEvent| {
            if let ExportEvent::Stage { stage } = event {
                progress.set_message(stage_message(*stage));
                if *stage != ExportStage::Snapshot {
                    progress.inc(1);
                }
            }
        }));

    let outcome = controller.export(&mut doc, Some(source), None);
    match &outcome {
        Ok(_) => pb.finish_with_message("Done!"),
        Err(_) => pb.abandon_with_message("Failed"),
    }
    let report = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n{}", "Export complete:".green().bold());
    println!("  {} {}", "├─".dimmed(), report.location);
    println!("  {} {} page(s)", "├─".dimmed(), report.page_count);
    println!(
        "  {} {}x{} px bitmap, {:.1} mm tall",
        "├─".dimmed(),
        report.bitmap_width,
        report.bitmap_height,
        report.image_height_mm
    );
    println!(
        "  {} {} bytes in {} ms",
        "└─".dimmed(),
        report.byte_size,
        report.elapsed_ms()
    );
    if !report.is_complete() {
        println!(
            "{} {} image(s) could not be included",
            "Warning:".yellow().bold(),
            report.skipped_images
        );
    }

    Ok(())
}

fn stage_message(stage: ExportStage) -> &'static str {
    match stage {
        ExportStage::Snapshot => "Copying source...",
        ExportStage::Normalize => "Normalizing lists...",
        ExportStage::Rasterize => "Rasterizing...",
        ExportStage::Paginate => "Paginating...",
        ExportStage::Encode => "Encoding PDF...",
        ExportStage::Save => "Saving...",
    }
}

fn cmd_preview(
    input: &Path,
    output: Option<&Path>,
    args: &ExportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut doc, source) = load(input, args.target.as_deref())?;
    let controller = ExportController::new(args.options(input));
    let image = controller.preview(&mut doc, Some(source))?;

    let path = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}.png", stem))
    });
    image.save_png(&path)?;
    println!(
        "{} {} ({}x{} px)",
        "Saved to".green(),
        path.display(),
        image.width(),
        image.height()
    );

    Ok(())
}

fn cmd_plan(input: &Path, args: &ExportArgs, compact: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (mut doc, source) = load(input, args.target.as_deref())?;
    let controller = ExportController::new(args.options(input));
    let plan = controller.plan(&mut doc, Some(source))?;

    if compact {
        println!("{}", serde_json::to_string(&plan)?);
        return Ok(());
    }

    let geometry = plan.layout.geometry;
    println!("{}", "Page Plan".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: {} x {} mm",
        "Page".bold(),
        geometry.width_mm,
        geometry.height_mm
    );
    println!(
        "{}: {}x{} px ({:.1} mm)",
        "Bitmap".bold(),
        plan.layout.bitmap_width,
        plan.layout.bitmap_height,
        plan.layout.image_height_mm
    );
    println!("{}: {}", "Pages".bold(), plan.page_count());
    for page in &plan.layout.pages {
        println!(
            "  {} offset {:>8.2} mm, {:>6.2} mm of content, rows {}..{}",
            format!("#{}", page.index + 1).dimmed(),
            page.offset_mm,
            page.height_mm,
            page.source_top_px,
            page.source_top_px + page.source_height_px
        );
    }
    println!(
        "{}: {} list(s) replaced, {} text block(s) split, {} row(s)",
        "Normalized".bold(),
        plan.normalize.lists_replaced,
        plan.normalize.text_blocks_split,
        plan.normalize.rows_created
    );

    Ok(())
}

fn cmd_normalize(
    input: &Path,
    output: Option<&Path>,
    target: Option<&str>,
    section_class: &str,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut doc, source) = load(input, target)?;
    let options = ExportOptions::new().with_section_class(section_class);
    let report = normalize(&mut doc, source, &options.normalize);
    log::info!("{:?}", report);

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = to_json(&doc, source, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "resume-export".cyan().bold(), resume_export::VERSION);
    println!("Paginated PDF export of rendered resumes");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/resume-export".dimmed());
    println!("License: MIT");
}
