//! pageforge command-line front-end
//!
//! One subcommand per engine operation plus `run` for JSON workflow plans.
//! The binary only does argument parsing, file I/O and logging setup; all
//! PDF work happens in pageforge-core.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pageforge_core::{
    compress_document, delete_pages, extract_pages, flatten_forms, merge_documents, page_details,
    parse_plan, remove_password, reorder_pages, repair, resize_pages, resize_pages_to,
    rotate_pages, run_workflow, set_encryption, strip_metadata, validate_pdf, watermark, PageSize,
    PermissionPolicy, Permissions, WatermarkOptions,
};

#[derive(Parser, Debug)]
#[command(name = "pageforge")]
#[command(version, about = "Structural PDF editing: pages, geometry, stamps, passwords")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a PDF and print document and page information as JSON
    Info {
        input: PathBuf,
        /// Include per-page geometry
        #[arg(long)]
        pages: bool,
    },
    /// Delete the selected pages
    Delete {
        input: PathBuf,
        /// Pages to delete, e.g. "2,4-6" (1-based)
        #[arg(short, long)]
        pages: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Keep only the selected pages
    Extract {
        input: PathBuf,
        /// Pages to keep, e.g. "1,3-5" (1-based)
        #[arg(short, long)]
        pages: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Rebuild the document with pages in a new order
    Reorder {
        input: PathBuf,
        /// Complete page order, e.g. "3,1,2" (1-based, every page once)
        #[arg(long)]
        order: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Rescale every page to a target size (contain-fit, centered)
    Resize {
        input: PathBuf,
        /// Named size: a3, a4, a5, letter, legal
        #[arg(long, conflicts_with_all = ["width", "height"])]
        size: Option<String>,
        /// Target width in points
        #[arg(long, requires = "height")]
        width: Option<f64>,
        /// Target height in points
        #[arg(long, requires = "width")]
        height: Option<f64>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Set the rotation of selected pages (viewer hint, content untouched)
    Rotate {
        input: PathBuf,
        /// Rotation in degrees, a multiple of 90
        #[arg(long)]
        degrees: i32,
        /// Pages to rotate, e.g. "1,3-5"; all pages when omitted
        #[arg(short, long)]
        pages: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Burn interactive form fields into static page content
    Flatten {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Stamp semi-transparent text across every page
    Watermark {
        input: PathBuf,
        #[arg(long)]
        text: String,
        #[arg(long, default_value_t = 48.0)]
        font_size: f64,
        /// 0.0 (invisible) to 1.0 (opaque)
        #[arg(long, default_value_t = 0.3)]
        opacity: f64,
        /// Horizontal instead of diagonal text
        #[arg(long)]
        horizontal: bool,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Password-protect the document
    Encrypt {
        input: PathBuf,
        /// Owner password (full access), required
        #[arg(long)]
        owner_password: String,
        /// User password required to open; omit for open-with-restrictions
        #[arg(long, default_value = "")]
        user_password: String,
        /// Permissions to deny, comma-separated: print, modify, copy,
        /// annotate, fill-forms, accessibility, assemble
        #[arg(long, default_value = "")]
        deny: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Remove password protection
    Decrypt {
        input: PathBuf,
        #[arg(long, default_value = "")]
        password: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Rebuild a damaged document by round-tripping through the writer
    Repair {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Clear document-info fields and XMP metadata
    StripMetadata {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Structural re-encode: renumber, prune, compress streams
    Compress {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Concatenate documents in argument order
    Merge {
        /// Two or more input files
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Run a JSON workflow plan over a document
    Run {
        /// Plan file: a JSON array of {"type": ..., "params": ...} steps
        plan: PathBuf,
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    tracing::debug!("pageforge v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Info { input, pages } => {
            let bytes = read_input(&input)?;
            let info = validate_pdf(&bytes)?;
            if pages {
                let details = page_details(&bytes)?;
                let report = serde_json::json!({ "document": info, "pages": details });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&info)?);
            }
        }
        Command::Delete { input, pages, output } => {
            let bytes = read_input(&input)?;
            write_output(&output, &delete_pages(&bytes, &pages)?)?;
        }
        Command::Extract { input, pages, output } => {
            let bytes = read_input(&input)?;
            write_output(&output, &extract_pages(&bytes, &pages)?)?;
        }
        Command::Reorder { input, order, output } => {
            let bytes = read_input(&input)?;
            let order = parse_order(&order)?;
            write_output(&output, &reorder_pages(&bytes, &order)?)?;
        }
        Command::Resize { input, size, width, height, output } => {
            let bytes = read_input(&input)?;
            let result = match (size, width, height) {
                (Some(name), _, _) => resize_pages_to(&bytes, parse_size(&name)?)?,
                (None, Some(w), Some(h)) => resize_pages(&bytes, w, h)?,
                _ => bail!("resize needs --size or both --width and --height"),
            };
            write_output(&output, &result)?;
        }
        Command::Rotate { input, degrees, pages, output } => {
            let bytes = read_input(&input)?;
            write_output(&output, &rotate_pages(&bytes, pages.as_deref(), degrees)?)?;
        }
        Command::Flatten { input, output } => {
            let bytes = read_input(&input)?;
            write_output(&output, &flatten_forms(&bytes)?)?;
        }
        Command::Watermark { input, text, font_size, opacity, horizontal, output } => {
            let bytes = read_input(&input)?;
            let options = WatermarkOptions {
                font_size,
                opacity,
                diagonal: !horizontal,
                ..WatermarkOptions::default()
            };
            write_output(&output, &watermark(&bytes, &text, &options)?)?;
        }
        Command::Encrypt { input, owner_password, user_password, deny, output } => {
            let bytes = read_input(&input)?;
            let policy = PermissionPolicy {
                owner_password,
                user_password,
                permissions: parse_deny_list(&deny)?,
            };
            write_output(&output, &set_encryption(&bytes, &policy)?)?;
        }
        Command::Decrypt { input, password, output } => {
            let bytes = read_input(&input)?;
            write_output(&output, &remove_password(&bytes, &password)?)?;
        }
        Command::Repair { input, output } => {
            let bytes = read_input(&input)?;
            write_output(&output, &repair(&bytes)?)?;
        }
        Command::StripMetadata { input, output } => {
            let bytes = read_input(&input)?;
            write_output(&output, &strip_metadata(&bytes)?)?;
        }
        Command::Compress { input, output } => {
            let bytes = read_input(&input)?;
            write_output(&output, &compress_document(&bytes)?)?;
        }
        Command::Merge { inputs, output } => {
            if inputs.len() < 2 {
                bail!("merge needs at least two input files");
            }
            let buffers = inputs
                .iter()
                .map(|path| read_input(path))
                .collect::<Result<Vec<_>>>()?;
            write_output(&output, &merge_documents(&buffers)?)?;
        }
        Command::Run { plan, input, output } => {
            let plan_json = fs::read_to_string(&plan)
                .with_context(|| format!("Failed to read plan {}", plan.display()))?;
            let steps = parse_plan(&plan_json)?;
            let bytes = read_input(&input)?;
            write_output(&output, &run_workflow(&bytes, &steps)?)?;
        }
    }

    Ok(())
}

fn read_input(path: &PathBuf) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_output(path: &PathBuf, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), size = bytes.len(), "wrote output");
    Ok(())
}

/// Parse a 1-based comma-separated page order into 0-based indices.
///
/// Strict by design: reorder validation happens in the engine, but a token
/// that is not a number at all is caught here with a readable message.
fn parse_order(order: &str) -> Result<Vec<usize>> {
    order
        .split(',')
        .map(|token| {
            let n: usize = token
                .trim()
                .parse()
                .with_context(|| format!("Invalid page number \"{}\" in order", token.trim()))?;
            if n == 0 {
                bail!("Page numbers are 1-based; 0 is not a page");
            }
            Ok(n - 1)
        })
        .collect()
}

fn parse_size(name: &str) -> Result<PageSize> {
    match name.to_ascii_lowercase().as_str() {
        "a3" => Ok(PageSize::A3),
        "a4" => Ok(PageSize::A4),
        "a5" => Ok(PageSize::A5),
        "letter" => Ok(PageSize::Letter),
        "legal" => Ok(PageSize::Legal),
        other => bail!("Unknown page size \"{}\"; expected a3, a4, a5, letter or legal", other),
    }
}

/// Turn a comma-separated deny list into a Permissions value.
///
/// Everything starts allowed; each named permission is cleared.
fn parse_deny_list(deny: &str) -> Result<Permissions> {
    let mut permissions = Permissions::default();
    for token in deny.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token {
            "print" => permissions.print = false,
            "modify" => permissions.modify = false,
            "copy" => permissions.copy = false,
            "annotate" => permissions.annotate = false,
            "fill-forms" => permissions.fill_forms = false,
            "accessibility" => permissions.accessibility = false,
            "assemble" => permissions.assemble = false,
            other => bail!(
                "Unknown permission \"{}\"; expected print, modify, copy, annotate, fill-forms, accessibility or assemble",
                other
            ),
        }
    }
    Ok(permissions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_converts_to_zero_based() {
        assert_eq!(parse_order("3,1,2").unwrap(), vec![2, 0, 1]);
        assert_eq!(parse_order(" 1 , 2 ").unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_parse_order_rejects_garbage() {
        assert!(parse_order("1,x,3").is_err());
        assert!(parse_order("0,1").is_err());
    }

    #[test]
    fn test_parse_size_names() {
        assert_eq!(parse_size("A4").unwrap(), PageSize::A4);
        assert_eq!(parse_size("letter").unwrap(), PageSize::Letter);
        assert!(parse_size("tabloid").is_err());
    }

    #[test]
    fn test_parse_deny_list() {
        let p = parse_deny_list("print, copy").unwrap();
        assert!(!p.print);
        assert!(!p.copy);
        assert!(p.modify);
        assert!(parse_deny_list("teleport").is_err());
    }

    #[test]
    fn test_empty_deny_list_allows_everything() {
        let p = parse_deny_list("").unwrap();
        assert_eq!(p, Permissions::default());
    }
}
