//! Demo host for the inline formula tool.
//!
//! Plays the part of the block editor: owns a document and a selection,
//! triggers the tool, and prints the resulting host markup. Documents round
//! trip through JSON, the host's stand-in save format.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr, miette};

use mathspan_editor_core::{
    Activation, Classification, Fragment, InlineFormulaTool, KatexRenderer, MathRenderer,
    Selection, write_fragment,
};

#[derive(Parser)]
#[command(version, about = "Mathspan - inline LaTeX formula tool", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the host registration descriptor as JSON
    Describe,

    /// Wrap a selection of the given text in a formula span
    Wrap {
        /// Document text
        text: String,

        /// Selection start (char offset)
        #[arg(long)]
        start: usize,

        /// Selection end (char offset)
        #[arg(long)]
        end: usize,

        /// Also print the document as JSON (the save format)
        #[arg(long)]
        json: bool,
    },

    /// Replace the raw source of the span under an offset
    Edit {
        /// Path to a document JSON file
        doc: PathBuf,

        /// Char offset inside the target span
        #[arg(long)]
        at: usize,

        /// New raw source
        #[arg(long)]
        source: String,

        /// Write the updated document back to the file
        #[arg(long)]
        save: bool,
    },

    /// Remove the span under an offset, keeping only its rendered content
    Unwrap {
        /// Path to a document JSON file
        doc: PathBuf,

        /// Char offset inside the target span
        #[arg(long)]
        at: usize,

        /// Write the updated document back to the file
        #[arg(long)]
        save: bool,
    },

    /// Report whether an offset is inside a formula span
    Classify {
        /// Path to a document JSON file
        doc: PathBuf,

        /// Char offset to probe
        #[arg(long)]
        at: usize,
    },

    /// Render a single formula to markup
    Render {
        formula: String,

        /// Block-style output
        #[arg(long)]
        display: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Describe => describe(),
        Commands::Wrap {
            text,
            start,
            end,
            json,
        } => wrap(text, start, end, json),
        Commands::Edit {
            doc,
            at,
            source,
            save,
        } => edit(&doc, at, source, save),
        Commands::Unwrap { doc, at, save } => unwrap(&doc, at, save),
        Commands::Classify { doc, at } => classify(&doc, at),
        Commands::Render { formula, display } => render(&formula, display),
    }
}

fn make_tool() -> InlineFormulaTool<KatexRenderer> {
    InlineFormulaTool::with_renderer(KatexRenderer::new())
}

fn describe() -> Result<()> {
    let tool = make_tool();
    let descriptor = serde_json::to_string_pretty(&tool.descriptor()).into_diagnostic()?;
    println!("{descriptor}");
    Ok(())
}

fn wrap(text: String, start: usize, end: usize, json: bool) -> Result<()> {
    let mut tool = make_tool();
    let mut doc = Fragment::from_text(text);

    match tool.activate(&mut doc, Selection::new(start, end)) {
        Activation::Wrapped { selection } => {
            tracing::debug!(start = selection.start(), end = selection.end(), "wrapped");
            println!("{}", write_fragment(&doc, tool.config()));
            if json {
                println!("{}", serde_json::to_string_pretty(&doc).into_diagnostic()?);
            }
            Ok(())
        }
        Activation::EditorOpened { span } => Err(miette!(
            "selection covers the existing formula at node {span}; use `edit`"
        )),
        Activation::Ignored(reason) => Err(miette!("nothing wrapped: {reason:?}")),
        Activation::Unwrapped { .. } => Err(miette!("unexpected unwrap")),
    }
}

fn edit(path: &Path, at: usize, source: String, save: bool) -> Result<()> {
    let mut tool = make_tool();
    let mut doc = load_doc(path)?;
    tool.attach_existing(&mut doc);

    match tool.activate(&mut doc, Selection::collapsed(at)) {
        Activation::EditorOpened { span } => {
            let session = tool
                .session_mut()
                .ok_or_else(|| miette!("edit session did not open"))?;
            session.set_draft(source);
            if !tool.confirm_edit(&mut doc) {
                return Err(miette!("span {span} vanished before the edit applied"));
            }
            finish(&tool, &doc, path, save)
        }
        outcome => Err(miette!("no formula at offset {at}: {outcome:?}")),
    }
}

fn unwrap(path: &Path, at: usize, save: bool) -> Result<()> {
    let mut tool = make_tool();
    let mut doc = load_doc(path)?;
    tool.attach_existing(&mut doc);

    match tool.unwrap(&mut doc, Selection::collapsed(at)) {
        Activation::Unwrapped { .. } => finish(&tool, &doc, path, save),
        outcome => Err(miette!("no formula at offset {at}: {outcome:?}")),
    }
}

fn classify(path: &Path, at: usize) -> Result<()> {
    let tool = make_tool();
    let doc = load_doc(path)?;

    match tool.classify(&doc, Selection::collapsed(at)) {
        Classification::InsideFormula(index) => {
            let raw = doc
                .formula(index)
                .map(|span| span.raw_source().to_owned())
                .unwrap_or_default();
            println!("inside formula (node {index}): {raw}");
        }
        Classification::NoFormula => println!("no formula"),
    }
    Ok(())
}

fn render(formula: &str, display: bool) -> Result<()> {
    let renderer = if display {
        KatexRenderer::display()
    } else {
        KatexRenderer::new()
    };
    let markup = renderer.render(formula).into_diagnostic()?;
    println!("{markup}");
    Ok(())
}

fn load_doc(path: &Path) -> Result<Fragment> {
    let data = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data)
        .into_diagnostic()
        .wrap_err("parsing document JSON")
}

fn finish(
    tool: &InlineFormulaTool<KatexRenderer>,
    doc: &Fragment,
    path: &Path,
    save: bool,
) -> Result<()> {
    println!("{}", write_fragment(doc, tool.config()));
    if save {
        let json = serde_json::to_string_pretty(doc).into_diagnostic()?;
        fs::write(path, json)
            .into_diagnostic()
            .wrap_err_with(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
