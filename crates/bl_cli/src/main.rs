use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bl_ast::{InputSyntax, LoopOptions};
use bl_desugar::{desugar_module_with, LoopError, LoopReport, NameRegistry, Outcome};
use bl_parser::{parse_js, ParseResult};
use clap::{Parser, Subcommand};
use swc_common::source_map::DefaultSourceMapGenConfig;
use swc_ecma_codegen::{text_writer::JsWriter, Emitter, Node};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bl", about = "blockloop - rewrite block-scoped loops into function-scoped ones")]
struct Cli {
    /// Log every loop decision (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, rewrite loops, and emit JavaScript.
    Transform {
        /// Input .js/.jsx/.ts/.tsx file.
        input: PathBuf,
        /// Output file (stdout if omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Generate a source map.
        #[arg(long)]
        source_map: bool,
        /// JSON file with loop rewrite options.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Parse and rewrite without emitting; report unsupported loops.
    Check {
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Parse and dump the AST.
    Parse {
        input: PathBuf,
        /// Dump as JSON instead of the debug representation.
        #[arg(long)]
        ast: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Transform {
            input,
            output,
            source_map,
            config,
        } => {
            let options = load_options(config.as_deref())?;
            let (parsed, filename) = parse_input(&input)?;
            let (module, _) = rewrite(&parsed, &options)?;

            let mut buf = Vec::new();
            let mut srcmap_buf = if source_map { Some(vec![]) } else { None };
            {
                let writer = JsWriter::new(
                    parsed.source_map.clone(),
                    "\n",
                    &mut buf,
                    srcmap_buf.as_mut(),
                );
                let mut emitter = Emitter {
                    cfg: swc_ecma_codegen::Config::default()
                        .with_target(swc_ecma_ast::EsVersion::latest()),
                    cm: parsed.source_map.clone(),
                    comments: Some(&parsed.comments),
                    wr: writer,
                };
                module.emit_with(&mut emitter)?;
            }

            let output_str = String::from_utf8(buf)?;

            match &output {
                Some(path) => std::fs::write(path, &output_str)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{output_str}"),
            }

            if let Some(srcmap_data) = srcmap_buf {
                let srcmap = parsed.source_map.build_source_map(
                    &srcmap_data,
                    None,
                    DefaultSourceMapGenConfig,
                );
                let mut srcmap_json = vec![];
                srcmap
                    .to_writer(&mut srcmap_json)
                    .context("failed to serialize source map")?;

                let map_path = match &output {
                    Some(path) => format!("{}.map", path.display()),
                    None => format!("{filename}.map"),
                };
                std::fs::write(&map_path, &srcmap_json)?;
                eprintln!("Source map written to {map_path}");
            }
        }
        Commands::Check { input, config } => {
            let options = load_options(config.as_deref())?;
            let (parsed, filename) = parse_input(&input)?;
            let (_, reports) = rewrite(&parsed, &options)?;
            let extracted = reports
                .iter()
                .filter(|r| matches!(r.outcome, Outcome::Extracted { .. }))
                .count();
            eprintln!(
                "OK: {filename} ({} loops, {} flattened, {} extracted)",
                reports.len(),
                reports.len() - extracted,
                extracted
            );
        }
        Commands::Parse { input, ast } => {
            let (parsed, _) = parse_input(&input)?;

            if ast {
                let json = serde_json::to_string_pretty(&parsed.module)?;
                println!("{json}");
            } else {
                println!("{:#?}", parsed.module);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(path: Option<&Path>) -> Result<LoopOptions> {
    let Some(path) = path else {
        return Ok(LoopOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let options: LoopOptions = serde_json::from_str(&text)
        .with_context(|| format!("invalid loop options in {}", path.display()))?;
    tracing::debug!(%options, "loaded options");
    Ok(options)
}

fn parse_input(input: &Path) -> Result<(ParseResult, String)> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let filename = input.display().to_string();
    let syntax = InputSyntax::from_filename(&filename);
    let parsed = parse_js(&source, &filename, &syntax)?;
    Ok((parsed, filename))
}

/// Run the loop rewrite, pointing the diagnostic at the loop on failure.
fn rewrite(
    parsed: &ParseResult,
    options: &LoopOptions,
) -> Result<(swc_ecma_ast::Module, Vec<LoopReport>)> {
    let mut names = NameRegistry::from_module(&parsed.module);
    match desugar_module_with(parsed.module.clone(), options, &mut names) {
        Ok(result) => Ok(result),
        Err(err) => {
            report(parsed, &err);
            bail!("failed to rewrite loops: {err}")
        }
    }
}

fn report(parsed: &ParseResult, err: &LoopError) {
    let handler = parsed.handler();
    handler.struct_span_err(err.span(), &err.to_string()).emit();
}
