use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use folio::config;
use folio::engine::DisplayTarget;
use folio::engine::scripted::ScriptedEngine;
use folio::i18n::Localizer;
use folio::session::{Phase, ReadingSession, accepts_file};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("FOLIO_BUILD_GIT_HASH"), ")");

/// EPUB reader for the terminal.
///
/// Books are opened by the built-in scripted engine, which reads TOML book
/// manifests (title plus chapters with label, href and length) saved with an
/// `.epub` extension. Zipped EPUB archives are rejected as malformed.
#[derive(Parser)]
#[command(name = "folio", version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Book to open (for view mode; omit to start at the upload prompt)
    book: Option<PathBuf>,

    /// UI language (e.g. `de`, `zh-TW`); defaults to $LANG when supported
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Reader theme: light, dark or sepia
    #[arg(long, global = true)]
    theme: Option<String>,

    /// Log output file path (enables logging when specified)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load a book without the viewer and print its title, contents and page count
    Inspect {
        /// Book file
        book: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        let file = match std::fs::File::create(log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error: failed to open log file {}: {e}", log_path.display());
                std::process::exit(1);
            }
        };
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    } else if cli.command.is_some() {
        env_logger::init();
    }
    // viewer mode + no --log → logger not initialized (no log output)

    // Load config file and merge CLI overrides
    let mut cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };

    let locale = cli.locale.or_else(|| {
        // Only consult $LANG when neither CLI nor config picked a locale.
        cfg.locale
            .is_none()
            .then(|| std::env::var("LANG").ok())
            .flatten()
            .map(|lang| folio::i18n::negotiate(&lang.replace('_', "-")).to_string())
    });
    cfg.merge_cli(locale, cli.theme);

    let result = cfg.resolve().and_then(|config| match cli.command {
        Some(Command::Inspect { book, json }) => cmd_inspect(book, &config, json),
        None => folio::viewer::run(config, cli.book),
    });

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

#[derive(Serialize)]
struct BookSummary {
    title: Option<String>,
    pages: usize,
    contents: Vec<ContentsEntry>,
}

#[derive(Serialize)]
struct ContentsEntry {
    label: String,
    href: String,
}

fn cmd_inspect(book: PathBuf, config: &config::Config, json: bool) -> Result<()> {
    let start = Instant::now();
    if !accepts_file(&book) {
        bail!("{} is not an .epub file", book.display());
    }
    let theme = folio::theme::get(&config.theme)
        .ok_or_else(|| anyhow::anyhow!("unknown theme '{}'", config.theme))?;
    let mut i18n = Localizer::new(config.locales_dir.clone());
    i18n.set_locale(&config.locale);

    let mut session = ReadingSession::new(
        ScriptedEngine::new(),
        DisplayTarget::new("inspect"),
        config.reader.clone(),
        theme,
    );
    session
        .load_path(&book)
        .with_context(|| format!("failed to open {}", book.display()))?;
    session.pump();

    if session.phase() == Phase::Idle {
        let detail = session
            .take_notices()
            .pop()
            .map(|n| format!("{}: {}", i18n.t(n.title_key), i18n.t(n.description_key)))
            .unwrap_or_else(|| "book did not finish loading".into());
        bail!(
            "{}: {detail}\n{}",
            book.display(),
            i18n.t("app.engine_note")
        );
    }

    let summary = BookSummary {
        title: session.title().map(str::to_string),
        pages: session.total_pages(),
        contents: session
            .toc()
            .iter()
            .map(|e| ContentsEntry {
                label: e.label.clone(),
                href: e.href.clone(),
            })
            .collect(),
    };
    session.close_book();
    info!(
        "cmd_inspect: loaded in {:.1}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    let untitled = i18n.t("reader.loading");
    println!("{}", summary.title.as_deref().unwrap_or(&untitled));
    println!(
        "{}",
        i18n.t_with(
            "reader.page_of",
            &[("current", &1), ("total", &summary.pages)]
        )
    );
    println!("{}:", i18n.t("menu.contents"));
    for (i, entry) in summary.contents.iter().enumerate() {
        println!("{:>4}. {} ({})", i + 1, entry.label, entry.href);
    }
    Ok(())
}
