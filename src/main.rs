mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod handler;
mod logging;
mod tree;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::app::App;
use crate::config::{AppConfig, GeneralConfig, TreeConfig};
use crate::event::{Event, EventHandler};
use crate::fs::port::LocalFs;
use crate::tree::engine::{Completion, TreeEngine};
use crate::tui::{install_panic_hook, Tui};

/// A lazily-loaded directory tree browser for the terminal.
#[derive(Parser, Debug)]
#[command(name = "dtree", version, about)]
struct Cli {
    /// Root path to display (defaults to config `default_path`, then ".")
    path: Option<PathBuf>,

    /// Path to a config file (overrides all other config sources)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show hidden files
    #[arg(long)]
    show_hidden: bool,

    /// Disable mouse support
    #[arg(long)]
    no_mouse: bool,

    /// Open directories one level at a time
    #[arg(long)]
    no_smart_expand: bool,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the tree with the root expanded, then exit
    #[arg(long)]
    print: bool,

    /// With --print, emit JSON instead of indented text
    #[arg(long, requires = "print")]
    json: bool,
}

impl Cli {
    /// Flags as a partial config that wins over every file source.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                show_hidden: self.show_hidden.then_some(true),
                mouse: self.no_mouse.then_some(false),
                ..Default::default()
            },
            tree: TreeConfig {
                smart_expand: self.no_smart_expand.then_some(false),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    let requested = cli
        .path
        .clone()
        .or_else(|| config.general.default_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = requested.canonicalize().map_err(|_| {
        error::AppError::InvalidPath(format!("{} does not exist", requested.display()))
    })?;

    logging::init_logging(&config, cli.log_file.as_deref())?;
    tracing::info!(root = %path.display(), "starting");

    let (engine, completions) = TreeEngine::new(&path, Arc::new(LocalFs), config.engine_options());

    if cli.print {
        return print_tree(engine, completions, cli.json).await;
    }

    install_panic_hook();

    let mut tui = Tui::enter(config.mouse_enabled())?;
    let mut app = App::new(engine, config.confirm_delete(), config.use_icons());
    let mut events = EventHandler::new(Duration::from_millis(100), completions);

    while !app.should_quit {
        tui.draw(&mut app)?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Mouse(mouse) => handler::handle_mouse_event(&mut app, mouse),
            Event::Completion(completion) => {
                let event = app.engine.apply(completion);
                app.handle_engine_event(event);
            }
            Event::Tick | Event::Resize => {}
        }

        app.sync_rows();
        app.clear_expired_status();
    }

    tui.restore()?;
    tracing::info!("exiting");
    Ok(())
}

/// Wait for the root probe and its expansion, then print the visible rows.
async fn print_tree(
    mut engine: TreeEngine,
    mut completions: UnboundedReceiver<Completion>,
    json: bool,
) -> error::Result<()> {
    while engine.in_flight() > 0 {
        let Some(completion) = completions.recv().await else {
            break;
        };
        engine.apply(completion);
    }

    let rows: Vec<_> = engine.visible_nodes().collect();
    if json {
        let out = serde_json::to_string_pretty(&rows)
            .map_err(|e| error::AppError::Worker(format!("failed to encode tree: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    for row in &rows {
        let marker = match (row.is_dir, row.is_expanded) {
            (true, true) => "- ",
            (true, false) => "+ ",
            (false, _) => "  ",
        };
        let name = if row.depth == 0 {
            row.path.display().to_string()
        } else {
            row.name.clone()
        };
        println!("{}{marker}{name}", "  ".repeat(row.depth));
    }
    Ok(())
}
