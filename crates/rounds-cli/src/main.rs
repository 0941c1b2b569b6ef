//! `rounds`: terminal client for the rounds care-record server.
//!
//! # Usage
//!
//! ```text
//! rounds --url http://localhost:8080 --user nurse --password secret --actor T
//! rounds --config ~/.config/rounds/config.toml --date 2024-04-01
//! ```

mod app;
mod client;
mod ui;

use std::{fs::File, io, path::PathBuf, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use app::App;
use chrono::{Local, NaiveDate, Timelike};
use clap::Parser;
use client::{ApiConfig, HttpRemote};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use rounds_core::event::Hour;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rounds", about = "Terminal client for hourly care rounds")]
struct Args {
  /// TOML config file (url, username, password, actor).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the rounds server (default: http://localhost:8080).
  #[arg(long, env = "ROUNDS_URL")]
  url: Option<String>,

  #[arg(long, env = "ROUNDS_USER")]
  user: Option<String>,

  #[arg(long, env = "ROUNDS_PASSWORD")]
  password: Option<String>,

  /// Stamp written by `s` and author of new notes (default: the username).
  #[arg(long, env = "ROUNDS_ACTOR")]
  actor: Option<String>,

  /// Date to open (default: today).
  #[arg(long, value_name = "YYYY-MM-DD")]
  date: Option<NaiveDate>,

  /// Write tracing output to this file. Nothing is logged otherwise.
  #[arg(long, value_name = "FILE")]
  log: Option<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
  #[serde(default)]
  actor:    String,
}

/// Flag, else non-empty file value.
fn pick(flag: Option<String>, file: &str) -> Option<String> {
  flag.or_else(|| (!file.is_empty()).then(|| file.to_owned()))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(path) = &args.log {
    let file =
      File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .with_writer(Mutex::new(file))
      .with_ansi(false)
      .init();
  }

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let username = pick(args.user, &file_cfg.username).unwrap_or_default();
  let api_config = ApiConfig {
    base_url: pick(args.url, &file_cfg.url)
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    password: pick(args.password, &file_cfg.password).unwrap_or_default(),
    actor: pick(args.actor, &file_cfg.actor).unwrap_or_else(|| username.clone()),
    username,
  };
  if api_config.actor.is_empty() {
    anyhow::bail!("no actor configured: pass --actor or set `actor` in the config file");
  }

  let now = Local::now();
  let date = args.date.unwrap_or_else(|| now.date_naive());
  let hour = Hour::new(now.hour() as u8)?;

  let client = HttpRemote::new(api_config).context("building HTTP client")?;
  let mut app = App::new(client, date, hour);

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  let run_result = match app.load().await {
    Ok(()) => run_event_loop(&mut terminal, &mut app).await,
    Err(e) => Err(e),
  };

  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    app.poll_notices();
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key).await?
    {
      break;
    }
  }

  Ok(())
}
