mod browser;
mod cli;
mod command;
mod config;
mod console;
mod coords;
mod desktop;
mod driver;
mod engine;
mod error;
mod keyboard;
mod mapping;
mod mouse;
mod page;
mod print;
mod records;
mod retry;
mod rules;
mod sheets;
mod titles;

use anyhow::{bail, Context, Result};
use browser::WebForm;
use clap::Parser;
use cli::{Cli, Commands, DesktopOp, RunArgs};
use config::{AppConfig, BrowserConfig};
use console::{Console, Operator};
use coords::{DialogCoordinates, FileSaveCoordinates, Point};
use desktop::{DialogPauses, DialogRunner, InputDevice, Xdotool};
use driver::{cleanup_driver, init_driver, DriverBundle};
use engine::{Engine, EngineSettings, LoginElements, RunSummary};
use mapping::TitleMap;
use print::DesktopPrintSaver;
use records::RecordTable;
use rules::FieldRules;
use sheets::read_sheet_values;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const RUN_LOG: &str = "reimbursement_automation.log";
const DESKTOP_LOG: &str = "desktop_automation.log";

fn init_tracing(verbose: bool, default_file: &str) -> Result<WorkerGuard> {
    let dir = std::env::var("LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    std::fs::create_dir_all(&dir).context("cannot create log directory")?;
    let file = std::env::var("LOG_FILE").unwrap_or_else(|_| default_file.to_string());

    let file_appender = tracing_appender::rolling::never(dir, file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stdout().is_terminal()),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_file = match cli.command {
        Some(Commands::Desktop { .. }) => DESKTOP_LOG,
        _ => RUN_LOG,
    };
    let _guard = init_tracing(cli.verbose, log_file)?;

    match cli.command {
        Some(Commands::Desktop { op }) => run_desktop(op),
        Some(Commands::Run(args)) => run(args).await,
        None => run(RunArgs::default()).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut cfg = AppConfig::from_env();
    if let Some(p) = args.records {
        cfg.records_file = p;
    }
    if let Some(p) = args.mapping {
        cfg.mapping_file = p;
    }
    if args.sheet.is_some() {
        cfg.records_sheet = args.sheet;
    }
    if args.field_rules.is_some() {
        cfg.field_rules_file = args.field_rules;
    }
    let url = args
        .url
        .or_else(|| cfg.target_url.clone())
        .context("TARGET_URL must be set (or pass --url)")?;

    let mapping = read_sheet_values(&cfg.mapping_file, None)?;
    let titles = TitleMap::from_sheet_values(&mapping);
    if titles.is_empty() {
        bail!("no title mappings found in {}", cfg.mapping_file.display());
    }
    info!(titles = titles.len(), file = %cfg.mapping_file.display(), "title mappings loaded");

    let values = read_sheet_values(&cfg.records_file, cfg.records_sheet.as_deref())?;
    let table = RecordTable::from_sheet_values(&values)?;
    info!(
        records = table.records().len(),
        columns = table.width(),
        file = %cfg.records_file.display(),
        "reimbursement records loaded"
    );

    let settings = EngineSettings {
        titles,
        rules: FieldRules::load(cfg.field_rules_file.as_deref())?,
        timings: cfg.timings.clone(),
        markers: cfg.markers.clone(),
        login: LoginElements::default(),
    };

    let mut bundle = init_driver(&cfg.browser).await?;
    let outcome = drive(&cfg, &url, &bundle, &settings, &table).await;

    match &outcome {
        Ok(summary) => info!(
            groups = summary.groups,
            failed_steps = summary.failed_steps,
            "reimbursement entry finished"
        ),
        Err(e) => error!(error = %e, "reimbursement entry aborted"),
    }

    if cfg.keep_browser_open {
        if let Err(e) = Console.acknowledge("按回车键关闭浏览器...").await {
            error!(error = %e, "could not wait for the operator");
        }
    }
    cleanup_driver(&mut bundle).await;

    outcome.map(|_| ())
}

async fn drive(
    cfg: &AppConfig,
    url: &str,
    bundle: &DriverBundle,
    settings: &EngineSettings,
    table: &RecordTable,
) -> Result<RunSummary> {
    let page = WebForm::new(
        bundle.driver.clone(),
        cfg.retry,
        cfg.timings.clone(),
        cfg.screenshot_dir.clone(),
    );
    page.open(url).await?;

    let printer = DesktopPrintSaver::new(
        cfg.print_dir.clone(),
        cfg.coordinates_file.clone(),
        bundle.display.clone(),
    )?;
    let operator = Console;

    let mut engine = Engine::new(&page, &operator, &printer, settings, table);
    Ok(engine.run().await?)
}

fn run_desktop(op: DesktopOp) -> Result<()> {
    let display_name = BrowserConfig::from_env().display;
    let device = Xdotool::connect(&display_name)?;

    match op {
        DesktopOp::Check => {
            let (w, h) = device.geometry().context("display geometry unknown")?;
            info!(display = %display_name, width = w, height = h, "desktop automation ready");
        }
        DesktopOp::Position => {
            let p = device.position()?;
            println!("{} {}", p.x, p.y);
        }
        DesktopOp::Click { x, y } => device.click(Point::new(x, y))?,
        DesktopOp::Move { x, y } => device.move_to(Point::new(x, y))?,
        DesktopOp::Scroll { clicks } => device.scroll(clicks)?,
        DesktopOp::PrintDialog {
            filepath,
            filename,
            coordinates_file,
        } => {
            let path = coordinates_file.unwrap_or_else(|| AppConfig::from_env().coordinates_file);
            let coords = DialogCoordinates::load(&path)?;
            DialogRunner::new(&device, DialogPauses::default()).print_to_pdf(
                &coords.print_dialog,
                &filepath,
                &filename,
            )?;
        }
        DesktopOp::FileSave {
            filepath,
            filename,
            coordinates,
        } => {
            let coords = match coordinates {
                Some(raw) => FileSaveCoordinates::from_json(&raw)?,
                None => {
                    let path = AppConfig::from_env().coordinates_file;
                    DialogCoordinates::load(&path)?
                        .file_save
                        .with_context(|| format!("no file_save coordinates in {}", path.display()))?
                }
            };
            DialogRunner::new(&device, DialogPauses::default()).save_file(&coords, &filepath, &filename)?;
        }
    }
    Ok(())
}
