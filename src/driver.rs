// src/driver.rs
use crate::config::BrowserConfig;
use anyhow::{bail, Context, Result};
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thirtyfour::prelude::*;
use tracing::{debug, info, warn};
use which::which;

pub struct DriverBundle {
    pub driver: WebDriver,
    pub chromedriver_child: Child,
    pub user_data_dir: PathBuf,
    pub display: String,
}

pub async fn init_driver(cfg: &BrowserConfig) -> Result<DriverBundle> {
    let chromedriver_path =
        which("chromedriver").context("chromedriver not found in PATH. Install it or add to PATH.")?;

    let xauth = guess_xauthority();
    let log_path = chromedriver_log_path();
    let log_file = File::create(&log_path)
        .with_context(|| format!("cannot create {}", log_path.display()))?;

    let chromedriver = spawn_chromedriver(
        chromedriver_path.as_path(),
        cfg.chromedriver_port,
        &cfg.display,
        xauth.as_deref(),
        log_file,
    )?;
    wait_for_port(cfg.chromedriver_port, Duration::from_secs(10))
        .await
        .context("chromedriver did not become ready on time")?;
    debug!(port = cfg.chromedriver_port, "chromedriver ready");

    let mut caps = DesiredCapabilities::chrome();

    if let Some(bin) = cfg.chrome_bin.clone().or_else(find_chrome_bin) {
        caps.set_binary(&bin)?;
    }

    // Fresh profile per run
    let timestamp_ms = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
    let mut user_data_dir = env::temp_dir();
    user_data_dir.push(format!("reimburse-autofill-{}", timestamp_ms));
    caps.add_arg(&format!("--user-data-dir={}", user_data_dir.to_string_lossy()))?;

    // Dialog coordinates are measured at scale 1 with a fixed window.
    caps.add_arg("--force-device-scale-factor=1")?;
    caps.add_arg("--high-dpi-support=1")?;

    let (win_w, win_h) = cfg.window_size;
    let (win_x, win_y) = cfg.window_position;
    caps.add_arg(&format!("--window-size={},{}", win_w, win_h))?;
    caps.add_arg(&format!("--window-position={},{}", win_x, win_y))?;

    if cfg.headless {
        warn!("headless browser: the print dialog cannot be driven");
        caps.add_arg("--headless=new")?;
    }

    // Container-friendly flags
    caps.add_arg("--disable-gpu")?;
    caps.add_arg("--no-sandbox")?;
    caps.add_arg("--disable-dev-shm-usage")?;
    caps.add_arg("--no-default-browser-check")?;
    caps.add_arg("--no-first-run")?;
    caps.add_arg("--disable-infobars")?;

    caps.add_experimental_option("excludeSwitches", vec!["enable-automation"])?;
    caps.add_experimental_option("useAutomationExtension", false)?;

    let driver_url = format!("http://127.0.0.1:{}", cfg.chromedriver_port);
    let driver = WebDriver::new(&driver_url, caps).await?;
    info!(display = %cfg.display, headless = cfg.headless, "browser session started");

    Ok(DriverBundle {
        driver,
        chromedriver_child: chromedriver,
        user_data_dir,
        display: cfg.display.clone(),
    })
}

/// Write a PNG of the current page to `dir`, never overwriting an earlier one.
pub async fn save_screenshot(driver: &WebDriver, dir: &Path, label: &str) -> Result<PathBuf> {
    let png = driver.screenshot_as_png().await?;
    std::fs::create_dir_all(dir)?;

    let stem: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let mut target = dir.join(format!("{stem}.png"));
    for i in 1.. {
        if !target.exists() {
            break;
        }
        target = dir.join(format!("{stem}-{i:03}.png"));
    }

    std::fs::write(&target, &png)?;
    info!(path = %target.display(), "saved failure screenshot");
    Ok(target)
}

pub async fn cleanup_driver(bundle: &mut DriverBundle) {
    let _ = bundle.driver.clone().quit().await;
    let _ = bundle.chromedriver_child.kill();
    let _ = std::fs::remove_dir_all(&bundle.user_data_dir);
    debug!("browser session closed");
}

fn spawn_chromedriver(
    chromedriver: &Path,
    port: u16,
    display: &str,
    xauthority: Option<&Path>,
    log_file: File,
) -> Result<Child> {
    let stdout = Stdio::from(log_file.try_clone()?);
    let mut cmd = Command::new(chromedriver);
    cmd.arg(format!("--port={port}"))
        .env("DISPLAY", display)
        .stdout(stdout)
        .stderr(Stdio::from(log_file));
    if let Some(xa) = xauthority {
        cmd.env("XAUTHORITY", xa);
    }
    cmd.spawn()
        .with_context(|| format!("failed to spawn {}", chromedriver.display()))
}

async fn wait_for_port(port: u16, timeout: Duration) -> Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("chromedriver port {port} did not open within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
    }
}

fn find_chrome_bin() -> Option<String> {
    ["google-chrome", "google-chrome-stable", "chromium-browser", "chromium"]
        .into_iter()
        .find_map(|name| which(name).ok())
        .map(|p| p.to_string_lossy().into_owned())
}

fn guess_xauthority() -> Option<PathBuf> {
    let from_env = env::var_os("XAUTHORITY").map(PathBuf::from);
    let from_home = env::var_os("HOME").map(|h| Path::new(&h).join(".Xauthority"));
    [from_env, from_home].into_iter().flatten().find(|p| p.exists())
}

/// chromedriver output goes next to our own logs.
fn chromedriver_log_path() -> PathBuf {
    env::var_os("LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chromedriver.log")
}
