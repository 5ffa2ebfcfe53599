// src/print.rs
use crate::coords::DialogCoordinates;
use crate::desktop::{DialogPauses, DialogRunner, Xdotool};
use crate::error::{AutomationError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

/// Saves the print-out the page just opened as a PDF.
#[async_trait]
pub trait PrintSaver: Send + Sync {
    async fn save_pdf(&self, file_name: &str) -> Result<()>;
}

/// `报销单_<project>_<amount>_<yyyyMMdd_HHmmss>.pdf`
pub fn print_file_name(project: &str, amount: &str, at: NaiveDateTime) -> String {
    let safe = |s: &str| -> String {
        s.chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_whitespace() => '_',
                c => c,
            })
            .collect()
    };
    format!(
        "报销单_{}_{}_{}.pdf",
        safe(project),
        safe(amount),
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Drives the native dialog from a child process of this executable
/// (`desktop print-dialog`), falling back to doing it in-process.
#[derive(Debug, Clone)]
pub struct DesktopPrintSaver {
    pub exe: PathBuf,
    pub dir: PathBuf,
    pub coordinates_file: PathBuf,
    pub display: String,
    pub timeout: Duration,
}

impl DesktopPrintSaver {
    pub fn new(dir: PathBuf, coordinates_file: PathBuf, display: String) -> Result<Self> {
        Ok(Self {
            exe: std::env::current_exe()?,
            dir,
            coordinates_file,
            display,
            timeout: Duration::from_secs(120),
        })
    }

    async fn output_dir(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(tokio::fs::canonicalize(&self.dir).await?)
    }

    async fn run_subprocess(&self, dir: &Path, file_name: &str) -> Result<()> {
        let mut cmd = Command::new(&self.exe);
        cmd.arg("desktop")
            .arg("print-dialog")
            .arg("--filepath")
            .arg(dir)
            .arg("--filename")
            .arg(file_name)
            .arg("--coordinates-file")
            .arg(&self.coordinates_file)
            .env("DISPLAY", &self.display)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| AutomationError::Desktop(format!("print dialog timed out after {:?}", self.timeout)))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            info!(target: "desktop", "{line}");
        }
        if !output.status.success() {
            return Err(AutomationError::Desktop(format!(
                "desktop print-dialog exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    async fn run_in_process(&self, dir: &Path, file_name: &str) -> Result<()> {
        let display = self.display.clone();
        let coordinates_file = self.coordinates_file.clone();
        let dir = dir.to_string_lossy().into_owned();
        let file_name = file_name.to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let coords = DialogCoordinates::load(&coordinates_file)?;
            let device = Xdotool::connect(&display)?;
            DialogRunner::new(&device, DialogPauses::default()).print_to_pdf(
                &coords.print_dialog,
                &dir,
                &file_name,
            )
        })
        .await
        .map_err(|e| AutomationError::Desktop(e.to_string()))?
        .map_err(|e| AutomationError::Desktop(format!("{e:#}")))
    }
}

#[async_trait]
impl PrintSaver for DesktopPrintSaver {
    async fn save_pdf(&self, file_name: &str) -> Result<()> {
        let dir = self.output_dir().await?;

        match self.run_subprocess(&dir, file_name).await {
            Ok(()) => {
                info!(file = %dir.join(file_name).display(), "print-out saved");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "desktop subprocess failed, driving the dialog in-process");
                self.run_in_process(&dir, file_name).await
            }
        }
    }
}
