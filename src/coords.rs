// src/coords.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Physical screen position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "PointRepr")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Accepts both `[x, y]` and `{ "x": .., "y": .. }` in the config file.
#[derive(Deserialize)]
#[serde(untagged)]
enum PointRepr {
    Pair(i32, i32),
    Named { x: i32, y: i32 },
}

impl From<PointRepr> for Point {
    fn from(p: PointRepr) -> Self {
        match p {
            PointRepr::Pair(x, y) | PointRepr::Named { x, y } => Point { x, y },
        }
    }
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Unconfigured optional buttons are written as `[0, 0]`.
    pub fn is_set(&self) -> bool {
        self.x > 0 && self.y > 0
    }

    /// Keep the point on a `(width, height)` display.
    pub fn clamp_to(self, display: (i32, i32)) -> Point {
        let (w, h) = display;
        Point {
            x: self.x.clamp(0, (w - 1).max(0)),
            y: self.y.clamp(0, (h - 1).max(0)),
        }
    }
}

/// Where the controls of Chrome's print preview and the OS save dialog sit on screen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrintDialogCoordinates {
    pub print_button: Point,
    pub filepath_input: Point,
    pub filename_input: Point,
    pub save_button: Point,
    /// "Replace existing file?" confirmation, when the dialog asks.
    #[serde(default)]
    pub yes_button: Option<Point>,
}

/// A generic save-as dialog opened by `button`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileSaveCoordinates {
    pub button: Point,
    pub filepath_input: Point,
    pub filename_input: Point,
    pub save_button: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialogCoordinates {
    pub print_dialog: PrintDialogCoordinates,
    #[serde(default)]
    pub file_save: Option<FileSaveCoordinates>,
}

impl DialogCoordinates {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read dialog coordinates {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid dialog coordinates in {}", path.display()))
    }
}

impl FileSaveCoordinates {
    /// Parse the `--coordinates` JSON passed on the command line.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid --coordinates JSON")
    }
}
