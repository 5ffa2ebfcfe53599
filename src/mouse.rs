// src/mouse.rs
use crate::coords::Point;
use anyhow::{anyhow, bail, Context, Result};
use std::process::Command;
use which::which;

pub fn ensure_xdotool() -> Result<()> {
    which("xdotool").context("xdotool not found. Install it (e.g., apt-get install xdotool).")?;
    Ok(())
}

fn xdotool(display: &str, args: &[&str]) -> Result<String> {
    let out = Command::new("xdotool")
        .env("DISPLAY", display)
        .args(args)
        .output()
        .with_context(|| format!("failed to run xdotool {}", args.join(" ")))?;

    if !out.status.success() {
        bail!(
            "xdotool {} failed: {}",
            args.first().copied().unwrap_or_default(),
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Physical X display size (px).
pub fn get_display_geometry(display: &str) -> Result<(i32, i32)> {
    let s = xdotool(display, &["getdisplaygeometry"])?;
    let mut it = s.split_whitespace();
    let w: i32 = it.next().ok_or_else(|| anyhow!("no width"))?.parse()?;
    let h: i32 = it.next().ok_or_else(|| anyhow!("no height"))?.parse()?;
    Ok((w, h))
}

/// Current cursor position.
pub fn get_mouse_location(display: &str) -> Result<Point> {
    let s = xdotool(display, &["getmouselocation", "--shell"])?;
    parse_shell_location(&s)
}

fn parse_shell_location(s: &str) -> Result<Point> {
    let mut x = None;
    let mut y = None;
    for line in s.lines() {
        if let Some(v) = line.strip_prefix("X=") {
            x = Some(v.trim().parse()?);
        }
        if let Some(v) = line.strip_prefix("Y=") {
            y = Some(v.trim().parse()?);
        }
    }
    match (x, y) {
        (Some(x), Some(y)) => Ok(Point::new(x, y)),
        _ => bail!("unexpected getmouselocation output: {s}"),
    }
}

pub fn xdotool_move(display: &str, p: Point) -> Result<()> {
    xdotool(display, &["mousemove", "--sync", &p.x.to_string(), &p.y.to_string()])?;
    Ok(())
}

/// Move the OS cursor and click (optionally double).
pub fn xdotool_move_and_click(display: &str, p: Point, double: bool) -> Result<()> {
    xdotool_move(display, p)?;
    xdotool(display, &["click", "1"])?;
    if double {
        xdotool(display, &["click", "1"])?;
    }
    Ok(())
}

/// Scroll the wheel; positive is up, negative is down.
pub fn xdotool_scroll(display: &str, clicks: i32) -> Result<()> {
    let button = if clicks >= 0 { "4" } else { "5" };
    let repeat = clicks.unsigned_abs().to_string();
    if clicks != 0 {
        xdotool(display, &["click", "--repeat", &repeat, button])?;
    }
    Ok(())
}
