// src/keyboard.rs
use anyhow::{bail, Context, Result};
use std::process::Command;
use tracing::debug;

/// Type literal text into the focused window on the given DISPLAY.
/// `per_char_delay_ms` is the inter-key delay (e.g., 6–15ms).
pub fn type_text(display: &str, text: &str, per_char_delay_ms: u64) -> Result<()> {
    let status = Command::new("xdotool")
        .env("DISPLAY", display)
        .args([
            "type",
            "--clearmodifiers",
            "--delay",
            &per_char_delay_ms.to_string(),
            "--",
            text,
        ])
        .status()
        .context("xdotool type failed")?;

    if !status.success() {
        bail!("xdotool type returned non-zero status");
    }
    Ok(())
}

/// Press one key or a combination like "ctrl+a".
pub fn xdotool_key(display: &str, key: &str) -> Result<()> {
    let combo = normalize_combo(key);
    debug!(%combo, "pressing key combo");

    let status = Command::new("xdotool")
        .env("DISPLAY", display)
        .args(["key", "--clearmodifiers", &combo])
        .status()
        .context("xdotool key failed")?;

    if !status.success() {
        bail!("xdotool key failed for combo: {combo}");
    }
    Ok(())
}

/// "Ctrl + Shift + p" -> "ctrl+shift+p", "enter" -> "Return".
pub fn normalize_combo(key: &str) -> String {
    key.split(['+', ' '])
        .filter(|s| !s.is_empty())
        .map(normalize_key_name)
        .collect::<Vec<_>>()
        .join("+")
}

fn normalize_key_name(k: &str) -> String {
    match k.trim().to_lowercase().as_str() {
        "ctrl" | "control" => "ctrl".to_string(),
        "alt" => "alt".to_string(),
        "shift" => "shift".to_string(),
        "cmd" | "meta" | "super" | "win" => "super".to_string(),
        "enter" | "return" => "Return".to_string(),
        "esc" | "escape" => "Escape".to_string(),
        "del" | "delete" => "Delete".to_string(),
        "backspace" => "BackSpace".to_string(),
        // keysyms like Tab and F1 are case-sensitive
        other => {
            if other.chars().count() == 1 {
                other.to_string()
            } else {
                capitalize_first(other)
            }
        }
    }
}

fn capitalize_first(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combos_use_xdotool_keysyms() {
        assert_eq!(normalize_combo("Ctrl + A"), "ctrl+a");
        assert_eq!(normalize_combo("enter"), "Return");
        assert_eq!(normalize_combo("delete"), "Delete");
        assert_eq!(normalize_combo("alt+tab"), "alt+Tab");
        assert_eq!(normalize_combo("cmd+shift+p"), "super+shift+p");
    }
}
