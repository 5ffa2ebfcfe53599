// src/console.rs
use crate::error::{AutomationError, Result};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};

/// The person sitting in front of the browser.
#[async_trait]
pub trait Operator: Send + Sync {
    /// Ask for the login captcha shown on the page.
    async fn captcha(&self) -> Result<String>;

    /// Block until the operator confirms `prompt`.
    async fn acknowledge(&self, prompt: &str) -> Result<()>;
}

/// Operator prompts on stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct Console;

fn prompt_line(prompt: String) -> Result<String> {
    let mut out = io::stdout();
    write!(out, "{prompt}")?;
    out.flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Err(AutomationError::Operator("stdin closed".into()));
    }
    Ok(line.trim().to_string())
}

#[async_trait]
impl Operator for Console {
    async fn captcha(&self) -> Result<String> {
        tokio::task::spawn_blocking(|| prompt_line("请输入验证码 (captcha): ".to_string()))
            .await
            .map_err(|e| AutomationError::Operator(e.to_string()))?
    }

    async fn acknowledge(&self, prompt: &str) -> Result<()> {
        let prompt = format!("{prompt} ");
        tokio::task::spawn_blocking(move || prompt_line(prompt))
            .await
            .map_err(|e| AutomationError::Operator(e.to_string()))?
            .map(|_| ())
    }
}
