// src/config.rs
use crate::retry::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Pauses the engine inserts between page interactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    pub element_wait: Duration,
    pub button_click_wait: Duration,
    pub page_load_wait: Duration,
    pub record_wait: Duration,
    pub login_wait: Duration,
    pub bank_card_dialog_wait: Duration,
    pub bank_card_selection_wait: Duration,
    pub subject_amount_wait: Duration,
    /// Time the page's work-id lookup script needs before dependent fields settle.
    pub lookup_settle: Duration,
    pub print_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            element_wait: Duration::from_millis(500),
            button_click_wait: Duration::from_millis(1000),
            page_load_wait: Duration::from_millis(3000),
            record_wait: Duration::from_millis(2000),
            login_wait: Duration::from_millis(3000),
            bank_card_dialog_wait: Duration::from_millis(1000),
            bank_card_selection_wait: Duration::from_millis(500),
            subject_amount_wait: Duration::from_millis(1000),
            lookup_settle: Duration::from_millis(2000),
            print_settle: Duration::from_millis(2000),
        }
    }
}

impl Timings {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            element_wait: env_millis("ELEMENT_WAIT_MS", d.element_wait),
            button_click_wait: env_millis("BUTTON_CLICK_WAIT_MS", d.button_click_wait),
            page_load_wait: env_millis("PAGE_LOAD_WAIT_MS", d.page_load_wait),
            record_wait: env_millis("RECORD_WAIT_MS", d.record_wait),
            login_wait: env_millis("LOGIN_WAIT_MS", d.login_wait),
            bank_card_dialog_wait: env_millis("BANK_CARD_DIALOG_WAIT_MS", d.bank_card_dialog_wait),
            bank_card_selection_wait: env_millis(
                "BANK_CARD_SELECTION_WAIT_MS",
                d.bank_card_selection_wait,
            ),
            subject_amount_wait: env_millis("SUBJECT_AMOUNT_WAIT_MS", d.subject_amount_wait),
            lookup_settle: env_millis("LOOKUP_SETTLE_MS", d.lookup_settle),
            print_settle: env_millis("PRINT_SETTLE_MS", d.print_settle),
        }
    }

    #[cfg(test)]
    pub fn zero() -> Self {
        Self {
            element_wait: Duration::ZERO,
            button_click_wait: Duration::ZERO,
            page_load_wait: Duration::ZERO,
            record_wait: Duration::ZERO,
            login_wait: Duration::ZERO,
            bank_card_dialog_wait: Duration::ZERO,
            bank_card_selection_wait: Duration::ZERO,
            subject_amount_wait: Duration::ZERO,
            lookup_settle: Duration::ZERO,
            print_settle: Duration::ZERO,
        }
    }
}

/// Values of the `子序列开始` cell that select a repeated-entity block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsequenceMarkers {
    pub traveler: String,
    pub travel_card: String,
}

impl Default for SubsequenceMarkers {
    fn default() -> Self {
        Self {
            traveler: "1".to_string(),
            travel_card: "2".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub display: String,
    pub chromedriver_port: u16,
    pub chrome_bin: Option<String>,
    pub window_size: (u32, u32),
    pub window_position: (i32, i32),
}

impl BrowserConfig {
    pub fn from_env() -> Self {
        Self {
            headless: env_flag("HEADLESS", false),
            display: env::var("DISPLAY_VNC")
                .or_else(|_| env::var("DISPLAY"))
                .unwrap_or_else(|_| String::from(":0")),
            chromedriver_port: env_parse("CHROMEDRIVER_PORT", 9515),
            chrome_bin: env::var("CHROME_BIN").ok().filter(|s| !s.trim().is_empty()),
            window_size: (
                env_parse("CHROME_WINDOW_WIDTH", 1400),
                env_parse("CHROME_WINDOW_HEIGHT", 900),
            ),
            window_position: (
                env_parse("CHROME_WINDOW_X", 0),
                env_parse("CHROME_WINDOW_Y", 0),
            ),
        }
    }
}

/// Everything a run needs, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub target_url: Option<String>,
    pub records_file: PathBuf,
    pub mapping_file: PathBuf,
    pub records_sheet: Option<String>,
    pub field_rules_file: Option<PathBuf>,
    pub coordinates_file: PathBuf,
    pub print_dir: PathBuf,
    pub screenshot_dir: Option<PathBuf>,
    pub keep_browser_open: bool,
    pub retry: RetryPolicy,
    pub timings: Timings,
    pub markers: SubsequenceMarkers,
    pub browser: BrowserConfig,
}

impl AppConfig {
    /// Read the environment (and `.env`). Command-line overrides are applied by the caller.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = SubsequenceMarkers::default();

        Self {
            target_url: env::var("TARGET_URL").ok().filter(|s| !s.trim().is_empty()),
            records_file: env_path("RECORDS_FILE", "报销信息.xlsx"),
            mapping_file: env_path("MAPPING_FILE", "元素属性名.xlsx"),
            records_sheet: env::var("RECORDS_SHEET").ok().filter(|s| !s.trim().is_empty()),
            field_rules_file: env::var("FIELD_RULES_FILE").ok().map(PathBuf::from),
            coordinates_file: env_path("DIALOG_COORDINATES_FILE", "dialog_coordinates.json"),
            print_dir: env_path("PRINT_DIR", "pdf"),
            screenshot_dir: env::var("SCREENSHOT_DIR").ok().map(PathBuf::from),
            keep_browser_open: env_flag("KEEP_BROWSER_OPEN", true),
            retry: RetryPolicy::new(
                env_parse("MAX_RETRIES", 3),
                env_millis("RETRY_DELAY_MS", Duration::from_millis(1000)),
            ),
            timings: Timings::from_env(),
            markers: SubsequenceMarkers {
                traveler: env::var("TRAVELER_MARKER").unwrap_or(defaults.traveler),
                travel_card: env::var("TRAVEL_CARD_MARKER").unwrap_or(defaults.travel_card),
            },
            browser: BrowserConfig::from_env(),
        }
    }
}

pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

pub fn env_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

pub fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn unset_keys_fall_back_to_defaults() {
        let key = "REIMBURSE_AUTOFILL_TEST_UNSET_KEY";
        assert_eq!(env_parse(key, 7usize), 7);
        assert_eq!(env_millis(key, Duration::from_millis(250)), Duration::from_millis(250));
        assert!(env_flag(key, true));
    }

    #[test]
    fn zero_timings_have_no_pauses() {
        let t = Timings::zero();
        assert_eq!(t.login_wait, Duration::ZERO);
        assert_eq!(t.lookup_settle, Duration::ZERO);
        assert!(Timings::default().page_load_wait > Duration::ZERO);
    }
}
