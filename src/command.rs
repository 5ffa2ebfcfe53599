// src/command.rs
use crate::mapping::TitleMap;
use crate::rules::FieldRules;
use crate::titles;
use std::fmt;
use std::time::Duration;

pub const RADIO_PREFIX: &str = "$$";
pub const BUTTON_PREFIX: &str = "$";
pub const NAVIGATION_PREFIX: &str = "@";
pub const CARD_PREFIX: &str = "*";
pub const SUBJECT_PREFIX: &str = "#";

/// What one spreadsheet cell asks the page to do.
#[derive(Debug, Clone, PartialEq)]
pub enum CellCommand {
    Skip(SkipReason),
    Wait(Duration),
    ClickRadio { value: String },
    ClickReservation,
    AddContentRow,
    Navigate { element_id: String, target: String },
    ClickButton { element_id: String },
    TransferWorkId { element_id: String, work_id: String },
    Print,
    FillSubject { element_id: String, value: String },
    SelectCard { tail: String },
    SelectOption { element_id: String, field: String, value: String },
    PickDate { element_id: String, value: String },
    Fill { element_id: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    MalformedWait(String),
    UnmappedTitle(String),
    UnmappedRadio(String),
    /// Amounts only reach the page through a `#subject` pair.
    AmountWithoutSubject,
    EmptyCommand(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Empty => write!(f, "empty cell"),
            SkipReason::MalformedWait(v) => write!(f, "wait value '{v}' is not a number of seconds"),
            SkipReason::UnmappedTitle(t) => write!(f, "no element mapped for title '{t}'"),
            SkipReason::UnmappedRadio(v) => write!(f, "no element mapped for radio option '{v}'"),
            SkipReason::AmountWithoutSubject => write!(f, "amount without a preceding #subject"),
            SkipReason::EmptyCommand(v) => write!(f, "command '{v}' has no argument"),
        }
    }
}

/// Parse a wait cell: `3`, `2.5` or `$3` seconds.
pub fn parse_wait(value: &str) -> Option<Duration> {
    let raw = value.trim().trim_start_matches(BUTTON_PREFIX).trim();
    let secs: f64 = raw.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

/// Target of a `navToPrj('X')` call embedded in an element id.
pub fn navigation_target(element_id: &str) -> Option<&str> {
    let rest = element_id.split("navToPrj(").nth(1)?;
    let end = rest.find(')')?;
    let target = rest[..end].trim().trim_matches(|c| c == '\'' || c == '"');
    (!target.is_empty()).then_some(target)
}

/// Subject of a `#subject` cell, if the value is one.
pub fn subject_of(value: &str) -> Option<&str> {
    value.strip_prefix(SUBJECT_PREFIX).map(str::trim)
}

/// Classify one cell. Subject/amount pairs span two cells and are handled by the walker.
pub fn classify(title: &str, value: &str, map: &TitleMap, rules: &FieldRules) -> CellCommand {
    let value = value.trim();
    if value.is_empty() {
        return CellCommand::Skip(SkipReason::Empty);
    }

    if title.starts_with(titles::WAIT_PREFIX) {
        return match parse_wait(value) {
            Some(d) => CellCommand::Wait(d),
            None => CellCommand::Skip(SkipReason::MalformedWait(value.to_string())),
        };
    }

    if let Some(option) = value.strip_prefix(RADIO_PREFIX) {
        let option = option.trim();
        return match map.get(option) {
            Some(id) => CellCommand::ClickRadio {
                value: id.to_string(),
            },
            None => CellCommand::Skip(SkipReason::UnmappedRadio(option.to_string())),
        };
    }

    let button_arg = value.strip_prefix(BUTTON_PREFIX).map(str::trim);
    match (title, button_arg) {
        (titles::RESERVATION_BUTTON, Some(titles::RESERVATION_VALUE)) => {
            return CellCommand::ClickReservation
        }
        (titles::ADD_CONTENT_BUTTON, Some(titles::ADD_CONTENT_VALUE)) => {
            return CellCommand::AddContentRow
        }
        _ => {}
    }

    let Some(element_id) = map.get(title) else {
        return CellCommand::Skip(SkipReason::UnmappedTitle(title.to_string()));
    };
    let element_id = element_id.to_string();

    if title == titles::ONLINE_RESERVATION_BUTTON {
        return match navigation_target(&element_id) {
            Some(target) => CellCommand::Navigate {
                target: target.to_string(),
                element_id: String::new(),
            },
            None => CellCommand::ClickButton { element_id },
        };
    }

    if title.starts_with(titles::TRANSFER_WORK_ID_PREFIX) {
        return CellCommand::TransferWorkId {
            element_id,
            work_id: value.to_string(),
        };
    }

    if button_arg.is_some() {
        if titles::PRINT_TITLES.contains(&title) {
            return CellCommand::Print;
        }
        return CellCommand::ClickButton { element_id };
    }

    if title == titles::AMOUNT {
        return CellCommand::Skip(SkipReason::AmountWithoutSubject);
    }
    if title == titles::SUBJECT {
        return CellCommand::FillSubject {
            element_id,
            value: value.to_string(),
        };
    }

    if let Some(target) = value.strip_prefix(NAVIGATION_PREFIX) {
        let target = target.trim();
        if target.is_empty() {
            return CellCommand::Skip(SkipReason::EmptyCommand(value.to_string()));
        }
        return CellCommand::Navigate {
            element_id,
            target: target.to_string(),
        };
    }

    if let Some(tail) = value.strip_prefix(CARD_PREFIX) {
        let tail = tail.trim();
        if tail.is_empty() {
            return CellCommand::Skip(SkipReason::EmptyCommand(value.to_string()));
        }
        return CellCommand::SelectCard {
            tail: tail.to_string(),
        };
    }

    if let Some(field) = rules.dropdown_field(title, &element_id) {
        return CellCommand::SelectOption {
            value: rules.option_value(field, value).to_string(),
            field: field.to_string(),
            element_id,
        };
    }

    if rules.is_date_id(&element_id) {
        return CellCommand::PickDate {
            element_id,
            value: value.to_string(),
        };
    }

    CellCommand::Fill {
        element_id,
        value: value.to_string(),
    }
}
