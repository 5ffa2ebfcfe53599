// src/page.rs
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Interaction primitives the traversal engine needs from the reimbursement page.
///
/// Implementations locate elements wherever the page put them (main document or
/// any frame) and retry transient failures before reporting an error.
#[async_trait]
pub trait FormPage: Send + Sync {
    async fn fill_input(&self, element_id: &str, value: &str) -> Result<()>;

    async fn press_enter(&self, element_id: &str) -> Result<()>;

    async fn select_option(&self, element_id: &str, value: &str) -> Result<()>;

    async fn click_button(&self, element_id: &str) -> Result<()>;

    /// Click the radio (or its label) carrying `value`.
    async fn click_radio(&self, value: &str) -> Result<()>;

    async fn pick_date(&self, element_id: &str, date: NaiveDate) -> Result<()>;

    /// Open a navigation panel entry. `element_id` may be empty.
    async fn click_navigation(&self, element_id: &str, target: &str) -> Result<()>;

    /// Select the bank card whose row contains `tail`.
    async fn select_card(&self, tail: &str) -> Result<()>;

    /// Handle the bank-card popup shown after entering a transfer work id.
    /// Picks the card ending in `tail`, or the first card when `tail` is `None`,
    /// then confirms. No popup means the person has a single card.
    async fn choose_transfer_card(&self, tail: Option<&str>) -> Result<()>;

    async fn click_reservation(&self) -> Result<()>;

    async fn click_add_content(&self) -> Result<()>;

    async fn click_print(&self) -> Result<()>;

    async fn fill_captcha(&self, code: &str) -> Result<()>;
}

/// Parse a date cell (`2024-03-01` or `2024/03/01`, optional time part ignored).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let day = value.trim().split_whitespace().next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y/%m/%d"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_accept_dash_and_slash() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_date("2024-03-01"), Some(d));
        assert_eq!(parse_date("2024/3/1"), Some(d));
        assert_eq!(parse_date("2024-03-01 00:00:00"), Some(d));
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("next week"), None);
    }
}
