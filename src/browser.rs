// src/browser.rs
use crate::config::Timings;
use crate::driver::save_screenshot;
use crate::error::{AutomationError, Result};
use crate::page::FormPage;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use thirtyfour::components::SelectElement;
use thirtyfour::prelude::*;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

const JS_CLICK: &str = "arguments[0].click(); return true;";

const JS_DEFERRED_CLICK: &str =
    "var el = arguments[0]; setTimeout(function () { el.click(); }, 100); return true;";

const JS_SET_VALUE: &str = r#"
var el = arguments[0];
el.removeAttribute('readonly');
el.value = arguments[1];
el.dispatchEvent(new Event('input', { bubbles: true }));
el.dispatchEvent(new Event('change', { bubbles: true }));
return true;
"#;

const JS_PRESS_ENTER: &str = r#"
var el = arguments[0];
['keydown', 'keypress', 'keyup'].forEach(function (type) {
    el.dispatchEvent(new KeyboardEvent(type, { key: 'Enter', code: 'Enter', keyCode: 13, which: 13, bubbles: true }));
});
return true;
"#;

const JS_NAV_TO_PROJECT: &str = r#"
if (typeof navToPrj === 'function') { navToPrj(arguments[0]); return true; }
return false;
"#;

const JS_CLICK_FIRST: &str = r#"
var el = document.querySelector(arguments[0]);
if (el) { el.click(); return true; }
return false;
"#;

const JS_CLICK_CALENDAR_DAY: &str = r##"
var links = document.querySelectorAll("#ui-datepicker-div td[data-handler='selectDay'] a");
for (var i = 0; i < links.length; i++) {
    if (links[i].textContent.trim() === arguments[0]) { links[i].click(); return true; }
}
return false;
"##;

const ADD_CONTENT_CLASS: &str = "addoneformWF_YB6_4270";
const RESERVATION_ROW_PREFIX: &str = "2179_";
const CARD_RADIO_NAME: &str = "rdoacnt";

#[derive(Debug, Clone)]
enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    fn css(s: impl Into<String>) -> Self {
        Selector::Css(s.into())
    }

    fn xpath(s: impl Into<String>) -> Self {
        Selector::XPath(s.into())
    }

    fn by(&self) -> By {
        match self {
            Selector::Css(s) => By::Css(s.as_str()),
            Selector::XPath(s) => By::XPath(s.as_str()),
        }
    }
}

/// Frames are searched at most this deep.
const MAX_FRAME_DEPTH: usize = 3;

/// Frame indices from the top document down; empty is the main document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Scope(Vec<u16>);

impl Scope {
    fn children(&self, count: usize) -> impl Iterator<Item = Scope> + '_ {
        (0..count.min(u16::MAX as usize)).map(move |i| {
            let mut path = self.0.clone();
            path.push(i as u16);
            Scope(path)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    /// Prefer displayed matches, fall back to the first hidden one.
    Prefer,
    Required,
}

/// A dropdown without `value` is left untouched rather than forced to it.
fn missing_option(value: &str, what: &str) -> AutomationError {
    AutomationError::NotFound(format!("option {value} in {what}"))
}

/// Quote a value for a CSS attribute selector.
fn css_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Quote a value as an XPath string literal.
fn xpath_str(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

fn field_selectors(element_id: &str) -> Vec<Selector> {
    let v = css_str(element_id);
    vec![
        Selector::css(format!("[id={v}]")),
        Selector::css(format!("[name={v}]")),
    ]
}

fn button_selectors(element_id: &str) -> Vec<Selector> {
    let v = css_str(element_id);
    vec![
        Selector::css(format!("[id={v}]")),
        Selector::css(format!("button[btnname={v}]")),
        Selector::css(format!("button[guid*={v}]")),
        Selector::xpath(format!(
            "//button[contains(normalize-space(.), {})]",
            xpath_str(element_id)
        )),
        Selector::css(format!("input[btnname={v}]")),
        Selector::css(format!("[btnname={v}]")),
    ]
}

fn radio_selectors(value: &str) -> Vec<Selector> {
    let v = css_str(value);
    let x = xpath_str(value);
    vec![
        Selector::css(format!("input[type='radio'][name*='school_area'][value={v}]")),
        Selector::css(format!("input[type='radio'][name*='yta-filter_bcode'][value={v}]")),
        Selector::css(format!("input[type='radio'][value={v}]")),
        Selector::xpath(format!("//span[normalize-space(.)={x}]")),
        Selector::xpath(format!("//li[contains(normalize-space(.), {x})]")),
        Selector::xpath(format!("//label[contains(normalize-space(.), {x})]")),
    ]
}

fn card_selectors(tail: &str) -> Vec<Selector> {
    vec![
        Selector::xpath(format!(
            "//tr[td[contains(normalize-space(.), {})]]//input[@type='radio'][@name='{CARD_RADIO_NAME}']",
            xpath_str(tail)
        )),
        Selector::css(format!(
            "input[type='radio'][name='{CARD_RADIO_NAME}'][onclick*={}]",
            css_str(tail)
        )),
    ]
}

fn card_dialog_selectors() -> Vec<Selector> {
    vec![
        Selector::css("#paybankdiv"),
        Selector::css("div.ui-dialog[aria-describedby='paybankdiv']"),
        Selector::css(format!("input[name='{CARD_RADIO_NAME}']")),
    ]
}

fn dialog_confirm_selectors() -> Vec<Selector> {
    vec![
        Selector::xpath(
            "//div[contains(@class, 'ui-dialog-buttonpane')]//button[normalize-space(.)='确定']",
        ),
        Selector::xpath(
            "//div[contains(@class, 'ui-dialog-buttonset')]//button[contains(normalize-space(.), '确定')]",
        ),
        Selector::xpath("//button[contains(normalize-space(.), '确定')]"),
    ]
}

fn navigation_selectors(target: &str) -> (Vec<Selector>, Vec<Selector>) {
    let v = css_str(target);
    let primary = vec![Selector::css(format!("div[onclick*={v}]"))];
    let fallback = vec![
        Selector::xpath(format!(
            "//div[contains(normalize-space(.), {})]",
            xpath_str(target)
        )),
        Selector::css(format!("div[title*={v}]")),
        Selector::css(format!("div.syslink[onclick*={v}]")),
        Selector::css("div.syslink"),
    ];
    (primary, fallback)
}

fn calendar_selectors() -> Vec<Selector> {
    vec![
        Selector::css("#ui-datepicker-div"),
        Selector::css(".ui-datepicker"),
        Selector::css("[class*='datepicker']"),
        Selector::css("[id*='datepicker']"),
    ]
}

fn calendar_day_selectors(day: u32) -> Vec<Selector> {
    vec![
        Selector::xpath(format!(
            "//div[@id='ui-datepicker-div']//td[@data-handler='selectDay']/a[normalize-space(.)='{day}']"
        )),
        Selector::xpath(format!(
            "//div[@id='ui-datepicker-div']//a[normalize-space(.)='{day}']"
        )),
    ]
}

fn print_button_selectors() -> Vec<Selector> {
    vec![
        Selector::css("input[name='BtnPrint']"),
        Selector::css("input[value='打印确认单']"),
        Selector::css("input[onclick*='ybprint']"),
        Selector::css("#BtnPrint"),
        Selector::css("input.buttHighlight"),
    ]
}

fn captcha_selectors() -> Vec<Selector> {
    vec![
        Selector::css("input[name='captcha']"),
        Selector::css("input[id*='captcha']"),
        Selector::css("input[placeholder*='验证码']"),
        Selector::css("input[placeholder*='captcha']"),
        Selector::css("#captcha"),
        Selector::css(".captcha-input"),
    ]
}

/// The reimbursement page behind a live WebDriver session.
pub struct WebForm {
    driver: WebDriver,
    retry: RetryPolicy,
    timings: Timings,
    screenshot_dir: Option<PathBuf>,
}

impl WebForm {
    pub fn new(driver: WebDriver, retry: RetryPolicy, timings: Timings, screenshot_dir: Option<PathBuf>) -> Self {
        Self {
            driver,
            retry,
            timings,
            screenshot_dir,
        }
    }

    pub async fn open(&self, url: &str) -> Result<()> {
        info!(%url, "opening reimbursement page");
        self.driver.goto(url).await?;
        sleep(self.timings.page_load_wait).await;
        Ok(())
    }

    /// The main document followed by every frame below it, breadth first.
    async fn scopes(&self) -> Result<Vec<Scope>> {
        let mut scopes = vec![Scope::default()];
        let mut next = 0;
        while next < scopes.len() {
            let scope = scopes[next].clone();
            next += 1;
            if scope.0.len() >= MAX_FRAME_DEPTH || self.enter(&scope).await.is_err() {
                continue;
            }
            let Ok(frames) = self.driver.find_all(By::Css("iframe, frame")).await else {
                continue;
            };
            scopes.extend(scope.children(frames.len()));
        }
        self.driver.enter_default_frame().await?;
        Ok(scopes)
    }

    async fn enter(&self, scope: &Scope) -> WebDriverResult<()> {
        self.driver.enter_default_frame().await?;
        for &i in &scope.0 {
            self.driver.enter_frame(i).await?;
        }
        Ok(())
    }

    /// Search the main document, then every frame, for each selector in turn.
    /// On success the driver stays inside the frame holding the element.
    async fn locate(&self, selectors: &[Selector], visibility: Visibility) -> Result<Option<WebElement>> {
        let scopes = self.scopes().await?;
        let mut hidden: Option<(Scope, usize)> = None;

        for (si, selector) in selectors.iter().enumerate() {
            for scope in &scopes {
                if self.enter(scope).await.is_err() {
                    continue;
                }
                let Ok(found) = self.driver.find_all(selector.by()).await else {
                    continue;
                };
                for el in found {
                    if el.is_displayed().await.unwrap_or(false) {
                        debug!(?selector, ?scope, "element located");
                        return Ok(Some(el));
                    }
                    if hidden.is_none() {
                        hidden = Some((scope.clone(), si));
                    }
                }
            }
        }

        if visibility == Visibility::Prefer {
            if let Some((scope, si)) = hidden {
                self.enter(&scope).await?;
                let found = self.driver.find_all(selectors[si].by()).await?;
                if let Some(el) = found.into_iter().next() {
                    debug!(selector = ?selectors[si], ?scope, "hidden element located");
                    return Ok(Some(el));
                }
            }
        }

        self.driver.enter_default_frame().await?;
        Ok(None)
    }

    async fn require(&self, selectors: &[Selector], visibility: Visibility, what: &str) -> Result<WebElement> {
        self.locate(selectors, visibility)
            .await?
            .ok_or_else(|| AutomationError::NotFound(what.to_string()))
    }

    /// Poll until one of `selectors` is displayed or `timeout` passes.
    async fn wait_for(&self, selectors: &[Selector], timeout: Duration) -> Result<Option<WebElement>> {
        let start = Instant::now();
        loop {
            if let Some(el) = self.locate(selectors, Visibility::Required).await? {
                return Ok(Some(el));
            }
            if start.elapsed() >= timeout {
                return Ok(None);
            }
            sleep(Duration::from_millis(250)).await;
        }
    }

    /// Accept a pending JavaScript alert. Returns whether there was one.
    async fn accept_alert(&self) -> bool {
        match self.driver.get_alert_text().await {
            Ok(text) => {
                info!(%text, "accepting page alert");
                let _ = self.driver.accept_alert().await;
                true
            }
            Err(_) => false,
        }
    }

    async fn script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        let ret = self.driver.execute(script, args).await?;
        Ok(ret.json().clone())
    }

    async fn click(&self, el: &WebElement) -> Result<()> {
        if let Err(e) = el.click().await {
            if self.accept_alert().await {
                return Ok(());
            }
            debug!(error = %e, "native click failed, clicking by script");
            self.script(JS_CLICK, vec![el.to_json()?]).await?;
        }
        self.accept_alert().await;
        Ok(())
    }

    async fn type_into(&self, el: &WebElement, value: &str) -> Result<()> {
        let typed: WebDriverResult<()> = async {
            el.clear().await?;
            el.send_keys(value).await?;
            Ok(())
        }
        .await;

        if let Err(e) = typed {
            debug!(error = %e, "typing failed, setting value by script");
            self.script(JS_SET_VALUE, vec![el.to_json()?, json!(value)]).await?;
        }
        Ok(())
    }

    async fn try_fill(&self, selectors: &[Selector], value: &str, what: &str) -> Result<()> {
        let el = self.require(selectors, Visibility::Prefer, what).await?;
        self.type_into(&el, value).await
    }

    async fn try_press_enter(&self, selectors: &[Selector], what: &str) -> Result<()> {
        let el = self.require(selectors, Visibility::Prefer, what).await?;
        if let Err(e) = el.send_keys(Key::Enter).await {
            debug!(error = %e, "Enter key failed, dispatching key events by script");
            self.script(JS_PRESS_ENTER, vec![el.to_json()?]).await?;
        }
        Ok(())
    }

    async fn try_select(&self, selectors: &[Selector], value: &str, what: &str) -> Result<()> {
        let el = self.require(selectors, Visibility::Prefer, what).await?;
        let select = SelectElement::new(&el).await?;
        if select.select_by_value(value).await.is_ok() {
            return Ok(());
        }
        if select.select_by_exact_text(value).await.is_ok() {
            return Ok(());
        }
        Err(missing_option(value, what))
    }

    async fn try_click(&self, selectors: &[Selector], visibility: Visibility, what: &str) -> Result<()> {
        let el = self.require(selectors, visibility, what).await?;
        self.click(&el).await
    }

    /// jQuery UI calendar: open it from the input, pick year and month, click the day.
    async fn try_calendar(&self, element_id: &str, date: NaiveDate) -> Result<()> {
        let input = self
            .require(&field_selectors(element_id), Visibility::Prefer, element_id)
            .await?;
        self.click(&input).await?;
        sleep(self.timings.element_wait).await;

        if self.locate(&calendar_selectors(), Visibility::Required).await?.is_none() {
            return Err(AutomationError::NotFound(format!("calendar for {element_id}")));
        }

        let year = date.year().to_string();
        let month = date.month0().to_string();
        if let Ok(el) = self.driver.find(By::Css(".ui-datepicker-year")).await {
            SelectElement::new(&el).await?.select_by_value(year.as_str()).await?;
        }
        if let Ok(el) = self.driver.find(By::Css(".ui-datepicker-month")).await {
            SelectElement::new(&el).await?.select_by_value(month.as_str()).await?;
        }
        sleep(self.timings.element_wait).await;

        let day = date.day();
        for selector in calendar_day_selectors(day) {
            if let Ok(link) = self.driver.find(selector.by()).await {
                return self.click(&link).await;
            }
        }
        let clicked = self
            .script(JS_CLICK_CALENDAR_DAY, vec![json!(day.to_string())])
            .await?;
        if clicked.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(AutomationError::NotFound(format!("calendar day {day}")))
        }
    }

    async fn try_set_date(&self, element_id: &str, date: NaiveDate) -> Result<()> {
        let el = self
            .require(&field_selectors(element_id), Visibility::Prefer, element_id)
            .await?;
        let text = date.format("%Y-%m-%d").to_string();
        self.script(JS_SET_VALUE, vec![el.to_json()?, json!(text)]).await?;
        Ok(())
    }

    async fn try_navigate(&self, element_id: &str, target: &str) -> Result<()> {
        let (mut primary, fallback) = navigation_selectors(target);
        if !element_id.is_empty() {
            primary.insert(0, field_selectors(element_id).remove(0));
        }

        if let Some(el) = self.locate(&primary, Visibility::Required).await? {
            return self.click(&el).await;
        }

        self.driver.enter_default_frame().await?;
        if self.script(JS_NAV_TO_PROJECT, vec![json!(target)]).await?.as_bool() == Some(true) {
            debug!(target, "navigated by script");
            return Ok(());
        }

        self.try_click(&fallback, Visibility::Required, target).await
    }

    async fn try_transfer_card(&self, tail: Option<&str>) -> Result<()> {
        let Some(_dialog) = self
            .wait_for(&card_dialog_selectors(), self.timings.bank_card_dialog_wait)
            .await?
        else {
            info!("no bank card dialog, single card on file");
            return Ok(());
        };

        match tail {
            Some(tail) => {
                self.try_click(&card_selectors(tail), Visibility::Prefer, &format!("card ending {tail}"))
                    .await?
            }
            None => {
                let first = [Selector::css(format!("input[type='radio'][name='{CARD_RADIO_NAME}']"))];
                self.try_click(&first, Visibility::Prefer, "first bank card").await?
            }
        }
        sleep(self.timings.bank_card_selection_wait).await;
        self.try_confirm_dialog().await
    }

    async fn try_confirm_dialog(&self) -> Result<()> {
        if let Some(button) = self.locate(&dialog_confirm_selectors(), Visibility::Required).await? {
            self.click(&button).await?;
            sleep(self.timings.button_click_wait).await;
            return Ok(());
        }
        if self.accept_alert().await {
            return Ok(());
        }
        Err(AutomationError::NotFound("dialog confirm button".into()))
    }

    async fn try_add_content(&self) -> Result<()> {
        let selectors = [
            Selector::css(format!("div.wfIcon.ui-icon-plus.{ADD_CONTENT_CLASS}")),
            Selector::css(format!("div[class*='{ADD_CONTENT_CLASS}']")),
        ];
        if let Some(el) = self.locate(&selectors, Visibility::Prefer).await? {
            return self.click(&el).await;
        }

        let query = format!("div[class*='{ADD_CONTENT_CLASS}']");
        for scope in self.scopes().await? {
            if self.enter(&scope).await.is_err() {
                continue;
            }
            if self.script(JS_CLICK_FIRST, vec![json!(query)]).await?.as_bool() == Some(true) {
                return Ok(());
            }
        }
        Err(AutomationError::NotFound("add content button".into()))
    }

    async fn try_print(&self) -> Result<()> {
        let el = self
            .require(&print_button_selectors(), Visibility::Prefer, "print button")
            .await?;
        // the print dialog blocks the page, so the click must not wait for it
        self.script(JS_DEFERRED_CLICK, vec![el.to_json()?]).await?;
        Ok(())
    }

    /// Retry `op`, keeping a screenshot of the page when it finally fails.
    async fn attempt<F, Fut>(&self, what: &str, op: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        match self.retry.run(what, op).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(AutomationError::SessionLost(e.to_string())),
            Err(e) => {
                if let Some(dir) = &self.screenshot_dir {
                    if let Err(err) = save_screenshot(&self.driver, dir, what).await {
                        warn!(error = %err, "could not save failure screenshot");
                    }
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl FormPage for WebForm {
    async fn fill_input(&self, element_id: &str, value: &str) -> Result<()> {
        let selectors = &field_selectors(element_id);
        self.attempt(&format!("fill {element_id}"), move || {
            self.try_fill(selectors, value, element_id)
        })
        .await?;
        info!(element_id, value, "filled");
        Ok(())
    }

    async fn press_enter(&self, element_id: &str) -> Result<()> {
        let selectors = &field_selectors(element_id);
        self.attempt(&format!("enter on {element_id}"), move || {
            self.try_press_enter(selectors, element_id)
        })
        .await
    }

    async fn select_option(&self, element_id: &str, value: &str) -> Result<()> {
        let selectors = &field_selectors(element_id);
        self.attempt(&format!("select {element_id}"), move || {
            self.try_select(selectors, value, element_id)
        })
        .await?;
        info!(element_id, value, "option selected");
        sleep(self.timings.element_wait).await;
        Ok(())
    }

    async fn click_button(&self, element_id: &str) -> Result<()> {
        let selectors = &button_selectors(element_id);
        self.attempt(&format!("button {element_id}"), move || {
            self.try_click(selectors, Visibility::Required, element_id)
        })
        .await?;
        info!(element_id, "button clicked");
        sleep(self.timings.button_click_wait).await;
        Ok(())
    }

    async fn click_radio(&self, value: &str) -> Result<()> {
        let selectors = &radio_selectors(value);
        self.attempt(&format!("radio {value}"), move || {
            self.try_click(selectors, Visibility::Prefer, value)
        })
        .await?;
        info!(value, "radio selected");
        sleep(self.timings.element_wait).await;
        Ok(())
    }

    async fn pick_date(&self, element_id: &str, date: NaiveDate) -> Result<()> {
        let what = format!("date {element_id}");
        match self
            .retry
            .run(&what, move || self.try_calendar(element_id, date))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!(element_id, error = %e, "calendar unavailable, setting date by script");
                self.attempt(&what, move || self.try_set_date(element_id, date))
                    .await?;
            }
        }
        info!(element_id, %date, "date entered");
        sleep(self.timings.element_wait).await;
        Ok(())
    }

    async fn click_navigation(&self, element_id: &str, target: &str) -> Result<()> {
        self.attempt(&format!("navigate {target}"), move || {
            self.try_navigate(element_id, target)
        })
        .await?;
        info!(target, "navigation opened");
        sleep(self.timings.page_load_wait).await;
        Ok(())
    }

    async fn select_card(&self, tail: &str) -> Result<()> {
        let selectors = &card_selectors(tail);
        self.attempt(&format!("card {tail}"), move || {
            self.try_click(selectors, Visibility::Prefer, tail)
        })
        .await?;
        info!(tail, "bank card selected");
        sleep(self.timings.bank_card_selection_wait).await;
        Ok(())
    }

    async fn choose_transfer_card(&self, tail: Option<&str>) -> Result<()> {
        self.attempt("transfer card dialog", move || self.try_transfer_card(tail))
            .await
    }

    async fn click_reservation(&self) -> Result<()> {
        let selectors = &[
            Selector::xpath(format!(
                "//tr[starts-with(@id, '{RESERVATION_ROW_PREFIX}')]//button[@btnname='预约']"
            )),
            Selector::css("button[btnname='预约']"),
        ];
        self.attempt("reservation button", move || {
            self.try_click(selectors, Visibility::Required, "reservation button")
        })
        .await?;
        info!("reservation opened");
        sleep(self.timings.page_load_wait).await;
        Ok(())
    }

    async fn click_add_content(&self) -> Result<()> {
        self.attempt("add content row", move || self.try_add_content())
            .await?;
        info!("detail row added");
        sleep(self.timings.button_click_wait).await;
        Ok(())
    }

    async fn click_print(&self) -> Result<()> {
        self.attempt("print button", move || self.try_print()).await?;
        info!("print dialog requested");
        Ok(())
    }

    async fn fill_captcha(&self, code: &str) -> Result<()> {
        let selectors = &captcha_selectors();
        self.attempt("captcha", move || self.try_fill(selectors, code, "captcha input"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_scopes_extend_their_parent_path() {
        let main = Scope::default();
        let top: Vec<Scope> = main.children(2).collect();
        assert_eq!(top, vec![Scope(vec![0]), Scope(vec![1])]);

        let nested: Vec<Scope> = top[1].children(2).collect();
        assert_eq!(nested, vec![Scope(vec![1, 0]), Scope(vec![1, 1])]);
        assert_eq!(main.children(0).count(), 0);
    }

    #[test]
    fn unmatched_option_is_a_recoverable_miss() {
        let err = missing_option("火星", "province");
        assert!(!err.is_fatal());
        assert!(matches!(&err, AutomationError::NotFound(m) if m == "option 火星 in province"));
    }

    #[test]
    fn css_values_are_quoted() {
        assert_eq!(css_str("btnSave"), "'btnSave'");
        assert_eq!(css_str("it's"), "'it\\'s'");
    }

    #[test]
    fn xpath_literals_handle_quotes() {
        assert_eq!(xpath_str("确定"), "'确定'");
        assert_eq!(xpath_str("it's"), "\"it's\"");
        assert_eq!(xpath_str("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }

    #[test]
    fn button_lookup_starts_with_id_then_btnname() {
        let s = button_selectors("保存");
        assert!(matches!(&s[0], Selector::Css(c) if c == "[id='保存']"));
        assert!(matches!(&s[1], Selector::Css(c) if c == "button[btnname='保存']"));
        assert!(matches!(&s[3], Selector::XPath(x) if x.contains("normalize-space")));
    }

    #[test]
    fn card_lookup_matches_row_text_and_onclick() {
        let s = card_selectors("1234");
        assert!(matches!(&s[0], Selector::XPath(x) if x.contains("'1234'") && x.contains("rdoacnt")));
        assert!(matches!(&s[1], Selector::Css(c) if c.ends_with("[onclick*='1234']")));
    }

    #[test]
    fn calendar_day_uses_unpadded_number() {
        let s = calendar_day_selectors(5);
        assert!(matches!(&s[0], Selector::XPath(x) if x.ends_with("a[normalize-space(.)='5']")));
    }
}
