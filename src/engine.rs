// src/engine.rs
use crate::command::{classify, parse_wait, subject_of, CellCommand, SkipReason, CARD_PREFIX};
use crate::config::{SubsequenceMarkers, Timings};
use crate::console::Operator;
use crate::error::Result;
use crate::mapping::TitleMap;
use crate::page::{parse_date, FormPage};
use crate::print::{print_file_name, PrintSaver};
use crate::records::{BlockKind, Record, RecordGroup, RecordTable};
use crate::rules::FieldRules;
use crate::sheets::cell_ref;
use crate::titles;
use chrono::Local;
use std::ops::Range;
use tokio::time::sleep;
use tracing::{debug, info, info_span, warn, Instrument};

/// Element ids of the login form.
#[derive(Debug, Clone)]
pub struct LoginElements {
    pub work_id: String,
    pub password: String,
    pub submit: String,
}

impl Default for LoginElements {
    fn default() -> Self {
        Self {
            work_id: "uid".into(),
            password: "pwd".into(),
            submit: "zhLogin".into(),
        }
    }
}

/// Static inputs of a run besides the records themselves.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub titles: TitleMap,
    pub rules: FieldRules,
    pub timings: Timings,
    pub markers: SubsequenceMarkers,
    pub login: LoginElements,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub groups: usize,
    pub failed_steps: usize,
}

/// Per-submission values remembered for naming the print-out.
#[derive(Debug, Default)]
struct GroupState {
    sequence: String,
    project_number: Option<String>,
    amount: Option<String>,
    fallback_project: Option<String>,
    fallback_amount: Option<String>,
}

/// Walks record groups and turns their cells into page interactions.
pub struct Engine<'a, P, O, S> {
    page: &'a P,
    operator: &'a O,
    printer: &'a S,
    settings: &'a EngineSettings,
    table: &'a RecordTable,
    state: GroupState,
    failed_steps: usize,
}

impl<'a, P, O, S> Engine<'a, P, O, S>
where
    P: FormPage,
    O: Operator,
    S: PrintSaver,
{
    pub fn new(
        page: &'a P,
        operator: &'a O,
        printer: &'a S,
        settings: &'a EngineSettings,
        table: &'a RecordTable,
    ) -> Self {
        Self {
            page,
            operator,
            printer,
            settings,
            table,
            state: GroupState::default(),
            failed_steps: 0,
        }
    }

    /// Process every record group in sequence order.
    /// Stops early only when the browser session is gone.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let table = self.table;
        let groups = table.groups();
        info!(groups = groups.len(), "starting reimbursement entry");

        let mut done = 0;
        for (i, group) in groups.iter().enumerate() {
            let span = info_span!("group", sequence = %group.sequence);
            self.process_group(group).instrument(span).await?;
            done += 1;

            if i + 1 < groups.len() {
                sleep(self.settings.timings.record_wait).await;
            }
        }

        Ok(RunSummary {
            groups: done,
            failed_steps: self.failed_steps,
        })
    }

    pub async fn process_group(&mut self, group: &RecordGroup<'_>) -> Result<()> {
        let table = self.table;
        let Some(first) = group.first() else {
            return Ok(());
        };

        self.state = GroupState {
            sequence: group.sequence.clone(),
            fallback_project: first_value(table, first, &titles::PROJECT_NUMBER_FALLBACKS),
            fallback_amount: first_value(table, first, &titles::AMOUNT_FALLBACKS),
            ..GroupState::default()
        };

        let blocks = table.block_kinds(group, &self.settings.markers);
        info!(rows = group.len(), ?blocks, "processing record group");

        if table.value(first, titles::LOGIN_WORK_ID).is_some() {
            self.login(first).await?;
        }

        for pos in 0..group.len() {
            self.walk_record(group, pos).await?;
        }

        info!(sequence = %self.state.sequence, "record group done");
        Ok(())
    }

    async fn login(&mut self, record: &Record) -> Result<()> {
        let table = self.table;
        let page = self.page;
        let settings = self.settings;
        let login = &settings.login;
        info!("logging in");

        if let Some(uid) = table.value(record, titles::LOGIN_WORK_ID) {
            self.settle("login work id", page.fill_input(&login.work_id, uid).await)?;
        }
        if let Some(pwd) = table.value(record, titles::LOGIN_PASSWORD) {
            self.settle("login password", page.fill_input(&login.password, pwd).await)?;
        }

        match self.operator.captcha().await {
            Ok(code) if !code.is_empty() => {
                self.settle("captcha", page.fill_captcha(&code).await)?;
            }
            Ok(_) => warn!("empty captcha entered"),
            Err(e) => self.settle("captcha prompt", Err(e))?,
        }

        if table.value(record, titles::LOGIN_BUTTON).is_some() {
            self.settle("login button", page.click_button(&login.submit).await)?;
        }

        sleep(settings.timings.login_wait).await;
        Ok(())
    }

    async fn walk_record(&mut self, group: &RecordGroup<'_>, pos: usize) -> Result<()> {
        let table = self.table;
        let layout = table.layout();
        let record = group.records[pos];
        let width = table.width();
        debug!(row = record.sheet_row, "walking row");

        let mut col = 0;
        while col < width {
            if Some(col) == layout.block_start {
                match BlockKind::classify(record.cell(col), &self.settings.markers) {
                    Some(BlockKind::Traveler) => self.traveler_block(group, pos).await?,
                    Some(BlockKind::TravelCard) => self.card_block(group, pos).await?,
                    Some(BlockKind::Generic(label)) => {
                        debug!(%label, row = record.sheet_row, "generic block");
                        self.walk_columns(record, layout.bracket(width)).await?;
                    }
                    None => {}
                }
                col = layout.after_bracket(col, width);
                continue;
            }
            if layout.is_control(col) {
                col += 1;
                continue;
            }
            col = self.step(record, col, width).await?;
        }
        Ok(())
    }

    async fn walk_columns(&mut self, record: &Record, range: Range<usize>) -> Result<()> {
        let table = self.table;
        let layout = table.layout();
        let mut col = range.start;
        while col < range.end {
            if layout.is_control(col) {
                col += 1;
                continue;
            }
            col = self.step(record, col, range.end).await?;
        }
        Ok(())
    }

    /// Handle the cell at `col` and return the next column to look at.
    async fn step(&mut self, record: &Record, col: usize, limit: usize) -> Result<usize> {
        let value = record.cell(col);
        if value.is_empty() {
            return Ok(col + 1);
        }
        if let Some(subject) = subject_of(value) {
            return self.subject_pair(record, col, subject, limit).await;
        }

        let table = self.table;
        let title = table.title(col);
        self.dispatch(record, col, title, value).await?;
        Ok(col + 1)
    }

    /// `#subject` in one cell, its amount in the next.
    async fn subject_pair(
        &mut self,
        record: &Record,
        col: usize,
        subject: &str,
        limit: usize,
    ) -> Result<usize> {
        let table = self.table;
        let settings = self.settings;
        let at = cell_ref(col, record.sheet_row);
        let next = col + 1;

        let Some(element_id) = settings.titles.get(subject) else {
            warn!(cell = %at, subject, "no element mapped for expense subject");
            return Ok(next);
        };
        if next >= limit {
            warn!(cell = %at, subject, "expense subject has no amount column");
            return Ok(next);
        }
        let amount = record.cell(next);
        if amount.is_empty() {
            warn!(cell = %at, subject, "expense subject without amount");
            return Ok(next + 1);
        }

        self.remember(table.title(next), amount);
        info!(cell = %at, subject, amount, "expense subject");
        sleep(settings.timings.subject_amount_wait).await;
        let page = self.page;
        self.settle("expense amount", page.fill_input(element_id, amount).await)?;
        Ok(next + 1)
    }

    async fn dispatch(&mut self, record: &Record, col: usize, title: &str, value: &str) -> Result<()> {
        self.remember(title, value);
        let settings = self.settings;
        let at = cell_ref(col, record.sheet_row);
        let command = classify(title, value, &settings.titles, &settings.rules);
        debug!(cell = %at, title, ?command, "dispatch");
        self.execute(record, &at, command).await
    }

    async fn execute(&mut self, record: &Record, at: &str, command: CellCommand) -> Result<()> {
        let page = self.page;
        let settings = self.settings;
        let timings = &settings.timings;

        match command {
            CellCommand::Skip(SkipReason::Empty) => Ok(()),
            CellCommand::Skip(reason) => {
                warn!(cell = %at, %reason, "cell skipped");
                Ok(())
            }
            CellCommand::Wait(d) => {
                info!(cell = %at, seconds = d.as_secs_f64(), "waiting");
                sleep(d).await;
                Ok(())
            }
            CellCommand::ClickRadio { value } => {
                self.settle(at, page.click_radio(&value).await)
            }
            CellCommand::ClickReservation => self.settle(at, page.click_reservation().await),
            CellCommand::AddContentRow => self.settle(at, page.click_add_content().await),
            CellCommand::Navigate { element_id, target } => {
                self.settle(at, page.click_navigation(&element_id, &target).await)
            }
            CellCommand::ClickButton { element_id } => {
                self.settle(at, page.click_button(&element_id).await)
            }
            CellCommand::TransferWorkId { element_id, work_id } => {
                self.transfer_work_id(record, &element_id, &work_id).await
            }
            CellCommand::Print => self.print().await,
            CellCommand::FillSubject { element_id, value } => {
                sleep(timings.subject_amount_wait).await;
                self.settle(at, page.fill_input(&element_id, &value).await)
            }
            CellCommand::SelectCard { tail } => self.settle(at, page.select_card(&tail).await),
            CellCommand::SelectOption { element_id, field, value } => {
                debug!(cell = %at, %field, %value, "dropdown");
                self.settle(at, page.select_option(&element_id, &value).await)
            }
            CellCommand::PickDate { element_id, value } => self.enter_date(&element_id, &value).await,
            CellCommand::Fill { element_id, value } => {
                self.settle(at, page.fill_input(&element_id, &value).await)
            }
        }
    }

    async fn enter_date(&mut self, element_id: &str, value: &str) -> Result<()> {
        let page = self.page;
        let Some(date) = parse_date(value) else {
            warn!(element_id, value, "not a date, entering as text");
            return self.settle(element_id, page.fill_input(element_id, value).await);
        };

        match page.pick_date(element_id, date).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(element_id, error = %e, "date picker failed, typing the date");
                let text = date.format("%Y-%m-%d").to_string();
                self.settle(element_id, page.fill_input(element_id, &text).await)
            }
        }
    }

    /// Work id of the person receiving a transfer; the page then asks which card.
    async fn transfer_work_id(&mut self, record: &Record, element_id: &str, work_id: &str) -> Result<()> {
        let page = self.page;
        let settings = self.settings;
        let timings = &settings.timings;

        self.settle("transfer work id", page.fill_input(element_id, work_id).await)?;
        sleep(timings.element_wait).await;
        self.settle("transfer work id enter", page.press_enter(element_id).await)?;
        sleep(timings.bank_card_dialog_wait).await;

        let tail = self.card_tail_for(record, work_id);
        info!(work_id, tail = tail.as_deref().unwrap_or("<first>"), "choosing transfer card");
        self.settle("transfer card", page.choose_transfer_card(tail.as_deref()).await)?;
        sleep(timings.bank_card_selection_wait).await;
        Ok(())
    }

    /// Card tail for `work_id`: same row first, then any row naming the same work id.
    fn card_tail_for(&self, record: &Record, work_id: &str) -> Option<String> {
        let table = self.table;
        let tail_of = |r: &Record| {
            table
                .value_with_prefix(r, titles::CARD_TAIL_PREFIX)
                .and_then(card_tail)
                .map(str::to_string)
        };

        tail_of(record).or_else(|| {
            table
                .records()
                .iter()
                .filter(|r| table.value_with_prefix(r, titles::TRANSFER_WORK_ID_PREFIX) == Some(work_id))
                .find_map(tail_of)
        })
    }

    async fn traveler_block(&mut self, group: &RecordGroup<'_>, pos: usize) -> Result<()> {
        let table = self.table;
        let marker = self.settings.markers.traveler.clone();
        let mut slot = 0;

        for record in &group.records[pos..] {
            let closes = table.layout().closes_block(record, &marker);
            let has_traveler = titles::TRAVELER_FIELDS
                .iter()
                .any(|f| table.value(record, f).is_some());

            if has_traveler {
                if slot >= titles::MAX_BLOCK_ENTRIES {
                    warn!(row = record.sheet_row, max = titles::MAX_BLOCK_ENTRIES, "traveler block full, rest ignored");
                    break;
                }
                self.enter_traveler(record, slot).await?;
                self.enter_itinerary(record).await?;
                slot += 1;
            } else {
                debug!(row = record.sheet_row, "no traveler data in row");
            }

            if closes {
                break;
            }
        }

        info!(travelers = slot, "traveler block done");
        Ok(())
    }

    async fn enter_traveler(&mut self, record: &Record, slot: usize) -> Result<()> {
        let table = self.table;
        let page = self.page;
        let settings = self.settings;
        info!(slot, row = record.sheet_row, "entering traveler");

        for field in titles::TRAVELER_FIELDS {
            let Some(value) = table.value(record, field) else {
                continue;
            };
            let Some(element_id) = settings.titles.get_indexed(field, slot) else {
                warn!(field, slot, "no element mapped for traveler field");
                continue;
            };

            match field {
                titles::TRAVELER_KIND => {
                    let option = settings.rules.option_value(field, value);
                    self.settle(field, page.select_option(element_id, option).await)?;
                }
                titles::TRAVELER_WORK_ID => {
                    self.settle(field, page.fill_input(element_id, value).await)?;
                    // the work-id lookup rewrites the name field
                    sleep(settings.timings.lookup_settle).await;
                    let name = table.value(record, titles::TRAVELER_NAME);
                    let name_id = settings.titles.get_indexed(titles::TRAVELER_NAME, slot);
                    if let (Some(name), Some(name_id)) = (name, name_id) {
                        self.settle("traveler name refill", page.fill_input(name_id, name).await)?;
                        sleep(settings.timings.element_wait).await;
                    }
                }
                _ => self.settle(field, page.fill_input(element_id, value).await)?,
            }
        }
        Ok(())
    }

    /// Trip details bracketed with a traveler row. They always target the first detail row.
    async fn enter_itinerary(&mut self, record: &Record) -> Result<()> {
        let table = self.table;
        let page = self.page;
        let settings = self.settings;
        let layout = table.layout();

        for col in layout.bracket(table.width()) {
            let title = table.title(col);
            if layout.is_control(col)
                || titles::TRAVELER_FIELDS.contains(&title)
                || titles::CARD_FIELDS.contains(&title)
            {
                continue;
            }
            let value = record.cell(col);
            if value.is_empty() {
                continue;
            }
            if title.starts_with(titles::WAIT_PREFIX) {
                if let Some(d) = parse_wait(value) {
                    sleep(d).await;
                }
                continue;
            }
            let Some(element_id) = settings.titles.get_indexed(title, titles::ITINERARY_SLOT) else {
                debug!(title, "no itinerary element mapped");
                continue;
            };

            if settings.rules.is_date_id(element_id) {
                self.enter_date(element_id, value).await?;
            } else if let Some(field) = settings
                .rules
                .dropdown_field(title, element_id)
                .or((title == titles::PROVINCE).then_some(title))
            {
                let option = settings.rules.option_value(field, value);
                self.settle(title, page.select_option(element_id, option).await)?;
            } else {
                self.settle(title, page.fill_input(element_id, value).await)?;
            }
        }
        Ok(())
    }

    async fn card_block(&mut self, group: &RecordGroup<'_>, pos: usize) -> Result<()> {
        let table = self.table;
        let marker = self.settings.markers.travel_card.clone();
        let mut slot = 0;

        for record in &group.records[pos..] {
            let closes = table.layout().closes_block(record, &marker);
            let has_card = titles::CARD_FIELDS
                .iter()
                .any(|f| table.value(record, f).is_some());

            if has_card {
                if slot >= titles::MAX_BLOCK_ENTRIES {
                    warn!(row = record.sheet_row, max = titles::MAX_BLOCK_ENTRIES, "card block full, rest ignored");
                    break;
                }
                self.enter_card_transfer(record, slot).await?;
                slot += 1;
            }

            if closes {
                break;
            }
        }

        info!(transfers = slot, "card transfer block done");
        Ok(())
    }

    async fn enter_card_transfer(&mut self, record: &Record, slot: usize) -> Result<()> {
        let table = self.table;
        let page = self.page;
        let settings = self.settings;
        info!(slot, row = record.sheet_row, "entering card transfer");

        for field in titles::CARD_FIELDS {
            let Some(value) = table.value(record, field) else {
                continue;
            };

            if field == titles::CARD_TAIL {
                match card_tail(value) {
                    Some(tail) => self.settle(field, page.select_card(tail).await)?,
                    None => warn!(row = record.sheet_row, value, "card tail must look like *1234, skipped"),
                }
                continue;
            }

            let Some(element_id) = settings.titles.get_indexed(field, slot) else {
                warn!(field, slot, "no element mapped for card transfer field");
                continue;
            };
            self.settle(field, page.fill_input(element_id, value).await)?;
            if field == titles::CARD_WORK_ID {
                sleep(settings.timings.lookup_settle).await;
            }
        }
        Ok(())
    }

    async fn print(&mut self) -> Result<()> {
        let page = self.page;
        let settings = self.settings;
        let timings = &settings.timings;

        sleep(timings.print_settle).await;
        if let Err(e) = page.click_print().await {
            return self.settle("print button", Err(e));
        }
        sleep(timings.print_settle).await;

        let project = self.project_number();
        let amount = self.amount();
        let file_name = print_file_name(&project, &amount, Local::now().naive_local());
        info!(%project, %amount, file = %file_name, "saving print-out");

        let printer = self.printer;
        self.settle("save print-out", printer.save_pdf(&file_name).await)
    }

    fn remember(&mut self, title: &str, value: &str) {
        match title {
            titles::PROJECT_NUMBER => self.state.project_number = Some(value.to_string()),
            titles::AMOUNT => self.state.amount = Some(value.to_string()),
            _ => {}
        }
    }

    fn project_number(&self) -> String {
        self.state
            .project_number
            .clone()
            .or_else(|| self.state.fallback_project.clone())
            .unwrap_or_else(|| titles::UNKNOWN_PROJECT.to_string())
    }

    fn amount(&self) -> String {
        self.state
            .amount
            .clone()
            .or_else(|| self.state.fallback_amount.clone())
            .unwrap_or_else(|| titles::UNKNOWN_AMOUNT.to_string())
    }

    /// Log a failed step and keep going, unless the session is gone.
    fn settle(&mut self, what: &str, outcome: Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.failed_steps += 1;
                warn!(step = what, error = %e, "step failed, continuing");
                Ok(())
            }
        }
    }
}

/// `*1234` -> `1234`. Anything without the card prefix, or with nothing after it, is no tail.
fn card_tail(value: &str) -> Option<&str> {
    value
        .trim()
        .strip_prefix(CARD_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn first_value(table: &RecordTable, record: &Record, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|t| table.value(record, t))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutomationError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakePage {
        calls: Mutex<Vec<String>>,
        missing: Vec<String>,
        fatal_on: Option<String>,
    }

    impl FakePage {
        fn missing(keys: &[&str]) -> Self {
            Self {
                missing: keys.iter().map(|k| k.to_string()).collect(),
                ..Self::default()
            }
        }

        fn log(&self, call: String, key: &str) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fatal_on.as_deref() == Some(key) {
                return Err(AutomationError::SessionLost("window closed".into()));
            }
            if self.missing.iter().any(|m| m == key) {
                return Err(AutomationError::NotFound(key.to_string()));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FormPage for FakePage {
        async fn fill_input(&self, element_id: &str, value: &str) -> Result<()> {
            self.log(format!("fill {element_id}={value}"), element_id)
        }
        async fn press_enter(&self, element_id: &str) -> Result<()> {
            self.log(format!("enter {element_id}"), element_id)
        }
        async fn select_option(&self, element_id: &str, value: &str) -> Result<()> {
            self.log(format!("select {element_id}={value}"), element_id)
        }
        async fn click_button(&self, element_id: &str) -> Result<()> {
            self.log(format!("button {element_id}"), element_id)
        }
        async fn click_radio(&self, value: &str) -> Result<()> {
            self.log(format!("radio {value}"), value)
        }
        async fn pick_date(&self, element_id: &str, date: NaiveDate) -> Result<()> {
            self.log(format!("date {element_id}={date}"), &format!("date:{element_id}"))
        }
        async fn click_navigation(&self, _element_id: &str, target: &str) -> Result<()> {
            self.log(format!("nav {target}"), target)
        }
        async fn select_card(&self, tail: &str) -> Result<()> {
            self.log(format!("card {tail}"), tail)
        }
        async fn choose_transfer_card(&self, tail: Option<&str>) -> Result<()> {
            let tail = tail.unwrap_or("<first>");
            self.log(format!("transfer-card {tail}"), tail)
        }
        async fn click_reservation(&self) -> Result<()> {
            self.log("reservation".into(), "reservation")
        }
        async fn click_add_content(&self) -> Result<()> {
            self.log("add-row".into(), "add-row")
        }
        async fn click_print(&self) -> Result<()> {
            self.log("print".into(), "print")
        }
        async fn fill_captcha(&self, code: &str) -> Result<()> {
            self.log(format!("captcha {code}"), "captcha")
        }
    }

    struct FakeOperator;

    #[async_trait]
    impl Operator for FakeOperator {
        async fn captcha(&self) -> Result<String> {
            Ok("AB12".into())
        }
        async fn acknowledge(&self, _prompt: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePrinter {
        saved: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PrintSaver for FakePrinter {
        async fn save_pdf(&self, file_name: &str) -> Result<()> {
            self.saved.lock().unwrap().push(file_name.to_string());
            Ok(())
        }
    }

    fn table(data: &[&[&str]]) -> RecordTable {
        let values: Vec<Vec<String>> = data
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        RecordTable::from_sheet_values(&values).unwrap()
    }

    fn settings<K: Into<String>, V: Into<String>>(map: Vec<(K, V)>) -> EngineSettings {
        EngineSettings {
            titles: map.into_iter().collect(),
            timings: Timings::zero(),
            ..EngineSettings::default()
        }
    }

    async fn run_with(page: &FakePage, settings: &EngineSettings, table: &RecordTable) -> Result<RunSummary> {
        let printer = FakePrinter::default();
        Engine::new(page, &FakeOperator, &printer, settings, table).run().await
    }

    #[tokio::test]
    async fn plain_row_dispatches_in_column_order() {
        let t = table(&[
            &["序号", "事由", "等待", "保存按钮", "处理进度"],
            &["1", "参加会议", "0", "$保存", "完成"],
        ]);
        let s = settings(vec![("事由", "sy"), ("保存按钮", "btnSave"), ("处理进度", "progress")]);
        let page = FakePage::default();

        let summary = run_with(&page, &s, &t).await.unwrap();
        assert_eq!(summary, RunSummary { groups: 1, failed_steps: 0 });
        assert_eq!(page.calls(), vec!["fill sy=参加会议", "button btnSave"]);
    }

    #[tokio::test]
    async fn groups_run_in_sequence_order() {
        let t = table(&[&["序号", "事由"], &["2", "second"], &["1", "first"], &["2", "third"]]);
        let s = settings(vec![("事由", "sy")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(page.calls(), vec!["fill sy=first", "fill sy=second", "fill sy=third"]);
    }

    #[tokio::test]
    async fn subject_pair_fills_amount_and_names_print_out() {
        let t = table(&[
            &["序号", "报销项目号", "科目", "金额", "打印按钮"],
            &["1", "XM01", "#住宿费", "300", "$打印"],
        ]);
        let s = settings(vec![
            ("报销项目号", "xmbh"),
            ("住宿费", "zsf_amount"),
            ("打印按钮", "BtnPrint"),
        ]);
        let page = FakePage::default();
        let printer = FakePrinter::default();

        Engine::new(&page, &FakeOperator, &printer, &s, &t).run().await.unwrap();

        assert_eq!(page.calls(), vec!["fill xmbh=XM01", "fill zsf_amount=300", "print"]);
        let saved = printer.saved.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].starts_with("报销单_XM01_300_"), "{}", saved[0]);
    }

    #[tokio::test]
    async fn print_name_falls_back_to_row_values() {
        let t = table(&[
            &["序号", "项目编号", "总金额", "打印按钮"],
            &["1", "P9", "88", "$打印"],
        ]);
        let s = settings(vec![("打印按钮", "BtnPrint")]);
        let page = FakePage::default();
        let printer = FakePrinter::default();

        Engine::new(&page, &FakeOperator, &printer, &s, &t).run().await.unwrap();

        let saved = printer.saved.lock().unwrap().clone();
        assert!(saved[0].starts_with("报销单_P9_88_"), "{}", saved[0]);
    }

    #[tokio::test]
    async fn login_runs_before_the_first_row() {
        let t = table(&[
            &["序号", "登录界面工号", "登录界面密码", "登录按钮", "事由"],
            &["1", "u1", "p1", "$登录", "x"],
        ]);
        let s = settings(vec![("事由", "sy"), ("登录按钮", "ignored")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(
            page.calls(),
            vec!["fill uid=u1", "fill pwd=p1", "captcha AB12", "button zhLogin", "fill sy=x"]
        );
    }

    #[tokio::test]
    async fn traveler_block_fills_indexed_slots() {
        let t = table(&[
            &["序号", "子序列开始", "姓名", "人员类型", "工号", "出发日期", "子序列结束", "事由"],
            &["1", "1", "张三", "教师", "1001", "2024-03-01", "", "出差"],
            &["1", "", "李四", "学生", "1002", "", "1", ""],
            &["1", "", "", "", "", "", "", "备注行"],
        ]);
        let s = settings(vec![
            ("姓名-0", "xm-0"),
            ("人员类型-0", "lx-0"),
            ("工号-0", "gh-0"),
            ("姓名-1", "xm-1"),
            ("人员类型-1", "lx-1"),
            ("工号-1", "gh-1"),
            ("出发日期-0", "startdate-0"),
            ("事由", "sy"),
        ]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(
            page.calls(),
            vec![
                "fill xm-0=张三",
                "select lx-0=教师",
                "fill gh-0=1001",
                "fill xm-0=张三",
                "date startdate-0=2024-03-01",
                "fill xm-1=李四",
                "select lx-1=学生",
                "fill gh-1=1002",
                "fill xm-1=李四",
                "fill sy=出差",
                "fill sy=备注行",
            ]
        );
    }

    #[tokio::test]
    async fn traveler_block_caps_at_six_entries() {
        let mut data: Vec<Vec<String>> = vec![vec!["序号".into(), "子序列开始".into(), "姓名".into()]];
        for i in 0..8 {
            let start = if i == 0 { "1" } else { "" };
            data.push(vec!["1".into(), start.into(), format!("p{i}")]);
        }
        let t = RecordTable::from_sheet_values(&data).unwrap();
        let s = settings((0..8).map(|i| (format!("姓名-{i}"), format!("xm-{i}"))).collect());
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        let calls = page.calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(calls.last().map(String::as_str), Some("fill xm-5=p5"));
    }

    #[tokio::test]
    async fn card_block_selects_starred_tails_and_fills_amounts() {
        let t = table(&[
            &["序号", "子序列开始", "差旅转卡工号", "差旅卡号尾号", "个人差旅金额", "子序列结束"],
            &["1", "2", "1001", "*1234", "500", ""],
            &["1", "", "1002", "5678", "300", "2"],
        ]);
        let s = settings(vec![
            ("差旅转卡工号-0", "zk-0"),
            ("个人差旅金额-0", "je-0"),
            ("差旅转卡工号-1", "zk-1"),
            ("个人差旅金额-1", "je-1"),
        ]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(
            page.calls(),
            vec![
                "fill zk-0=1001",
                "card 1234",
                "fill je-0=500",
                "fill zk-1=1002",
                "fill je-1=300",
            ]
        );
    }

    #[tokio::test]
    async fn transfer_work_id_picks_card_from_tail_column() {
        let t = table(&[&["序号", "转卡信息工号", "卡号尾号"], &["1", "1001", "*4321"]]);
        let s = settings(vec![("转卡信息工号", "zkgh")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(page.calls(), vec!["fill zkgh=1001", "enter zkgh", "transfer-card 4321"]);
    }

    #[tokio::test]
    async fn transfer_work_id_without_tail_takes_first_card() {
        let t = table(&[&["序号", "转卡信息工号"], &["1", "1001"]]);
        let s = settings(vec![("转卡信息工号", "zkgh")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(page.calls().last().map(String::as_str), Some("transfer-card <first>"));
    }

    #[tokio::test]
    async fn bare_star_tail_falls_back_to_first_card() {
        let t = table(&[&["序号", "转卡信息工号", "卡号尾号"], &["1", "1001", "*"]]);
        let s = settings(vec![("转卡信息工号", "zkgh")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(page.calls(), vec!["fill zkgh=1001", "enter zkgh", "transfer-card <first>"]);
    }

    #[tokio::test]
    async fn transfer_tail_is_found_in_another_row_with_the_same_work_id() {
        let t = table(&[
            &["序号", "转卡信息工号", "卡号尾号"],
            &["1", "1001", "*"],
            &["2", "1002", "*1111"],
            &["2", "1001", "*4321"],
        ]);
        let s = settings(vec![("转卡信息工号", "zkgh")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(
            &page.calls()[..3],
            &["fill zkgh=1001", "enter zkgh", "transfer-card 4321"]
        );
    }

    #[tokio::test]
    async fn unstarred_transfer_tail_is_ignored() {
        let t = table(&[&["序号", "转卡信息工号", "卡号尾号"], &["1", "1001", "4321"]]);
        let s = settings(vec![("转卡信息工号", "zkgh")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(page.calls().last().map(String::as_str), Some("transfer-card <first>"));
    }

    #[tokio::test]
    async fn subject_at_bracket_end_does_not_pair_past_the_bracket() {
        let t = table(&[
            &["序号", "子序列开始", "科目", "子序列结束", "金额", "备注"],
            &["1", "明细", "#住宿费", "", "300", "y"],
        ]);
        let s = settings(vec![("住宿费", "zsf"), ("备注", "bz")]);
        let page = FakePage::default();

        let summary = run_with(&page, &s, &t).await.unwrap();
        assert_eq!(summary.failed_steps, 0);
        assert_eq!(page.calls(), vec!["fill bz=y"]);
    }

    #[tokio::test]
    async fn subject_without_amount_fills_nothing() {
        let s = settings(vec![("住宿费", "zsf"), ("备注", "bz")]);

        let empty_amount = table(&[&["序号", "科目", "金额", "备注"], &["1", "#住宿费", "", "y"]]);
        let page = FakePage::default();
        run_with(&page, &s, &empty_amount).await.unwrap();
        assert_eq!(page.calls(), vec!["fill bz=y"]);

        let last_column = table(&[&["序号", "备注", "科目"], &["1", "y", "#住宿费"]]);
        let page = FakePage::default();
        run_with(&page, &s, &last_column).await.unwrap();
        assert_eq!(page.calls(), vec!["fill bz=y"]);
    }

    #[tokio::test]
    async fn itinerary_province_is_selected_in_the_first_detail_row() {
        let t = table(&[
            &["序号", "子序列开始", "姓名", "省份", "子序列结束"],
            &["1", "1", "张三", "北京", "1"],
        ]);
        let s = settings(vec![("姓名-0", "xm-0"), ("省份-0", "sf-0")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(page.calls(), vec!["fill xm-0=张三", "select sf-0=北京"]);
    }

    #[tokio::test]
    async fn missing_dropdown_option_counts_as_a_failed_step() {
        let t = table(&[&["序号", "省份", "事由"], &["1", "火星", "x"]]);
        let s = settings(vec![("省份", "sf"), ("事由", "sy")]);
        let page = FakePage::missing(&["sf"]);

        let summary = run_with(&page, &s, &t).await.unwrap();
        assert_eq!(summary.failed_steps, 1);
        assert_eq!(page.calls(), vec!["select sf=火星", "fill sy=x"]);
    }

    #[tokio::test]
    async fn generic_block_dispatches_bracket_cells() {
        let t = table(&[
            &["序号", "子序列开始", "事由", "子序列结束", "备注"],
            &["1", "明细", "x", "", "y"],
            &["1", "", "skipped", "", "z"],
        ]);
        let s = settings(vec![("事由", "sy"), ("备注", "bz")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(page.calls(), vec!["fill sy=x", "fill bz=y", "fill bz=z"]);
    }

    #[tokio::test]
    async fn missing_elements_do_not_stop_the_walk() {
        let t = table(&[&["序号", "事由", "备注"], &["1", "x", "y"]]);
        let s = settings(vec![("事由", "sy"), ("备注", "bz")]);
        let page = FakePage::missing(&["sy"]);

        let summary = run_with(&page, &s, &t).await.unwrap();
        assert_eq!(summary.failed_steps, 1);
        assert_eq!(page.calls(), vec!["fill sy=x", "fill bz=y"]);
    }

    #[tokio::test]
    async fn lost_session_aborts_the_run() {
        let t = table(&[&["序号", "事由"], &["1", "x"], &["2", "y"]]);
        let s = settings(vec![("事由", "sy")]);
        let page = FakePage {
            fatal_on: Some("sy".into()),
            ..FakePage::default()
        };

        let err = run_with(&page, &s, &t).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(page.calls(), vec!["fill sy=x"]);
    }

    #[tokio::test]
    async fn date_picker_failure_falls_back_to_typing() {
        let t = table(&[&["序号", "出发日期"], &["1", "2024/3/1"]]);
        let s = settings(vec![("出发日期", "startdate")]);
        let page = FakePage::missing(&["date:startdate"]);

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(
            page.calls(),
            vec!["date startdate=2024-03-01", "fill startdate=2024-03-01"]
        );
    }

    #[tokio::test]
    async fn sentinel_cells_reach_their_primitives() {
        let t = table(&[
            &["序号", "预约按钮", "校区", "菜单", "添加内容按钮", "卡号"],
            &["1", "$预约", "$$东校区", "@WF_YB6", "$点击", "*9876"],
        ]);
        let s = settings(vec![("东校区", "01"), ("菜单", "menu"), ("卡号", "card")]);
        let page = FakePage::default();

        run_with(&page, &s, &t).await.unwrap();
        assert_eq!(
            page.calls(),
            vec!["reservation", "radio 01", "nav WF_YB6", "add-row", "card 9876"]
        );
    }
}
