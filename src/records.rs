// src/records.rs
use crate::config::SubsequenceMarkers;
use crate::sheets::dedupe_headers;
use crate::titles;
use anyhow::{anyhow, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One data row of the reimbursement sheet.
#[derive(Debug, Clone)]
pub struct Record {
    /// 1-based row in the sheet (header is row 1, first record is row 2).
    pub sheet_row: usize,
    cells: Vec<String>,
}

impl Record {
    /// Trimmed cell text, empty when the row is shorter than the header.
    pub fn cell(&self, col: usize) -> &str {
        self.cells.get(col).map(|s| s.trim()).unwrap_or_default()
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// Column positions the traversal treats specially.
#[derive(Debug, Clone, Default)]
pub struct ColumnLayout {
    pub sequence: usize,
    pub progress: Option<usize>,
    /// First `子序列开始*` column; its value selects the block kind.
    pub block_start: Option<usize>,
    /// First `子序列结束*` column.
    pub block_end: Option<usize>,
    pub start_columns: Vec<usize>,
    pub end_columns: Vec<usize>,
    pub login_work_id: Option<usize>,
    pub login_password: Option<usize>,
    pub login_button: Option<usize>,
}

impl ColumnLayout {
    fn detect(columns: &[String], sequence: usize) -> Self {
        let position = |name: &str| columns.iter().position(|c| c == name);
        let with_prefix = |prefix: &str| -> Vec<usize> {
            columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.starts_with(prefix))
                .map(|(i, _)| i)
                .collect()
        };

        let start_columns = with_prefix(titles::SUBSEQUENCE_START);
        let end_columns = with_prefix(titles::SUBSEQUENCE_END);

        Self {
            sequence,
            progress: position(titles::PROGRESS),
            block_start: start_columns.first().copied(),
            block_end: end_columns.first().copied(),
            start_columns,
            end_columns,
            login_work_id: position(titles::LOGIN_WORK_ID),
            login_password: position(titles::LOGIN_PASSWORD),
            login_button: position(titles::LOGIN_BUTTON),
        }
    }

    /// Columns that are bookkeeping for the walk and never reach the page as-is.
    pub fn is_control(&self, col: usize) -> bool {
        col == self.sequence
            || Some(col) == self.progress
            || Some(col) == self.login_work_id
            || Some(col) == self.login_password
            || Some(col) == self.login_button
            || self.start_columns.contains(&col)
            || self.end_columns.contains(&col)
    }

    /// Columns strictly inside the sub-sequence bracket.
    pub fn bracket(&self, width: usize) -> std::ops::Range<usize> {
        match self.block_start {
            Some(start) => {
                let end = self
                    .block_end
                    .filter(|&e| e > start)
                    .unwrap_or(width)
                    .min(width);
                (start + 1)..end
            }
            None => 0..0,
        }
    }

    /// Column the walk resumes at after handling the bracket that opens at `start`.
    pub fn after_bracket(&self, start: usize, width: usize) -> usize {
        match self.block_end {
            Some(end) if end > start => end + 1,
            _ => width,
        }
    }

    /// Whether `record` closes a block opened with `marker`.
    pub fn closes_block(&self, record: &Record, marker: &str) -> bool {
        self.end_columns.iter().any(|&c| record.cell(c) == marker)
    }
}

/// What the `子序列开始` cell of a row asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Traveler,
    TravelCard,
    Generic(String),
}

impl BlockKind {
    pub fn classify(value: &str, markers: &SubsequenceMarkers) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else if value == markers.traveler {
            Some(BlockKind::Traveler)
        } else if value == markers.travel_card {
            Some(BlockKind::TravelCard)
        } else {
            Some(BlockKind::Generic(value.to_string()))
        }
    }
}

/// Rows sharing one sequence number: a single reimbursement submission.
#[derive(Debug, Clone)]
pub struct RecordGroup<'a> {
    pub sequence: String,
    pub records: Vec<&'a Record>,
}

impl<'a> RecordGroup<'a> {
    pub fn first(&self) -> Option<&'a Record> {
        self.records.first().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// In-memory reimbursement sheet for the current run.
#[derive(Debug, Clone)]
pub struct RecordTable {
    columns: Vec<String>,
    records: Vec<Record>,
    layout: ColumnLayout,
}

impl RecordTable {
    /// Build from a sheet matrix whose first row holds the column titles.
    ///
    /// Fully blank rows are dropped. The sequence column must exist.
    pub fn from_sheet_values(values: &[Vec<String>]) -> Result<Self> {
        let header = values
            .first()
            .ok_or_else(|| anyhow!("reimbursement sheet is empty"))?;
        let columns = dedupe_headers(header);

        let sequence = columns
            .iter()
            .position(|c| c == titles::SEQUENCE)
            .ok_or_else(|| anyhow!("missing expected header '{}'", titles::SEQUENCE))?;

        let records: Vec<Record> = values
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, row)| Record {
                sheet_row: i + 1,
                cells: row.clone(),
            })
            .filter(|r| !r.is_blank())
            .collect();

        let layout = ColumnLayout::detect(&columns, sequence);
        debug!(?layout, "column layout");
        info!(columns = columns.len(), records = records.len(), "reimbursement records loaded");

        Ok(Self {
            columns,
            records,
            layout,
        })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn title(&self, col: usize) -> &str {
        self.columns.get(col).map(String::as_str).unwrap_or_default()
    }

    pub fn column(&self, title: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == title)
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Non-empty value of `title` in `record`.
    pub fn value<'r>(&self, record: &'r Record, title: &str) -> Option<&'r str> {
        self.column(title)
            .map(|c| record.cell(c))
            .filter(|v| !v.is_empty())
    }

    /// First non-empty value among columns whose title starts with `prefix`.
    pub fn value_with_prefix<'r>(&self, record: &'r Record, prefix: &str) -> Option<&'r str> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with(prefix))
            .map(|(i, _)| record.cell(i))
            .find(|v| !v.is_empty())
    }

    /// Groups in ascending sequence order; rows keep their sheet order inside a group.
    /// Rows without a sequence number belong to no group.
    pub fn groups(&self) -> Vec<RecordGroup<'_>> {
        let mut by_key: BTreeMap<SequenceKey, Vec<&Record>> = BTreeMap::new();
        let mut orphans = 0usize;

        for record in &self.records {
            let seq = record.cell(self.layout.sequence);
            if seq.is_empty() {
                orphans += 1;
                continue;
            }
            by_key.entry(SequenceKey(seq.to_string())).or_default().push(record);
        }

        if orphans > 0 {
            debug!(orphans, "rows without sequence number skipped");
        }

        by_key
            .into_iter()
            .map(|(key, records)| RecordGroup {
                sequence: key.0,
                records,
            })
            .collect()
    }

    /// Block kinds present in a group, in row order. Used for the per-group summary.
    pub fn block_kinds(&self, group: &RecordGroup<'_>, markers: &SubsequenceMarkers) -> Vec<BlockKind> {
        let Some(start) = self.layout.block_start else {
            return Vec::new();
        };
        group
            .records
            .iter()
            .filter_map(|r| BlockKind::classify(r.cell(start), markers))
            .collect()
    }
}

/// Numeric sequence numbers sort numerically and come before text ones.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SequenceKey(String);

impl Ord for SequenceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<f64>(), other.0.parse::<f64>()) {
            (Ok(a), Ok(b)) => a.total_cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for SequenceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(data: &[&[&str]]) -> RecordTable {
        let values: Vec<Vec<String>> = data
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        RecordTable::from_sheet_values(&values).unwrap()
    }

    #[test]
    fn requires_sequence_column() {
        let values = vec![vec!["姓名".to_string()], vec!["张三".to_string()]];
        let err = RecordTable::from_sheet_values(&values).unwrap_err();
        assert!(err.to_string().contains("序号"));
    }

    #[test]
    fn groups_sort_numerically_and_keep_row_order() {
        let t = table(&[
            &["序号", "姓名"],
            &["10", "a"],
            &["2", "b"],
            &["", "orphan"],
            &["2", "c"],
            &["x", "d"],
            &["", ""],
        ]);
        let groups = t.groups();
        let keys: Vec<&str> = groups.iter().map(|g| g.sequence.as_str()).collect();
        assert_eq!(keys, vec!["2", "10", "x"]);

        let names: Vec<&str> = groups[0].records.iter().map(|r| r.cell(1)).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(groups[0].records[0].sheet_row, 3);
        // the fully blank row is dropped, the orphan kept but ungrouped
        assert_eq!(t.records().len(), 5);
    }

    #[test]
    fn layout_finds_brackets_and_control_columns() {
        let t = table(&[
            &["序号", "登录界面工号", "事由", "子序列开始", "姓名", "工号", "子序列结束", "子序列开始", "处理进度"],
            &["1", "u1", "出差", "1", "张三", "1001", "1", "", ""],
        ]);
        let layout = t.layout();
        assert_eq!(layout.block_start, Some(3));
        assert_eq!(layout.block_end, Some(6));
        assert_eq!(layout.start_columns, vec![3, 7]);
        assert_eq!(layout.bracket(t.width()), 4..6);
        assert_eq!(layout.after_bracket(3, t.width()), 7);
        assert!(layout.is_control(0));
        assert!(layout.is_control(1));
        assert!(layout.is_control(7));
        assert!(layout.is_control(8));
        assert!(!layout.is_control(2));
        assert!(layout.closes_block(&t.records()[0], "1"));
        assert!(!layout.closes_block(&t.records()[0], "2"));
    }

    #[test]
    fn bracket_without_end_runs_to_last_column() {
        let t = table(&[&["序号", "子序列开始", "姓名", "工号"], &["1", "1", "a", "b"]]);
        assert_eq!(t.layout().bracket(t.width()), 2..4);
        assert_eq!(t.layout().after_bracket(1, t.width()), 4);
    }

    #[test]
    fn block_kinds_follow_markers() {
        let markers = SubsequenceMarkers::default();
        assert_eq!(BlockKind::classify("1", &markers), Some(BlockKind::Traveler));
        assert_eq!(BlockKind::classify(" 2 ", &markers), Some(BlockKind::TravelCard));
        assert_eq!(
            BlockKind::classify("明细", &markers),
            Some(BlockKind::Generic("明细".into()))
        );
        assert_eq!(BlockKind::classify("", &markers), None);

        let t = table(&[
            &["序号", "子序列开始", "姓名"],
            &["1", "1", "a"],
            &["1", "", "b"],
            &["1", "2", ""],
        ]);
        let groups = t.groups();
        assert_eq!(
            t.block_kinds(&groups[0], &markers),
            vec![BlockKind::Traveler, BlockKind::TravelCard]
        );
    }

    #[test]
    fn duplicate_titles_are_addressable() {
        let t = table(&[&["序号", "等待", "等待"], &["1", "1", "2"]]);
        assert_eq!(t.column("等待.1"), Some(2));
        let r = &t.records()[0];
        assert_eq!(t.value(r, "等待.1"), Some("2"));
        assert_eq!(t.value_with_prefix(r, "等待"), Some("1"));
    }
}
