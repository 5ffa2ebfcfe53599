// src/mapping.rs
use std::collections::HashMap;
use tracing::warn;

/// Column title -> element identifier on the reimbursement page.
#[derive(Debug, Default, Clone)]
pub struct TitleMap {
    ids: HashMap<String, String>,
}

impl TitleMap {
    /// Build from the mapping sheet: header row first, then `title | element id` rows.
    pub fn from_sheet_values(values: &[Vec<String>]) -> Self {
        let mut ids = HashMap::new();

        for (i, row) in values.iter().enumerate().skip(1) {
            let title = row.first().map(|s| s.trim()).unwrap_or_default();
            let id = row.get(1).map(|s| s.trim()).unwrap_or_default();
            if title.is_empty() || id.is_empty() {
                continue;
            }
            if let Some(prev) = ids.insert(title.to_string(), id.to_string()) {
                warn!(title, previous = %prev, row = i + 1, "title mapped twice, keeping the later id");
            }
        }

        Self { ids }
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.ids.get(title.trim()).map(String::as_str)
    }

    /// Lookup for one slot of a repeated block: `姓名` + 2 -> `姓名-2`.
    pub fn get_indexed(&self, title: &str, index: usize) -> Option<&str> {
        self.get(&format!("{title}-{index}"))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TitleMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            ids: iter
                .into_iter()
                .map(|(t, id)| (t.into(), id.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn skips_header_and_blank_rows() {
        let map = TitleMap::from_sheet_values(&rows(&[
            &["标题", "元素ID"],
            &["报销项目号", "formWF_YB6_3492_xmbh"],
            &["", "orphan"],
            &["备注", ""],
            &["姓名-0", "formWF_YB6_3492_xm-0"],
        ]));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("报销项目号"), Some("formWF_YB6_3492_xmbh"));
        assert_eq!(map.get(" 报销项目号 "), Some("formWF_YB6_3492_xmbh"));
        assert_eq!(map.get_indexed("姓名", 0), Some("formWF_YB6_3492_xm-0"));
        assert_eq!(map.get("备注"), None);
    }

    #[test]
    fn later_duplicate_wins() {
        let map = TitleMap::from_sheet_values(&rows(&[
            &["标题", "元素ID"],
            &["金额", "old"],
            &["金额", "new"],
        ]));
        assert_eq!(map.get("金额"), Some("new"));
    }
}
