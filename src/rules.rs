// src/rules.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Which fields are dropdowns and how spreadsheet values map onto option values.
///
/// Loaded from an optional JSON file:
///
/// ```json
/// {
///   "dropdowns": { "人员类型": { "教师": "01", "学生": "02" } },
///   "title_aliases": { "省份": "省份地区" },
///   "id_patterns": [["formWF_YB6_3492_yc-chr_sf", "省份地区"]]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldRules {
    /// Field name -> (sheet value -> option value). An empty table keeps values as-is.
    pub dropdowns: HashMap<String, HashMap<String, String>>,
    /// Sheet title -> dropdown field name.
    pub title_aliases: HashMap<String, String>,
    /// Element-id fragment -> dropdown field name, checked in order.
    pub id_patterns: Vec<(String, String)>,
    /// Element-id fragments that mark a date input.
    pub date_id_markers: Vec<String>,
}

impl Default for FieldRules {
    fn default() -> Self {
        let dropdowns = ["省份地区", "人员类型", "安排状态", "交通费"]
            .into_iter()
            .map(|f| (f.to_string(), HashMap::new()))
            .collect();

        let title_aliases = HashMap::from([("省份".to_string(), "省份地区".to_string())]);

        let id_patterns = [
            ("formWF_YB6_3492_yc-chr_sf", "省份地区"),
            ("formWF_YB6_3492_yc-chr_hsf", "安排状态"),
            ("formWF_YB6_3492_yc-chr_jtf", "交通费"),
            ("formWF_YB6_3492_yc-chr_zc", "人员类型"),
            ("formWF_YB6_3492_yc-chr_azzt", "安排状态"),
        ]
        .into_iter()
        .map(|(p, f)| (p.to_string(), f.to_string()))
        .collect();

        Self {
            dropdowns,
            title_aliases,
            id_patterns,
            date_id_markers: vec!["date".into(), "start".into(), "end".into()],
        }
    }
}

impl FieldRules {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read field rules {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid field rules {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Dropdown field a cell belongs to, judged by its title first and its element id second.
    pub fn dropdown_field<'a>(&'a self, title: &'a str, element_id: &str) -> Option<&'a str> {
        if self.dropdowns.contains_key(title) {
            return Some(title);
        }
        if let Some(alias) = self.title_aliases.get(title) {
            if self.dropdowns.contains_key(alias) {
                return Some(alias.as_str());
            }
        }
        self.id_patterns
            .iter()
            .find(|(pattern, _)| element_id.contains(pattern.as_str()))
            .map(|(_, field)| field.as_str())
    }

    /// Option value to select for `value` in `field`.
    pub fn option_value<'a>(&'a self, field: &str, value: &'a str) -> &'a str {
        self.dropdowns
            .get(field)
            .and_then(|table| table.get(value))
            .map(String::as_str)
            .unwrap_or(value)
    }

    pub fn is_date_id(&self, element_id: &str) -> bool {
        let id = element_id.to_lowercase();
        self.date_id_markers.iter().any(|m| id.contains(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_alias_resolves_province() {
        let rules = FieldRules::default();
        assert_eq!(rules.dropdown_field("省份", "whatever"), Some("省份地区"));
        assert_eq!(rules.dropdown_field("人员类型", ""), Some("人员类型"));
        assert_eq!(rules.dropdown_field("事由", "formWF_x_reason"), None);
    }

    #[test]
    fn id_pattern_does_not_confuse_sf_and_hsf() {
        let rules = FieldRules::default();
        assert_eq!(
            rules.dropdown_field("住宿", "formWF_YB6_3492_yc-chr_hsf-0"),
            Some("安排状态")
        );
        assert_eq!(
            rules.dropdown_field("去往", "formWF_YB6_3492_yc-chr_sf-0"),
            Some("省份地区")
        );
    }

    #[test]
    fn option_values_are_mapped_when_configured() {
        let rules = FieldRules::from_json(
            r#"{ "dropdowns": { "人员类型": { "教师": "01" } } }"#,
        )
        .unwrap();
        assert_eq!(rules.option_value("人员类型", "教师"), "01");
        assert_eq!(rules.option_value("人员类型", "学生"), "学生");
        // fields not named in the file fall back to serde defaults
        assert!(rules.title_aliases.contains_key("省份"));
    }

    #[test]
    fn date_ids_are_detected_case_insensitively() {
        let rules = FieldRules::default();
        assert!(rules.is_date_id("formWF_YB6_3492_yc-StartDate-0"));
        assert!(rules.is_date_id("trip_end"));
        assert!(!rules.is_date_id("formWF_amount"));
    }
}
