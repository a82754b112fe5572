//! 内置的兜底评分数据集
//!
//! 远程数据拉取失败或解析失败时使用

use crate::models::question::RubricDataset;

const FALLBACK_RUBRIC_JSON: &str = include_str!("../../data/fallback_rubric.json");

/// 数据集来源名称
pub const FALLBACK_SOURCE_LABEL: &str = "Built-in sample (VR & game design)";

/// 获取内置兜底数据集
pub fn fallback_dataset() -> RubricDataset {
    RubricDataset::from_json_str(FALLBACK_RUBRIC_JSON).expect("内置数据集格式正确")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BloomCategory;

    #[test]
    fn test_fallback_dataset_parses() {
        let dataset = fallback_dataset();
        assert_eq!(dataset.len(), 14);
        assert_eq!(dataset.entries()[0].0, "question1");
        assert_eq!(dataset.entries()[13].0, "question14");
    }

    #[test]
    fn test_fallback_records_normalize_analysing() {
        let records = fallback_dataset().into_records().unwrap();
        let q11 = &records[10];
        assert_eq!(q11.key, "question11");
        assert_eq!(q11.category, BloomCategory::Analyzing);
    }
}
