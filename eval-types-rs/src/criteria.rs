// eval-types-rs/src/criteria.rs
// Evaluation criteria and AI-technology categories.

use serde::{Deserialize, Serialize};

/// Fixed criterion-name -> canonical-key lookup (Korean name to the key
/// the LLM response schema uses). Names outside this table fall back to a
/// lower-cased slug of the name.
const CRITERIA_KEY_MAP: &[(&str, &str)] = &[
    ("혁신성", "innovation"),
    ("실현가능성", "feasibility"),
    ("효과성", "impact"),
    ("명확성", "clarity"),
];

/// One weighted evaluation dimension with its scoring guide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub description: String,
    /// Relative weight in the weighted average; must be >= 0.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Free-text scoring guide embedded into the evaluation prompt.
    #[serde(default)]
    pub evaluation_guide: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_weight() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Criterion {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            weight: 1.0,
            evaluation_guide: String::new(),
            display_order: 0,
            is_active: true,
        }
    }

    /// Canonical key under which this criterion appears in
    /// `evaluation_scores`: the fixed lookup table first, then a
    /// lower-cased slug of the name (runs of non-alphanumeric characters
    /// collapse to a single underscore).
    pub fn key(&self) -> String {
        for (name, key) in CRITERIA_KEY_MAP {
            if *name == self.name {
                return (*key).to_string();
            }
        }
        slugify(&self.name)
    }
}

fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_sep = false;
        } else if !last_was_sep && !out.is_empty() {
            out.push('_');
            last_was_sep = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// One AI-technology classification option presented to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

impl Category {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            is_active: true,
            display_order: 0,
        }
    }
}

/// The hardcoded six-item category menu used when the caller supplies no
/// active categories of its own.
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("예측", "미래 값 예측, 수요 예측, 트렌드 분석"),
        Category::new("분류", "이미지/텍스트 분류, 불량 검출, 카테고리 분류"),
        Category::new("챗봇", "대화형 인터페이스, 자동 응답, Q&A"),
        Category::new("에이전트", "자율 의사결정, 복잡한 작업 자동화, 워크플로우 자동화"),
        Category::new("최적화", "자원 최적화, 스케줄링, 경로 최적화"),
        Category::new("강화학습", "학습 기반 의사결정, 시뮬레이션 최적화"),
    ]
}

/// The hardcoded four-criterion rubric used when the caller supplies no
/// active criteria of its own.
pub fn default_criteria() -> Vec<Criterion> {
    vec![
        Criterion::new("혁신성", "AI 기술의 창의성과 새로움"),
        Criterion::new("실현가능성", "기술적 구현 난이도와 팀 역량"),
        Criterion::new("효과성", "조직에 미치는 경영 효과"),
        Criterion::new("명확성", "문제 정의와 해결 방안의 구체성"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_map_to_fixed_keys() {
        assert_eq!(Criterion::new("혁신성", "").key(), "innovation");
        assert_eq!(Criterion::new("실현가능성", "").key(), "feasibility");
        assert_eq!(Criterion::new("효과성", "").key(), "impact");
        assert_eq!(Criterion::new("명확성", "").key(), "clarity");
    }

    #[test]
    fn unknown_names_fall_back_to_slug() {
        assert_eq!(Criterion::new("Data Readiness", "").key(), "data_readiness");
        assert_eq!(Criterion::new("  ROI / Cost  ", "").key(), "roi_cost");
    }

    #[test]
    fn default_category_menu_has_six_entries() {
        let cats = default_categories();
        assert_eq!(cats.len(), 6);
        assert_eq!(cats[0].name, "예측");
        assert!(cats.iter().all(|c| c.is_active));
    }

    #[test]
    fn default_rubric_covers_the_four_mapped_keys() {
        let keys: Vec<String> = default_criteria().iter().map(|c| c.key()).collect();
        assert_eq!(keys, ["innovation", "feasibility", "impact", "clarity"]);
    }

    #[test]
    fn criterion_weight_defaults_to_one() {
        let c: Criterion = serde_json::from_str(r#"{"name":"혁신성","description":"d"}"#).unwrap();
        assert_eq!(c.weight, 1.0);
        assert!(c.is_active);
    }
}
