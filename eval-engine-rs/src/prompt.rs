// eval-engine-rs/src/prompt.rs
// Prompt assembly for the three debate steps. Pure string building, no
// side effects; everything the model sees is produced here.

use std::borrow::Cow;

use eval_types_rs::{default_criteria, Category, Criterion, EvaluationResult, Proposal};

/// Builds the three prompt kinds for one evaluation run. Borrows the
/// proposal, criteria and the valid category set for its lifetime; every
/// method is a pure function of those inputs. An empty criteria list is
/// replaced by the default four-criterion rubric so the prompt never asks
/// for per-criterion scores while showing none.
pub struct PromptBuilder<'a> {
    proposal: &'a Proposal,
    criteria: Cow<'a, [Criterion]>,
    categories: &'a [Category],
}

impl<'a> PromptBuilder<'a> {
    pub fn new(
        proposal: &'a Proposal,
        criteria: &'a [Criterion],
        categories: &'a [Category],
    ) -> Self {
        let criteria = if criteria.is_empty() {
            Cow::Owned(default_criteria())
        } else {
            Cow::Borrowed(criteria)
        };
        Self {
            proposal,
            criteria,
            categories,
        }
    }

    fn category_menu(&self) -> String {
        self.categories
            .iter()
            .map(|c| format!("- **{}**: {}", c.name, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn category_names(&self) -> String {
        self.categories
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn criteria_guide(&self) -> String {
        self.criteria
            .iter()
            .map(|c| {
                let key = c.key();
                let mut block = format!("**{} ({})**: {}", c.name, capitalize(&key), c.description);
                if !c.evaluation_guide.is_empty() {
                    block.push_str("\n\n");
                    block.push_str(&c.evaluation_guide);
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Per-criterion entries of the JSON example embedded in every prompt,
    /// so the model sees the exact keys the engine expects back.
    fn json_format_example(&self) -> String {
        self.criteria
            .iter()
            .map(|c| {
                format!(
                    "    \"{}\": {{\n      \"score\": 1-5 사이의 정수,\n      \"rationale\": \"{} 평가 근거 (2-3문장, 지원서 기반)\"\n    }}",
                    c.key(),
                    c.name
                )
            })
            .collect::<Vec<_>>()
            .join(",\n")
    }

    fn proposal_sections(&self) -> String {
        let p = self.proposal;
        let pre_survey = if p.pre_survey.is_empty() {
            "N/A".to_string()
        } else {
            serde_json::to_string_pretty(&p.pre_survey).unwrap_or_else(|_| "N/A".to_string())
        };
        let tech_capabilities = if p.tech_capabilities.is_empty() {
            "N/A".to_string()
        } else {
            serde_json::to_string_pretty(&p.tech_capabilities).unwrap_or_else(|_| "N/A".to_string())
        };

        format!(
            r#"## 과제 기본 정보
- 과제명: {subject}
- 조직: {department_info}
- 참여 인원: {participants}명
- 대표자: {representative}

## 신청 내용
### 현재 업무
{current_work}

### Pain Point (해결하고자 하는 문제)
{pain_point}

### 개선 아이디어
{improvement_idea}

### 기대 효과
{expected_effect}

### 바라는 점
{hope}

## 사전 설문
{pre_survey}

## 참여자 기술 역량
{tech_capabilities}"#,
            subject = or_na(&p.subject),
            department_info = p.department_info(),
            participants = p
                .participant_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            representative = or_na(&p.representative_name),
            current_work = or_na(&p.current_work),
            pain_point = or_na(&p.pain_point),
            improvement_idea = or_na(&p.improvement_idea),
            expected_effect = or_na(&p.expected_effect),
            hope = or_na(&p.hope),
            pre_survey = pre_survey,
            tech_capabilities = tech_capabilities,
        )
    }

    /// System message for a single-model run.
    pub fn system_message(&self) -> String {
        let department_info = self.proposal.department_info();
        format!(
            r#"당신은 글로벌 반도체 대기업의 AI 전문가입니다.
조직: {department_info}

역할: 지원서 내용을 객관적으로 요약하고 분석합니다.

중요 원칙:
1. 지원서에 작성된 내용만을 기반으로 요약 (할루시네이션 금지)
2. {department_info} 조직의 업무 특성을 고려한 해석
3. 사실 기반의 객관적 분석
4. 과장하거나 추측하지 말 것"#
        )
    }

    /// System message opening backend A's debate conversation. Warns the
    /// model that a peer review and a final-adjustment turn will follow,
    /// so the later turns arrive in context.
    pub fn initial_system_message(&self) -> String {
        format!(
            r#"{}

**중요**: 곧 동료 평가자(LLM B)가 당신의 평가를 검토할 것입니다.
그 후 LLM B의 의견을 듣고 최종 평가를 조정할 기회가 주어집니다."#,
            self.system_message()
        )
    }

    /// Step 1: initial evaluation prompt.
    pub fn initial_prompt(&self) -> String {
        let department_info = self.proposal.department_info();
        format!(
            r#"# AI 과제 지원서 평가

{proposal}

---

## 평가 요청사항

지원서 내용을 바탕으로 다음을 요약하고 평가하세요:

### 1. AI 기술 분류
지원서에서 언급된 AI 기술을 다음 중 **하나만** 선택하세요:
{category_menu}

### 2. 조직 관점의 경영효과
{department_info} 조직 관점에서 이 과제의 경영효과를 요약하세요 (2-3문장):
- 지원서에 작성된 기대효과 기반으로만 작성
- 추측이나 과장 금지

### 3. AI 관점의 구현 가능성
지원서 내용(참여인원, 기술역량, 데이터 등)을 바탕으로 구현 가능성 평가 (2-3문장):
- 지원서에 작성된 내용만 참고
- 기술적 난이도, 데이터 확보, 팀 역량 등을 객관적으로 평가

### 4. 전체 지원서 5줄 요약
이 지원서의 핵심 내용을 5줄로 요약:
1. 과제 목적 (1줄)
2. 현재 문제 (1줄)
3. 해결 방안 (1줄)
4. 기대 효과 (1줄)
5. 구현 계획 (1줄)

### 5. 평가 기준별 점수 및 근거 (5점 척도)
다음 기준으로 지원서를 평가하고, 각 기준마다 1-5점과 2-3문장의 근거를 제시하세요.
1-5점 전체 범위를 적극 활용하고, 점수가 3-4점에만 몰리지 않도록 근거에 따라 과감하게 차등을 두세요:

{criteria_guide}

---

## 응답 형식 (JSON)
**CRITICAL**: 반드시 아래 JSON 형식으로만 응답하세요. 다른 텍스트는 포함하지 마세요.

```json
{{
  "ai_category": "{first_category}",
  "business_impact": "조직 관점의 경영효과를 2-3문장으로 요약",
  "technical_feasibility": "AI 관점의 구현 가능성을 2-3문장으로 평가",
  "five_line_summary": [
    "1. 과제 목적",
    "2. 현재 문제",
    "3. 해결 방안",
    "4. 기대 효과",
    "5. 구현 계획"
  ],
  "evaluation_scores": {{
{json_example}
  }}
}}
```

**중요 규칙:**
1. **유효한 JSON 형식 필수** - 모든 문자열은 큰따옴표(")로 감싸기
2. **ai_category는 정확히 하나**: {category_names} 중 선택
3. **evaluation_scores의 각 score는 1-5 사이의 정수**
4. **모든 rationale은 지원서에 작성된 내용만 사용** (할루시네이션 금지)
5. **JSON 내부에서 줄바꿈이 필요하면 \n 사용**
6. **마지막 항목 뒤에는 쉼표(,) 없음** - JSON 문법 준수 필수
7. **중괄호와 대괄호를 정확히 닫을 것**
8. {department_info} 조직 특성 반영

**응답은 JSON만 포함하세요. 설명이나 추가 텍스트 없이 JSON 객체만 반환하세요.**"#,
            proposal = self.proposal_sections(),
            category_menu = self.category_menu(),
            department_info = department_info,
            criteria_guide = self.criteria_guide(),
            first_category = self
                .categories
                .first()
                .map(|c| c.name.as_str())
                .unwrap_or("예측"),
            json_example = self.json_format_example(),
            category_names = self.category_names(),
        )
    }

    /// Step 2: stateless review prompt for backend B, embedding A's
    /// initial result.
    pub fn review_prompt(&self, initial_result: &EvaluationResult) -> String {
        let department_info = self.proposal.department_info();
        let initial_json = pretty_json(initial_result);
        format!(
            r#"당신은 글로벌 반도체 대기업의 AI 전문가이자 평가 검토자입니다.
조직: {department_info}

역할: 동료 AI 전문가(LLM A)의 평가를 검토하고, 더 나은 평가를 제시합니다.

중요 원칙:
1. LLM A의 평가를 존중하되, 개선이 필요한 부분은 수정
2. 지원서에 작성된 내용만을 기반으로 평가 (할루시네이션 금지)
3. {department_info} 조직의 업무 특성을 고려
4. 점수는 과장하거나 낮추지 말고 객관적으로 평가
5. LLM A와 의견이 다르면 근거를 명확히 제시

---

## 지원서 정보

과제명: {subject}
조직: {department_info}
참여 인원: {participants}명

### Pain Point
{pain_point}

### 개선 아이디어
{improvement_idea}

### 기대 효과
{expected_effect}

---

## LLM A의 평가 결과

```json
{initial_json}
```

---

## 요청사항

위 지원서와 LLM A의 평가를 검토하여, **더 나은 평가**를 제시하세요.

### 검토 지침

1. **AI 기술 분류**: LLM A의 선택이 적절한가? 지원서 내용과 일치하는가?

2. **평가 점수**: 각 기준별 점수가 지원서 내용을 정확히 반영하는가?
   - 너무 관대하거나 엄격하지 않은가? 점수 인플레이션을 경계하세요
   - 근거가 지원서의 구체적 내용을 인용하는가?

3. **개선점**:
   - LLM A가 놓친 중요한 내용은?
   - 과장되거나 과소평가된 부분은?
   - 더 구체적인 근거를 제시할 수 있는가?

### 응답 형식 (JSON)

**CRITICAL**: 반드시 아래 JSON 형식으로만 응답하세요.

```json
{{
  "ai_category": "{first_category}",
  "business_impact": "조직 관점의 경영효과를 2-3문장으로 요약 (LLM A 개선)",
  "technical_feasibility": "AI 관점의 구현 가능성을 2-3문장으로 평가 (LLM A 개선)",
  "five_line_summary": [
    "1. 과제 목적",
    "2. 현재 문제",
    "3. 해결 방안",
    "4. 기대 효과",
    "5. 구현 계획"
  ],
  "evaluation_scores": {{
{json_example}
  }},
  "debate_summary": "LLM A의 평가와 비교하여 어떤 점을 개선했는지 2-3문장으로 설명"
}}
```

**중요 규칙:**
1. **유효한 JSON 형식 필수**
2. **ai_category는 정확히 하나**: {category_names} 중 선택
3. **evaluation_scores의 각 score는 1-5 사이의 정수**
4. **rationale은 지원서에 작성된 내용만 사용** (할루시네이션 금지)
5. **LLM A와 점수가 다르면 debate_summary에 이유 설명**
6. **JSON 내부에서 줄바꿈이 필요하면 \n 사용**
7. **응답은 JSON만 포함하세요**"#,
            department_info = department_info,
            subject = or_na(&self.proposal.subject),
            participants = self
                .proposal
                .participant_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            pain_point = or_na(&self.proposal.pain_point),
            improvement_idea = or_na(&self.proposal.improvement_idea),
            expected_effect = or_na(&self.proposal.expected_effect),
            initial_json = initial_json,
            first_category = self
                .categories
                .first()
                .map(|c| c.name.as_str())
                .unwrap_or("예측"),
            json_example = self.json_format_example(),
            category_names = self.category_names(),
        )
    }

    /// Step 3: follow-up human turn appended to backend A's transcript,
    /// embedding B's review. A already holds the proposal and its own
    /// initial evaluation in conversation memory.
    pub fn final_prompt(&self, review_result: &EvaluationResult) -> String {
        let review_json = pretty_json(review_result);
        format!(
            r#"이제 동료 평가자(LLM B)가 당신의 평가를 검토했습니다.

## LLM B의 검토 의견:

```json
{review_json}
```

## 최종 평가 요청

LLM B의 검토 의견을 고려하여 최종 평가를 내려주세요.

### 검토 사항

1. **LLM B의 지적이 타당한가?**
   - 지원서 내용을 더 정확히 반영했는가?
   - 놓친 중요한 내용을 발견했는가?
   - 점수 조정이 합리적인가?

2. **당신의 초기 평가를 유지할 부분은?**
   - LLM B가 과장하거나 잘못 해석한 부분은?
   - 초기 평가가 더 객관적이었던 부분은?

3. **최종 판단**
   - 각 평가 기준별로 최종 점수와 근거 결정
   - 두 평가를 종합한 균형잡힌 결과 도출

### 응답 형식 (JSON)

**CRITICAL**: 반드시 아래 JSON 형식으로만 응답하세요.

```json
{{
  "ai_category": "{first_category}",
  "business_impact": "조직 관점의 경영효과 (최종 판단)",
  "technical_feasibility": "AI 관점의 구현 가능성 (최종 판단)",
  "five_line_summary": [
    "1. 과제 목적",
    "2. 현재 문제",
    "3. 해결 방안",
    "4. 기대 효과",
    "5. 구현 계획"
  ],
  "evaluation_scores": {{
{json_example}
  }},
  "final_decision": "초기 평가와 LLM B의 검토 의견을 종합한 최종 판단 근거를 2-3문장으로 설명"
}}
```

**중요**:
- LLM B의 의견에 동의하면 점수를 조정하고 이유 설명
- LLM B의 의견에 동의하지 않으면 초기 평가를 유지하고 이유 설명
- 부분적으로 동의하면 절충안 제시
- 응답은 JSON만 포함하세요"#,
            review_json = review_json,
            first_category = self
                .categories
                .first()
                .map(|c| c.name.as_str())
                .unwrap_or("예측"),
            json_example = self.json_format_example(),
        )
    }
}

fn or_na(field: &Option<String>) -> &str {
    field.as_deref().filter(|s| !s.is_empty()).unwrap_or("N/A")
}

fn pretty_json(result: &EvaluationResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_types_rs::{default_categories, Criterion, Proposal, ScoreEntry};

    fn proposal() -> Proposal {
        Proposal {
            id: 1,
            subject: Some("불량 이미지 자동 분류".to_string()),
            division: Some("Memory".to_string()),
            department: Some("수율혁신팀".to_string()),
            pain_point: Some("육안 검사에 시간이 오래 걸림".to_string()),
            participant_count: Some(4),
            ..Default::default()
        }
    }

    fn criteria() -> Vec<Criterion> {
        vec![
            Criterion::new("혁신성", "AI 기술의 창의성과 새로움"),
            Criterion::new("실현가능성", "기술적 구현 난이도와 팀 역량"),
        ]
    }

    #[test]
    fn initial_prompt_embeds_menu_guide_and_schema() {
        let proposal = proposal();
        let criteria = criteria();
        let categories = default_categories();
        let builder = PromptBuilder::new(&proposal, &criteria, &categories);

        let prompt = builder.initial_prompt();
        assert!(prompt.contains("불량 이미지 자동 분류"));
        assert!(prompt.contains("Memory > 수율혁신팀"));
        // Category menu with descriptions.
        assert!(prompt.contains("- **예측**: 미래 값 예측"));
        assert!(prompt.contains("- **강화학습**:"));
        // Criteria guide and the canonical response keys.
        assert!(prompt.contains("**혁신성 (Innovation)**"));
        assert!(prompt.contains("\"innovation\""));
        assert!(prompt.contains("\"feasibility\""));
        assert!(prompt.contains("\"evaluation_scores\""));
        assert!(prompt.contains("\"five_line_summary\""));
        // Rubric: full-range scoring, no fabrication.
        assert!(prompt.contains("3-4점에만 몰리지 않도록"));
        assert!(prompt.contains("할루시네이션 금지"));
    }

    #[test]
    fn empty_criteria_fall_back_to_default_rubric() {
        let proposal = proposal();
        let categories = default_categories();
        let builder = PromptBuilder::new(&proposal, &[], &categories);

        let prompt = builder.initial_prompt();
        assert!(prompt.contains("**혁신성 (Innovation)**: AI 기술의 창의성과 새로움"));
        assert!(prompt.contains("**명확성 (Clarity)**: 문제 정의와 해결 방안의 구체성"));
        // The JSON example carries the four default keys.
        for key in ["innovation", "feasibility", "impact", "clarity"] {
            assert!(prompt.contains(&format!("\"{}\"", key)), "missing {}", key);
        }
    }

    #[test]
    fn prompts_use_caller_supplied_category_set() {
        let proposal = proposal();
        let criteria = criteria();
        let categories = vec![
            eval_types_rs::Category::new("예측", "미래 값 예측"),
            eval_types_rs::Category::new("분류", "이미지 분류"),
        ];
        let builder = PromptBuilder::new(&proposal, &criteria, &categories);

        let prompt = builder.initial_prompt();
        assert!(prompt.contains("\"예측\", \"분류\" 중 선택"));
        assert!(!prompt.contains("강화학습"));
    }

    #[test]
    fn review_prompt_embeds_initial_result_json() {
        let proposal = proposal();
        let criteria = criteria();
        let categories = default_categories();
        let builder = PromptBuilder::new(&proposal, &criteria, &categories);

        let mut initial = EvaluationResult {
            ai_category: "분류".to_string(),
            ..Default::default()
        };
        initial
            .evaluation_scores
            .insert("innovation".to_string(), ScoreEntry::new(4, "근거"));

        let prompt = builder.review_prompt(&initial);
        assert!(prompt.contains("평가 검토자"));
        assert!(prompt.contains("\"ai_category\": \"분류\""));
        assert!(prompt.contains("debate_summary"));
        assert!(prompt.contains("점수 인플레이션"));
    }

    #[test]
    fn final_prompt_embeds_review_and_asks_for_final_decision() {
        let proposal = proposal();
        let criteria = criteria();
        let categories = default_categories();
        let builder = PromptBuilder::new(&proposal, &criteria, &categories);

        let review = EvaluationResult {
            debate_summary: Some("점수 하향 조정".to_string()),
            ..Default::default()
        };
        let prompt = builder.final_prompt(&review);
        assert!(prompt.contains("점수 하향 조정"));
        assert!(prompt.contains("final_decision"));
        assert!(prompt.contains("최종 평가"));
    }

    #[test]
    fn system_message_announces_upcoming_review() {
        let proposal = proposal();
        let criteria = criteria();
        let categories = default_categories();
        let builder = PromptBuilder::new(&proposal, &criteria, &categories);

        let system = builder.initial_system_message();
        assert!(system.contains("동료 평가자(LLM B)가 당신의 평가를 검토"));
        assert!(system.contains("Memory > 수율혁신팀"));
    }
}
