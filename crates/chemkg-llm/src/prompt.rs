//! Prompt templates for question answering over the textbook graph.

/// A prompt template for text-generation requests.
pub trait PromptTemplate {
    /// Generate the prompt text.
    fn generate(&self) -> String;

    /// Whether the response must be JSON.
    fn wants_json(&self) -> bool {
        false
    }
}

const NO_THINK: &str = "Do NOT include any <think> tags or reasoning process - just the answer.\n\n/no_think";

/// Prompt splitting a question into dependent sub-questions.
#[derive(Debug, Clone)]
pub struct DecompositionPrompt {
    pub question: String,
    pub max_sub_questions: usize,
}

impl DecompositionPrompt {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            max_sub_questions: 5,
        }
    }

    pub fn with_max_sub_questions(mut self, max: usize) -> Self {
        self.max_sub_questions = max;
        self
    }
}

impl PromptTemplate for DecompositionPrompt {
    fn wants_json(&self) -> bool {
        true
    }

    fn generate(&self) -> String {
        format!(
            r#"Decompose this chemistry question into simpler sub-questions that must be answered first.

QUESTION: {}

Rules:
1. Each sub-question should be answerable independently
2. Order them by dependency (answer earlier ones first)
3. Keep sub-questions focused on ONE concept each
4. Maximum {} sub-questions

Return JSON:
{{
    "sub_questions": [
        {{"id": 1, "question": "...", "depends_on": []}},
        {{"id": 2, "question": "...", "depends_on": [1]}}
    ],
    "final_synthesis": "how to combine answers"
}}

/no_think"#,
            self.question, self.max_sub_questions
        )
    }
}

/// Prompt answering one sub-question from its context bundle.
#[derive(Debug, Clone, Default)]
pub struct AnswerPrompt {
    pub question: String,
    pub topics: Vec<String>,
    pub concepts: Vec<String>,
    pub prerequisites: Vec<String>,
    pub excerpts: Vec<String>,
    /// `(sub-question id, answer)` for declared dependencies only.
    pub previous_answers: Vec<(u32, String)>,
    /// Character cap on the joined excerpts.
    pub excerpt_budget: usize,
}

impl AnswerPrompt {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            excerpt_budget: 2000,
            ..Default::default()
        }
    }
}

impl PromptTemplate for AnswerPrompt {
    fn generate(&self) -> String {
        let excerpts = self.excerpts.join("\n---\n");
        let previous = if self.previous_answers.is_empty() {
            String::new()
        } else {
            let lines: Vec<String> = self
                .previous_answers
                .iter()
                .map(|(id, answer)| format!("Q{}: {}", id, answer))
                .collect();
            format!("PREVIOUS ANSWERS:\n{}\n\n", lines.join("\n"))
        };

        format!(
            "Answer this chemistry question using the provided context.\n\n\
             QUESTION: {}\n\n\
             RELEVANT TOPICS: {}\n\
             KEY CONCEPTS: {}\n\
             PREREQUISITES TO CONSIDER: {}\n\n\
             TEXTBOOK EXCERPTS:\n{}\n\n\
             {}\
             Provide a clear, accurate answer focused on the chemistry. Be concise but complete.\n\
             {}",
            self.question,
            self.topics.join(", "),
            self.concepts.join(", "),
            self.prerequisites.join(", "),
            truncate_chars(&excerpts, self.excerpt_budget),
            previous,
            NO_THINK
        )
    }
}

/// Prompt merging sub-answers into the final answer.
#[derive(Debug, Clone)]
pub struct SynthesisPrompt {
    pub question: String,
    pub partial_answers: Vec<(u32, String)>,
}

impl SynthesisPrompt {
    pub fn new(question: impl Into<String>, partial_answers: Vec<(u32, String)>) -> Self {
        Self {
            question: question.into(),
            partial_answers,
        }
    }

    /// `Part k: answer` blocks; also the fallback when synthesis fails.
    pub fn concatenated(&self) -> String {
        concat_parts(&self.partial_answers)
    }
}

/// Join answers as `Part k: answer`, sorted by id.
pub fn concat_parts(answers: &[(u32, String)]) -> String {
    let mut sorted: Vec<&(u32, String)> = answers.iter().collect();
    sorted.sort_by_key(|(id, _)| *id);
    sorted
        .iter()
        .map(|(id, answer)| format!("Part {}: {}", id, answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl PromptTemplate for SynthesisPrompt {
    fn generate(&self) -> String {
        format!(
            "Synthesize these partial answers into a complete, coherent response.\n\n\
             ORIGINAL QUESTION: {}\n\n\
             PARTIAL ANSWERS:\n{}\n\n\
             Combine these into a single, well-structured answer that:\n\
             1. Directly addresses the original question\n\
             2. Maintains logical flow\n\
             3. Removes redundancy\n\
             4. Is accurate and complete\n\n\
             {}",
            self.question,
            self.concatenated(),
            NO_THINK
        )
    }
}

/// Prompt summarising one topic across several textbooks.
#[derive(Debug, Clone)]
pub struct PerspectivesPrompt {
    pub topic: String,
    /// `(source, excerpt)` pairs.
    pub excerpts: Vec<(String, String)>,
    pub excerpt_budget: usize,
}

impl PerspectivesPrompt {
    pub fn new(topic: impl Into<String>, excerpts: Vec<(String, String)>) -> Self {
        Self {
            topic: topic.into(),
            excerpts,
            excerpt_budget: 3000,
        }
    }
}

impl PromptTemplate for PerspectivesPrompt {
    fn generate(&self) -> String {
        let joined = self
            .excerpts
            .iter()
            .map(|(source, text)| format!("[{}]:\n{}", source, text))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        format!(
            "Synthesize these textbook explanations of \"{topic}\" into a comprehensive summary.\n\n\
             TEXTBOOK EXCERPTS:\n{excerpts}\n\n\
             Create a synthesis that:\n\
             1. Captures key points from each textbook\n\
             2. Notes any differences in emphasis or approach\n\
             3. Provides a complete understanding of {topic}\n\
             4. Mentions which book is best for which aspect\n\n\
             Do NOT include any <think> tags.\n\n/no_think",
            topic = self.topic,
            excerpts = truncate_chars(&joined, self.excerpt_budget),
        )
    }
}

/// First `max` characters of `text`, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Strip `<think>` blocks some local models emit despite instructions.
pub fn clean_response(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Extract a JSON object from text (handles markdown code blocks).
pub fn extract_json_object(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    let text = text.trim();

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return &text[start..=end];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decomposition_prompt() {
        let prompt = DecompositionPrompt::new("Why is [Cu(H2O)6]2+ blue?").with_max_sub_questions(4);
        let generated = prompt.generate();
        assert!(generated.contains("[Cu(H2O)6]2+"));
        assert!(generated.contains("Maximum 4 sub-questions"));
        assert!(generated.contains("\"depends_on\""));
        assert!(prompt.wants_json());
    }

    #[test]
    fn test_answer_prompt_previous_answers() {
        let mut prompt = AnswerPrompt::new("What is the d-electron count?");
        prompt.topics = vec!["Crystal Field Theory".into()];
        prompt.previous_answers = vec![(1, "Cu is d9".into())];
        let generated = prompt.generate();
        assert!(generated.contains("RELEVANT TOPICS: Crystal Field Theory"));
        assert!(generated.contains("PREVIOUS ANSWERS:\nQ1: Cu is d9"));

        let bare = AnswerPrompt::new("q").generate();
        assert!(!bare.contains("PREVIOUS ANSWERS"));
    }

    #[test]
    fn test_answer_prompt_caps_excerpts() {
        let mut prompt = AnswerPrompt::new("q");
        prompt.excerpts = vec!["x".repeat(3000)];
        prompt.excerpt_budget = 100;
        let generated = prompt.generate();
        assert!(generated.contains(&"x".repeat(100)));
        assert!(!generated.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_synthesis_concatenation_sorted() {
        let prompt = SynthesisPrompt::new("q", vec![(2, "b".into()), (1, "a".into())]);
        assert_eq!(prompt.concatenated(), "Part 1: a\n\nPart 2: b");
        assert!(prompt.generate().contains("Part 1: a"));
    }

    #[test]
    fn test_perspectives_prompt() {
        let prompt = PerspectivesPrompt::new(
            "Crystal Field Theory",
            vec![("Housecroft".into(), "Splitting of d orbitals".into())],
        );
        let generated = prompt.generate();
        assert!(generated.contains("[Housecroft]:\nSplitting of d orbitals"));
        assert!(generated.contains("complete understanding of Crystal Field Theory"));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("Δ-oct splitting", 5), "Δ-oct");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_clean_response() {
        assert_eq!(clean_response("<think>hmm</think>\nAnswer"), "Answer");
        assert_eq!(clean_response("A <think>x</think>B"), "A B");
        assert_eq!(clean_response("plain"), "plain");
        assert_eq!(clean_response("keep<think>unclosed"), "keep");
    }

    #[test]
    fn test_extract_json_object_with_code_block() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(raw), "{\"a\": 1}");
        assert_eq!(extract_json_object("Sure! {\"b\": 2} done"), "{\"b\": 2}");
        assert_eq!(extract_json_object("no json"), "no json");
    }
}
