//! Self-Improving Agent
//!
//! Answers with past lessons in the request and may propose a new lesson,
//! which is written back to the injected [`LessonStore`] after the run.

use std::io::Write;
use std::sync::Arc;

use serde_json::json;

use agent_core::{
    Config, FieldSpec, FieldType, Lesson, LessonStore, MemoryLessonStore, OutputContract, Result,
    StructuredOutput,
};

use super::{Scenario, write_bullets};

pub struct SelfImproving {
    lessons: Arc<dyn LessonStore>,
}

impl Default for SelfImproving {
    fn default() -> Self {
        Self::new(Arc::new(MemoryLessonStore::with_lessons([Lesson::new(
            "Technical explanation was too complex",
            "User asked for simpler terms",
            "Match explanation complexity to audience",
            "Ask about technical background first",
        )])))
    }
}

impl SelfImproving {
    pub fn new(lessons: Arc<dyn LessonStore>) -> Self {
        Self { lessons }
    }

    pub fn lessons(&self) -> &Arc<dyn LessonStore> {
        &self.lessons
    }

    fn lesson_contract() -> Result<OutputContract> {
        OutputContract::builder("Lesson")
            .field(FieldSpec::string("situation", "What happened"))
            .field(FieldSpec::string("feedback", "Feedback received"))
            .field(FieldSpec::string("learning", "What was learned"))
            .field(FieldSpec::string("application", "How to apply in future"))
            .build()
    }
}

impl Scenario for SelfImproving {
    fn name(&self) -> &'static str {
        "self_improving"
    }

    fn title(&self) -> &'static str {
        "Self-Improving Agent"
    }

    fn description(&self) -> &'static str {
        "Apply lessons from earlier feedback and record new ones"
    }

    fn defaults(&self) -> Config {
        Config::new()
            .with("learning_mode", "active")
            .with("query", "Explain how machine learning works")
    }

    fn instructions(&self, config: &Config) -> Result<Vec<String>> {
        Ok(vec![
            format!("You operate in {} learning mode.", config.get_str("learning_mode")?),
            "Apply lessons from past interactions.".into(),
            "Identify areas where you need feedback.".into(),
            "Continuously improve based on learning.".into(),
        ])
    }

    fn contract(&self) -> Result<OutputContract> {
        OutputContract::builder("SelfImprovingResponse")
            .field(FieldSpec::string("response", "Current response"))
            .field(FieldSpec::list("lessons_applied", FieldType::String, "Past lessons used"))
            .field(FieldSpec::string("confidence", "Response confidence").one_of(&["low", "medium", "high"]))
            .field(FieldSpec::list(
                "areas_for_feedback",
                FieldType::String,
                "What to get feedback on",
            ))
            .field(FieldSpec::string("improvement_plan", "How to keep improving"))
            .field(
                FieldSpec::record(
                    "new_lesson",
                    Self::lesson_contract()?,
                    "A lesson worth keeping from this interaction, if any",
                )
                .optional(),
            )
            .build()
    }

    fn request(&self, config: &Config) -> Result<String> {
        Ok(format!(
            "Past lessons to apply:\n{}\n\nCurrent query: {}\n\n\
             Apply your learnings and identify areas for improvement.",
            self.lessons.render(),
            config.get_str("query")?,
        ))
    }

    fn sample_response(&self, _config: &Config) -> Result<String> {
        Ok(json!({
            "response": "Machine learning finds patterns in examples instead of following hand-written rules. You show it many labelled cases, it adjusts itself to reduce its mistakes, and then it can make guesses about new cases.",
            "lessons_applied": ["Match explanation complexity to audience"],
            "confidence": "high",
            "areas_for_feedback": ["Was the level of detail right?", "Would an example help?"],
            "improvement_plan": "Offer a concrete example next time and check the reader's background first.",
            "new_lesson": {
                "situation": "Asked for a general explanation with no audience given",
                "feedback": "None yet",
                "learning": "Lead with an everyday analogy",
                "application": "Open broad explanations with a familiar example",
            },
        })
        .to_string())
    }

    fn after_invoke(&self, output: &StructuredOutput) -> Result<()> {
        if let Some(record) = output.record("new_lesson") {
            let lesson: Lesson = record.deserialize()?;
            tracing::debug!(learning = %lesson.learning, "Recording lesson");
            self.lessons.add(lesson);
        }
        Ok(())
    }

    fn render(&self, output: &StructuredOutput, out: &mut dyn Write) -> Result<()> {
        let response = output.str("response").unwrap_or_default();
        let preview: String = response.chars().take(200).collect();
        let ellipsis = if preview.len() < response.len() { "..." } else { "" };

        writeln!(out, "Response: {preview}{ellipsis}")?;
        writeln!(out, "\nLessons Applied: {}", output.strings("lessons_applied").join(", "))?;
        writeln!(out, "Confidence: {}", output.str("confidence").unwrap_or_default())?;
        writeln!(out, "Feedback Needed On:")?;
        write_bullets(out, output.strings("areas_for_feedback"), usize::MAX)?;
        writeln!(out, "Improvement Plan: {}", output.str("improvement_plan").unwrap_or_default())?;

        if let Some(lesson) = output.record("new_lesson") {
            writeln!(
                out,
                "\nNew Lesson: {}: {}",
                lesson.str("learning").unwrap_or_default(),
                lesson.str("application").unwrap_or_default()
            )?;
        }
        Ok(())
    }
}
