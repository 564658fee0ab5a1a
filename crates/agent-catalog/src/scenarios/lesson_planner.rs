//! Lesson Planner

use std::io::Write;

use serde_json::{Value, json};

use agent_core::{Config, FieldSpec, FieldType, OutputContract, Result, StructuredOutput};

use super::{Scenario, write_bullets};

pub struct LessonPlanner;

fn activity() -> Result<OutputContract> {
    OutputContract::builder("Activity")
        .field(FieldSpec::string("name", "Activity name"))
        .field(FieldSpec::integer("duration", "Duration in minutes").bounded(1.0, 240.0))
        .field(FieldSpec::string("description", "Activity description"))
        .field(
            FieldSpec::list("materials", FieldType::String, "Required materials")
                .with_default(json!([])),
        )
        .build()
}

impl Scenario for LessonPlanner {
    fn name(&self) -> &'static str {
        "lesson_planner"
    }

    fn title(&self) -> &'static str {
        "Lesson Planner"
    }

    fn description(&self) -> &'static str {
        "Create structured lesson plans with objectives, activities and assessments"
    }

    fn defaults(&self) -> Config {
        Config::new()
            .with("subject", "mathematics")
            .with("grade_level", "8")
            .with("topic", "Introduction to linear equations")
            .with("duration_minutes", 50)
    }

    fn instructions(&self, _config: &Config) -> Result<Vec<String>> {
        Ok([
            "Create engaging, standards-aligned lesson plans",
            "Include clear learning objectives and success criteria",
            "Design varied activities for different learning styles",
            "Incorporate formative assessment throughout",
            "Provide differentiation for diverse learners",
        ]
        .map(String::from)
        .to_vec())
    }

    fn contract(&self) -> Result<OutputContract> {
        OutputContract::builder("LessonPlan")
            .field(FieldSpec::string("title", "Lesson title"))
            .field(FieldSpec::string("subject", "Subject area"))
            .field(FieldSpec::string("grade_level", "Grade level"))
            .field(FieldSpec::integer("duration", "Total duration in minutes").bounded(1.0, 480.0))
            .field(FieldSpec::list("objectives", FieldType::String, "Learning objectives"))
            .field(FieldSpec::list("standards", FieldType::String, "Aligned standards"))
            .field(FieldSpec::list("activities", FieldType::record(activity()?), "Lesson activities"))
            .field(FieldSpec::string("assessment", "How to assess understanding"))
            .field(FieldSpec::list(
                "differentiation",
                FieldType::String,
                "Differentiation strategies",
            ))
            .field(FieldSpec::string("homework", "Homework assignment"))
            .build()
    }

    fn request(&self, config: &Config) -> Result<String> {
        Ok(format!(
            "Create a lesson plan:\nSubject: {}\nGrade: {}\nTopic: {}\nDuration: {} minutes\n\
             Context: Students have learned variables and basic algebra",
            config.get_str("subject")?,
            config.get_str("grade_level")?,
            config.get_str("topic")?,
            config.get_i64("duration_minutes")?,
        ))
    }

    fn sample_response(&self, config: &Config) -> Result<String> {
        let total = config.get_i64("duration_minutes")?;
        let practice = (total - 25).max(5);

        Ok(json!({
            "title": config.get_str("topic")?,
            "subject": config.get_str("subject")?,
            "grade_level": config.get_str("grade_level")?,
            "duration": total,
            "objectives": [
                "Identify slope and intercept in y = mx + b",
                "Graph a linear equation from a table of values",
            ],
            "standards": ["CCSS.MATH.CONTENT.8.EE.B.5"],
            "activities": [
                {"name": "Warm-up", "duration": 10, "description": "Evaluate expressions for given x", "materials": ["Whiteboards"]},
                {"name": "Guided graphing", "duration": 15, "description": "Plot y = 2x + 1 together"},
                {"name": "Pair practice", "duration": practice, "description": "Match equations to graphs", "materials": ["Card sort", "Graph paper"]},
            ],
            "assessment": "Exit ticket: graph y = -x + 3 and name its slope",
            "differentiation": ["Pre-filled tables for support", "Slope from two points as extension"],
            "homework": "Workbook 4.2, problems 1-12",
        })
        .to_string())
    }

    fn render(&self, output: &StructuredOutput, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "{}", output.str("title").unwrap_or_default())?;
        writeln!(
            out,
            "Subject: {} | Grade: {} | Duration: {} min",
            output.str("subject").unwrap_or_default(),
            output.str("grade_level").unwrap_or_default(),
            output.i64("duration").unwrap_or_default()
        )?;

        writeln!(out, "\nObjectives:")?;
        write_bullets(out, output.strings("objectives"), usize::MAX)?;

        let activities = output.list("activities");
        writeln!(out, "\nActivities ({}):", activities.len())?;
        for act in activities {
            writeln!(
                out,
                "  - {} ({} min)",
                act.get("name").and_then(Value::as_str).unwrap_or_default(),
                act.get("duration").and_then(Value::as_i64).unwrap_or_default()
            )?;
        }

        writeln!(out, "\nAssessment: {}", output.str("assessment").unwrap_or_default())?;
        writeln!(out, "Homework: {}", output.str("homework").unwrap_or_default())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_level_accepts_integer_override() {
        // `--set grade_level=10` arrives as an integer
        let config = LessonPlanner.defaults().with("grade_level", 10);
        let request = LessonPlanner.request(&config).unwrap();
        assert!(request.contains("Grade: 10\n"));

        let output = LessonPlanner
            .contract()
            .unwrap()
            .parse(&LessonPlanner.sample_response(&config).unwrap())
            .unwrap();
        assert_eq!(output.str("grade_level"), Some("10"));
    }

    #[test]
    fn test_render_lists_activities() {
        let config = LessonPlanner.defaults();
        let output = LessonPlanner
            .contract()
            .unwrap()
            .parse(&LessonPlanner.sample_response(&config).unwrap())
            .unwrap();

        let mut buf = Vec::new();
        LessonPlanner.render(&output, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Duration: 50 min"));
        assert!(text.contains("Activities (3):"));
        assert!(text.contains("  - Pair practice (25 min)"));
    }
}
