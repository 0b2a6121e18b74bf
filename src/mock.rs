//! Canned responses served when the dashboard runs with `USE_MOCK=1`.
//!
//! They describe one fictional course consistently: the OCR text, the
//! extracted FAQ and schedule, and the Q&A answer all agree with each other.

use crate::schedule::{FaqMap, ScheduleEntry};

/// Text returned instead of calling the recognition service.
pub const OCR_TEXT: &str = "Course: Intro to Data Science (Fall 2025)
Instructor: Dr. Smith
Attendance: Required; more than 2 unexcused absences reduces final grade by one letter.
Late work: 10% penalty per day up to 3 days; no submissions after 72 hours.
Grading: Homework 30%, Project 30%, Midterm 20%, Final 20%.
Weekly schedule:
Week 1: Syllabus, HW0 (0%).
Week 2: Python basics, HW1 (5%).
Week 3: EDA, HW2 (5%).
Week 4: Data Wrangling, Quiz 1 (5%).
Week 5: Modeling 1, Project Proposal (5%).
Week 6: Modeling 2, HW3 (5%).
Week 7: Midterm (20%).
Week 8: Feature Engineering, HW4 (5%).
Week 9: Model Evaluation, HW5 (5%).
Week 10: Project Milestone (10%).
Week 11: Ethics, HW6 (5%).
Week 12: Deployment, Quiz 2 (5%).
Week 13: Presentations, Final Project (20%).";

/// Summary returned instead of calling the generative service.
pub const SUMMARY: &str = "Course mixes weekly HWs, two quizzes, a midterm, and a final project; \
strict late policy; attendance required.";

pub fn faq() -> FaqMap {
    FaqMap {
        late_work_policy: Some(
            "10% per day late up to 3 days; no submissions after 72 hours.".into(),
        ),
        attendance_policy: Some(
            "Attendance required; >2 unexcused absences = final grade reduced by one letter."
                .into(),
        ),
        course_structure: Some(
            "Weekly lectures + labs; 6 HWs, 2 quizzes, 1 midterm, final project & presentation."
                .into(),
        ),
    }
}

pub fn schedule() -> Vec<ScheduleEntry> {
    const ROWS: [(u32, f64, &str); 13] = [
        (1, 0.0, "HW0 (setup)"),
        (2, 5.0, "HW1"),
        (3, 5.0, "HW2"),
        (4, 5.0, "Quiz 1"),
        (5, 5.0, "Project proposal"),
        (6, 5.0, "HW3"),
        (7, 20.0, "Midterm"),
        (8, 5.0, "HW4"),
        (9, 5.0, "HW5"),
        (10, 10.0, "Project milestone"),
        (11, 5.0, "HW6"),
        (12, 5.0, "Quiz 2"),
        (13, 20.0, "Final project"),
    ];
    ROWS.iter()
        .map(|&(week, weight_pct, notes)| ScheduleEntry {
            week,
            assignments: 1,
            weight_pct,
            notes: notes.to_string(),
        })
        .collect()
}

/// Answer returned instead of calling the generative service.
pub fn answer(question: &str) -> String {
    format!(
        "(Demo) Based on the syllabus: {question} → Late penalty is 10%/day up to 3 days; \
attendance mandatory."
    )
}
