use std::fmt;

use chrono::NaiveDate;
use colored::{ColoredString, Colorize};
use study_core::ProgressColor;
use study_core::model::{Student, StudySession};

const BAR_WIDTH: usize = 24;

/// Dates are shown the way the students expect them, day first.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn format_duration(total_minutes: u64) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}min")
    } else {
        format!("{minutes}min")
    }
}

/// First eight characters of an id, enough to select it on the command line.
pub fn short_id(id: impl fmt::Display) -> String {
    id.to_string().chars().take(8).collect()
}

pub fn paragraph_suffix(paragraph: u32) -> String {
    if paragraph > 0 {
        format!(" (§ {paragraph})")
    } else {
        String::new()
    }
}

pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn paint(color: ProgressColor, text: &str) -> ColoredString {
    match color {
        ProgressColor::Red => text.red(),
        ProgressColor::Yellow => text.yellow(),
        ProgressColor::Blue => text.blue(),
        ProgressColor::Green => text.green(),
    }
}

/// Splits a line into `(text, is_bold)` spans. Only paired `**` markers toggle
/// bold; an unmatched marker is kept as literal text.
pub fn bold_spans(text: &str) -> Vec<(String, bool)> {
    let mut spans = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let Some(len) = rest[start + 2..].find("**") else {
            break;
        };
        if start > 0 {
            spans.push((rest[..start].to_owned(), false));
        }
        spans.push((rest[start + 2..start + 2 + len].to_owned(), true));
        rest = &rest[start + 2 + len + 2..];
    }

    if !rest.is_empty() {
        spans.push((rest.to_owned(), false));
    }
    spans
}

/// Prints tips text, turning `**bold**` markers into terminal bold.
pub fn print_markdown(text: &str) {
    for line in text.lines() {
        for (span, bold) in bold_spans(line) {
            if bold {
                print!("{}", span.bold());
            } else {
                print!("{span}");
            }
        }
        println!();
    }
}

pub fn print_student_card(student: &Student) {
    let percent = student.completion_percent();
    let color = ProgressColor::for_percent(percent);

    let mut header = student.name().bold().to_string();
    if !student.contact().is_empty() {
        header.push_str(&format!("  {}", student.contact().dimmed()));
    }
    println!("{header}  [{}]", short_id(student.id()).dimmed());
    println!(
        "  {}  Lição {} de {}{}",
        student.book_name(),
        student.current_lesson(),
        student.total_lessons(),
        paragraph_suffix(student.current_paragraph()),
    );
    println!(
        "  {} {}",
        paint(color, &progress_bar(percent, BAR_WIDTH)),
        format!("{percent:.0}%").bold(),
    );
    match student.last_session() {
        Some(last) => println!(
            "  último estudo: {}  registros: {}  tempo total: {}",
            format_date(last.date()),
            student.history().len(),
            format_duration(student.total_study_minutes()),
        ),
        None => println!("  {}", "Não iniciado".dimmed()),
    }
}

pub fn print_history_entry(session: &StudySession) {
    let mut line = format!(
        "  {}  {}  Lição {}{}",
        short_id(session.id()).dimmed(),
        format_date(session.date()),
        session.lesson(),
        paragraph_suffix(session.paragraph()),
    );
    if session.duration_minutes() > 0 {
        line.push_str(&format!("  {}", format_duration(session.duration_minutes())));
    }
    println!("{line}");
    if let Some(notes) = session.notes() {
        println!("      {}", notes.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_date_is_day_first() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(format_date(date), "05/03/2024");
    }

    #[test]
    fn format_duration_omits_zero_hours() {
        assert_eq!(format_duration(0), "0min");
        assert_eq!(format_duration(45), "45min");
        assert_eq!(format_duration(60), "1h 0min");
        assert_eq!(format_duration(125), "2h 5min");
    }

    #[test]
    fn short_id_keeps_eight_chars() {
        assert_eq!(short_id("3f2a9c1d-0000-0000-0000-000000000000"), "3f2a9c1d");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn paragraph_suffix_hides_zero() {
        assert_eq!(paragraph_suffix(0), "");
        assert_eq!(paragraph_suffix(7), " (§ 7)");
    }

    #[test]
    fn progress_bar_fills_by_percent() {
        assert_eq!(progress_bar(0.0, 4), "░░░░");
        assert_eq!(progress_bar(50.0, 4), "██░░");
        assert_eq!(progress_bar(100.0, 4), "████");
    }

    #[test]
    fn progress_bar_rounds_to_nearest_cell() {
        // 8% of 24 cells is 1.92, which rounds up to 2.
        assert_eq!(progress_bar(8.0, 24).chars().filter(|c| *c == '█').count(), 2);
    }

    #[test]
    fn bold_spans_leaves_plain_text_alone() {
        assert_eq!(bold_spans("ola"), vec![("ola".to_owned(), false)]);
    }

    #[test]
    fn bold_spans_extracts_paired_markers() {
        assert_eq!(
            bold_spans("uma **dica** boa"),
            vec![
                ("uma ".to_owned(), false),
                ("dica".to_owned(), true),
                (" boa".to_owned(), false),
            ]
        );
    }

    #[test]
    fn bold_spans_handles_multiple_pairs() {
        assert_eq!(
            bold_spans("**a** e **b**"),
            vec![
                ("a".to_owned(), true),
                (" e ".to_owned(), false),
                ("b".to_owned(), true),
            ]
        );
    }

    #[test]
    fn bold_spans_keeps_unmatched_marker_literal() {
        assert_eq!(
            bold_spans("sem **par"),
            vec![("sem **par".to_owned(), false)]
        );
    }
}
