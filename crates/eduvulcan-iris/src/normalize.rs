//! RawRecord to CalendarEvent conversion.
//!
//! Normalization is pure: a record either becomes one [`CalendarEvent`] or
//! is dropped with a [`NormalizationWarning`]. Nothing here is fatal to a
//! sync pass.
//!
//! - Lessons become timed events, localized in the institution timezone.
//! - Homework is an all-day event on its deadline.
//! - Exams are all-day events on their date.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

use eduvulcan_core::{CalendarEvent, EventTime, Feed};

use crate::records::{
    Account, Employee, ExamRecord, HomeworkRecord, IrisDate, LessonRecord, RawRecord, parse_time,
};

/// Timezone of Polish schools.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Warsaw;

/// Maximum length of the short text appended to homework and exam titles.
const SHORT_TEXT_LEN: usize = 40;

/// Inputs shared by every record of a pass.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    /// Timezone lesson times are expressed in.
    pub tz: Tz,
    /// The pupil account, used to enrich descriptions.
    pub account: Option<Account>,
}

impl Default for NormalizeContext {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl NormalizeContext {
    /// Creates a context for `tz` without account details.
    pub fn new(tz: Tz) -> Self {
        Self { tz, account: None }
    }

    /// Builder method to set the account.
    pub fn with_account(mut self, account: Option<Account>) -> Self {
        self.account = account;
        self
    }
}

/// Why a record was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarningReason {
    #[error("record belongs to the {0} feed")]
    WrongFeed(Feed),
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {value:?}")]
    InvalidTime { field: &'static str, value: String },
    #[error("local time {0} does not exist in the institution timezone")]
    NonexistentLocalTime(NaiveDateTime),
    #[error("lesson does not end after it starts")]
    EmptyInterval,
    #[error("duplicate record id")]
    DuplicateId,
}

/// A record that could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{feed}] record {record_id}: {reason}")]
pub struct NormalizationWarning {
    pub feed: Feed,
    pub record_id: String,
    pub reason: WarningReason,
}

impl NormalizationWarning {
    fn new(feed: Feed, record: &RawRecord, reason: WarningReason) -> Self {
        Self {
            feed,
            record_id: record.id().to_string(),
            reason,
        }
    }
}

/// The result of normalizing one feed.
#[derive(Debug, Clone, Default)]
pub struct NormalizedFeed {
    /// Events ordered by start, ties broken by uid.
    pub events: Vec<CalendarEvent>,
    /// Records that were dropped.
    pub warnings: Vec<NormalizationWarning>,
}

/// Converts one record into a calendar event.
///
/// # Errors
///
/// Returns a warning when the record lacks a usable date or time.
pub fn normalize(
    record: &RawRecord,
    ctx: &NormalizeContext,
) -> Result<CalendarEvent, NormalizationWarning> {
    let feed = record.feed();
    let result = match record {
        RawRecord::Lesson(lesson) => normalize_lesson(lesson, ctx),
        RawRecord::Homework(homework) => normalize_homework(homework, ctx),
        RawRecord::Exam(exam) => normalize_exam(exam, ctx),
    };
    result.map_err(|reason| NormalizationWarning::new(feed, record, reason))
}

/// Normalizes every record of `feed`, dropping the ones that fail.
///
/// The events do not depend on the order of `records`. Of two records
/// sharing an id, the one with the later start is kept, then the later end,
/// then the greater title, description and location.
pub fn normalize_feed(feed: Feed, records: &[RawRecord], ctx: &NormalizeContext) -> NormalizedFeed {
    let mut output = NormalizedFeed::default();
    let mut kept: HashMap<String, CalendarEvent> = HashMap::new();

    for record in records {
        if record.feed() != feed {
            output.warnings.push(NormalizationWarning::new(
                feed,
                record,
                WarningReason::WrongFeed(record.feed()),
            ));
            continue;
        }
        match normalize(record, ctx) {
            Ok(event) => match kept.entry(event.uid.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(event);
                }
                Entry::Occupied(mut slot) => {
                    if duplicate_order(&event, slot.get()) == Ordering::Greater {
                        slot.insert(event);
                    }
                    output.warnings.push(NormalizationWarning::new(
                        feed,
                        record,
                        WarningReason::DuplicateId,
                    ));
                }
            },
            Err(warning) => output.warnings.push(warning),
        }
    }

    output.events = kept.into_values().collect();
    output
        .events
        .sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.uid.cmp(&b.uid)));
    output
}

/// Total order over the content of two events sharing a uid.
fn duplicate_order(a: &CalendarEvent, b: &CalendarEvent) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| a.end.cmp(&b.end))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.description.cmp(&b.description))
        .then_with(|| a.location.cmp(&b.location))
}

fn normalize_lesson(
    lesson: &LessonRecord,
    ctx: &NormalizeContext,
) -> Result<CalendarEvent, WarningReason> {
    let date = lesson
        .date_at
        .as_ref()
        .ok_or(WarningReason::MissingField("DateAt"))?
        .date;
    let slot = lesson
        .time_slot
        .as_ref()
        .ok_or(WarningReason::MissingField("TimeSlot"))?;

    let start = localize(ctx.tz, date, slot.start.as_deref(), "TimeSlot.Start")?;
    let end = localize(ctx.tz, date, slot.end.as_deref(), "TimeSlot.End")?;
    if start >= end {
        return Err(WarningReason::EmptyInterval);
    }

    let subject = subject_name(lesson.subject.as_ref().and_then(|s| s.name.as_deref()));
    let title = subject
        .or_else(|| non_blank(lesson.event.as_deref()))
        .unwrap_or("Lesson");
    let room = lesson
        .room
        .as_ref()
        .and_then(|r| non_blank(r.code.as_deref()));

    let mut lines = Lines::for_account(ctx.account.as_ref());
    lines.push("Subject", subject);
    lines.push("Event", lesson.event.as_deref());
    lines.push("Time", slot.display.as_deref());
    lines.push("Teacher", teacher(lesson.teacher_primary.as_ref()).as_deref());
    lines.push(
        "Second teacher",
        teacher(lesson.teacher_secondary.as_ref()).as_deref(),
    );
    lines.push("Room", room);
    lines.push(
        "Class",
        lesson.clazz.as_ref().and_then(|c| c.symbol.as_deref()),
    );
    lines.push(
        "Group",
        lesson
            .distribution
            .as_ref()
            .and_then(|d| d.name.as_deref().or(d.shortcut.as_deref())),
    );

    let mut event = CalendarEvent::new(
        Feed::Lessons.uid_for(&lesson.id.to_string()),
        Feed::Lessons,
        title,
        EventTime::from_local(start),
        EventTime::from_local(end),
    );
    if let Some(room) = room {
        event = event.with_location(room);
    }
    event.description = lines.finish();
    Ok(event)
}

fn normalize_homework(
    homework: &HomeworkRecord,
    ctx: &NormalizeContext,
) -> Result<CalendarEvent, WarningReason> {
    let due = homework
        .deadline
        .or(homework.date)
        .ok_or(WarningReason::MissingField("Deadline"))?
        .date;
    let subject = subject_name(homework.subject.as_ref().and_then(|s| s.name.as_deref()));
    let title = compose_title(subject, homework.content.as_deref(), "Homework");

    let mut lines = Lines::for_account(ctx.account.as_ref());
    lines.push("Subject", subject);
    lines.push("Content", homework.content.as_deref());
    lines.push("Assigned", homework.date.map(format_date).as_deref());
    lines.push("Deadline", homework.deadline.map(format_date).as_deref());
    lines.push(
        "Answer required",
        homework
            .is_answer_required
            .map(|required| if required { "yes" } else { "no" }),
    );
    lines.push("Answer by", homework.answer_at.map(format_date).as_deref());
    lines.push("Teacher", teacher(homework.creator.as_ref()).as_deref());
    let attachments: Vec<String> = homework
        .attachments
        .iter()
        .filter_map(|a| match (non_blank(a.name.as_deref()), non_blank(a.link.as_deref())) {
            (Some(name), Some(link)) => Some(format!("{} ({})", name, link)),
            (Some(name), None) => Some(name.to_string()),
            (None, Some(link)) => Some(link.to_string()),
            (None, None) => None,
        })
        .collect();
    if !attachments.is_empty() {
        lines.push("Attachments", Some(attachments.join(", ").as_str()));
    }

    Ok(all_day_event(
        Feed::Homework,
        &homework.id.to_string(),
        title,
        due,
        lines.finish(),
    ))
}

fn normalize_exam(exam: &ExamRecord, ctx: &NormalizeContext) -> Result<CalendarEvent, WarningReason> {
    let date = exam
        .deadline
        .ok_or(WarningReason::MissingField("Deadline"))?
        .date;
    let subject = subject_name(exam.subject.as_ref().and_then(|s| s.name.as_deref()));
    let detail = non_blank(exam.kind.as_deref()).or(exam.content.as_deref());
    let title = compose_title(subject, detail, "Exam");

    let mut lines = Lines::for_account(ctx.account.as_ref());
    lines.push("Subject", subject);
    lines.push("Type", exam.kind.as_deref());
    lines.push("Content", exam.content.as_deref());
    lines.push("Date", exam.deadline.map(format_date).as_deref());
    lines.push("Teacher", teacher(exam.creator.as_ref()).as_deref());

    Ok(all_day_event(
        Feed::Exams,
        &exam.id.to_string(),
        title,
        date,
        lines.finish(),
    ))
}

fn all_day_event(
    feed: Feed,
    record_id: &str,
    title: String,
    date: NaiveDate,
    description: Option<String>,
) -> CalendarEvent {
    let end = date.succ_opt().unwrap_or(date);
    let mut event = CalendarEvent::new(
        feed.uid_for(record_id),
        feed,
        title,
        EventTime::from_date(date),
        EventTime::from_date(end),
    );
    event.description = description;
    event
}

/// Resolves a local wall-clock time; ambiguous times take the earlier instant.
fn localize(
    tz: Tz,
    date: NaiveDate,
    time: Option<&str>,
    field: &'static str,
) -> Result<chrono::DateTime<Tz>, WarningReason> {
    let raw = time.ok_or(WarningReason::MissingField(field))?;
    let time = parse_time(raw).ok_or_else(|| WarningReason::InvalidTime {
        field,
        value: raw.to_string(),
    })?;
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or(WarningReason::NonexistentLocalTime(naive))
}

/// `"<subject>: <short text>"`, falling back to `fallback` for the subject.
fn compose_title(subject: Option<&str>, detail: Option<&str>, fallback: &str) -> String {
    let head = subject.unwrap_or(fallback);
    match detail.and_then(short_text) {
        Some(text) => format!("{}: {}", head, text),
        None => head.to_string(),
    }
}

/// First non-empty line of `text`, truncated with an ellipsis.
fn short_text(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.chars().count() <= SHORT_TEXT_LEN {
        return Some(line.to_string());
    }
    let cut: String = line.chars().take(SHORT_TEXT_LEN).collect();
    Some(format!("{}…", cut.trim_end()))
}

fn subject_name(name: Option<&str>) -> Option<&str> {
    non_blank(name)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn teacher(employee: Option<&Employee>) -> Option<String> {
    employee.and_then(Employee::full_name)
}

fn format_date(date: IrisDate) -> String {
    match date.time {
        Some(time) => format!("{} {}", date.date.format("%Y-%m-%d"), time.format("%H:%M")),
        None => date.date.format("%Y-%m-%d").to_string(),
    }
}

/// Labelled description lines; blank values are skipped.
struct Lines(Vec<String>);

impl Lines {
    fn for_account(account: Option<&Account>) -> Self {
        let mut lines = Self(Vec::new());
        if let Some(account) = account {
            lines.push("Pupil", Some(account.pupil_name.as_str()));
            lines.push(
                "School",
                account
                    .unit_name
                    .as_deref()
                    .or(account.unit_short.as_deref()),
            );
        }
        lines
    }

    fn push(&mut self, label: &str, value: Option<&str>) {
        if let Some(value) = non_blank(value) {
            self.0.push(format!("{}: {}", label, value));
        }
    }

    fn finish(self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};
    use serde_json::json;

    fn record(feed: Feed, value: serde_json::Value) -> RawRecord {
        RawRecord::decode(feed, value).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx() -> NormalizeContext {
        NormalizeContext::default()
    }

    fn lesson(id: i64, day: &str, start: &str, end: &str) -> RawRecord {
        record(
            Feed::Lessons,
            json!({
                "Id": id,
                "DateAt": day,
                "TimeSlot": { "Start": start, "End": end, "Display": format!("{}-{}", start, end) },
                "Subject": { "Name": "Fizyka" },
                "Room": { "Code": "12" }
            }),
        )
    }

    mod homework {
        use super::*;

        #[test]
        fn homework_due_date_becomes_all_day_event() {
            let raw = record(
                Feed::Homework,
                json!({ "Id": "42", "Subject": { "Name": "Math" }, "Deadline": "2024-03-10" }),
            );
            let event = normalize(&raw, &ctx()).unwrap();

            assert_eq!(event.uid, "homework:42");
            assert!(event.title.contains("Math"));
            assert_eq!(event.start, EventTime::from_date(date(2024, 3, 10)));
            assert_eq!(event.end, EventTime::from_date(date(2024, 3, 11)));
            assert!(event.all_day);
        }

        #[test]
        fn falls_back_to_assignment_date() {
            let raw = record(Feed::Homework, json!({ "Id": 1, "Date": "2024-03-04 10:00" }));
            let event = normalize(&raw, &ctx()).unwrap();
            assert_eq!(event.start.date(), date(2024, 3, 4));
            assert_eq!(event.title, "Homework");
        }

        #[test]
        fn missing_date_is_dropped() {
            let raw = record(Feed::Homework, json!({ "Id": 5, "Content": "Read" }));
            let warning = normalize(&raw, &ctx()).unwrap_err();
            assert_eq!(warning.feed, Feed::Homework);
            assert_eq!(warning.record_id, "5");
            assert_eq!(warning.reason, WarningReason::MissingField("Deadline"));
        }

        #[test]
        fn title_uses_first_content_line() {
            let raw = record(
                Feed::Homework,
                json!({
                    "Id": 2,
                    "Subject": { "Name": "Polski" },
                    "Content": "\n  Przeczytać lekturę \"Pan Tadeusz\" księgi od pierwszej do czwartej\nStrony 1-80",
                    "Deadline": "2024-03-10"
                }),
            );
            let event = normalize(&raw, &ctx()).unwrap();
            assert_eq!(
                event.title,
                "Polski: Przeczytać lekturę \"Pan Tadeusz\" księgi…"
            );
        }

        #[test]
        fn description_lists_known_fields() {
            let raw = record(
                Feed::Homework,
                json!({
                    "Id": 3,
                    "Subject": { "Name": "Math" },
                    "Content": "Ex. 1-4",
                    "Date": "2024-03-04",
                    "Deadline": "2024-03-10",
                    "IsAnswerRequired": true,
                    "Creator": { "DisplayName": "Anna Nowak" },
                    "Attachments": [{ "Name": "sheet.pdf", "Link": "https://files.example/sheet.pdf" }]
                }),
            );
            let account = Account {
                pupil_id: 1234,
                pupil_name: "Jan Kowalski".to_string(),
                unit_name: Some("SP 1".to_string()),
                unit_short: None,
                rest_url: None,
            };
            let event = normalize(&raw, &ctx().with_account(Some(account))).unwrap();
            assert_eq!(
                event.description.as_deref(),
                Some(
                    "Pupil: Jan Kowalski\n\
                     School: SP 1\n\
                     Subject: Math\n\
                     Content: Ex. 1-4\n\
                     Assigned: 2024-03-04\n\
                     Deadline: 2024-03-10\n\
                     Answer required: yes\n\
                     Teacher: Anna Nowak\n\
                     Attachments: sheet.pdf (https://files.example/sheet.pdf)"
                )
            );
        }
    }

    mod exams {
        use super::*;

        #[test]
        fn title_prefers_exam_type() {
            let raw = record(
                Feed::Exams,
                json!({
                    "Id": 7,
                    "Subject": { "Name": "Chemia" },
                    "Type": "Sprawdzian",
                    "Content": "Dział 3",
                    "Deadline": "2024-03-12"
                }),
            );
            let event = normalize(&raw, &ctx()).unwrap();
            assert_eq!(event.uid, "exams:7");
            assert_eq!(event.title, "Chemia: Sprawdzian");
            assert!(event.all_day);
            assert_eq!(event.end.date(), date(2024, 3, 13));
        }

        #[test]
        fn title_without_subject() {
            let raw = record(
                Feed::Exams,
                json!({ "Id": 8, "Content": "Kartkówka z ułamków", "Deadline": "2024-03-12" }),
            );
            assert_eq!(normalize(&raw, &ctx()).unwrap().title, "Exam: Kartkówka z ułamków");
        }

        #[test]
        fn no_description_without_fields() {
            let raw = record(Feed::Exams, json!({ "Id": 9, "Deadline": "2024-03-12" }));
            let event = normalize(&raw, &ctx()).unwrap();
            assert_eq!(event.title, "Exam");
            assert_eq!(event.description.as_deref(), Some("Date: 2024-03-12"));
        }
    }

    mod lessons {
        use super::*;

        #[test]
        fn lesson_is_localized_in_institution_timezone() {
            let event = normalize(&lesson(1, "2024-03-11", "08:00", "08:45"), &ctx()).unwrap();
            let start = event.start.as_datetime().unwrap();
            assert_eq!(start.offset(), &FixedOffset::east_opt(3600).unwrap());
            assert_eq!(start.hour(), 8);
            assert_eq!(event.title, "Fizyka");
            assert_eq!(event.location.as_deref(), Some("12"));
            assert!(!event.all_day);
            assert!(event.start < event.end);
        }

        #[test]
        fn summer_time_offset() {
            let event = normalize(&lesson(1, "2024-06-03", "08:00", "08:45"), &ctx()).unwrap();
            let start = event.start.as_datetime().unwrap();
            assert_eq!(start.offset(), &FixedOffset::east_opt(7200).unwrap());
        }

        #[test]
        fn nonexistent_local_time_is_dropped() {
            // Clocks jump from 02:00 to 03:00 on 2024-03-31 in Warsaw
            let warning = normalize(&lesson(2, "2024-03-31", "02:30", "03:30"), &ctx()).unwrap_err();
            assert!(matches!(
                warning.reason,
                WarningReason::NonexistentLocalTime(_)
            ));
        }

        #[test]
        fn ambiguous_local_time_takes_earlier_instant() {
            // 02:30 happens twice on 2024-10-27 in Warsaw
            let event = normalize(&lesson(3, "2024-10-27", "02:30", "04:00"), &ctx()).unwrap();
            let start = event.start.as_datetime().unwrap();
            assert_eq!(start.offset(), &FixedOffset::east_opt(7200).unwrap());
        }

        #[test]
        fn empty_interval_is_dropped() {
            let warning = normalize(&lesson(4, "2024-03-11", "09:00", "09:00"), &ctx()).unwrap_err();
            assert_eq!(warning.reason, WarningReason::EmptyInterval);

            let warning = normalize(&lesson(5, "2024-03-11", "10:00", "09:00"), &ctx()).unwrap_err();
            assert_eq!(warning.reason, WarningReason::EmptyInterval);
        }

        #[test]
        fn missing_or_invalid_slot_is_dropped() {
            let raw = record(Feed::Lessons, json!({ "Id": 6, "DateAt": "2024-03-11" }));
            assert_eq!(
                normalize(&raw, &ctx()).unwrap_err().reason,
                WarningReason::MissingField("TimeSlot")
            );

            let warning = normalize(&lesson(7, "2024-03-11", "8 o'clock", "09:00"), &ctx()).unwrap_err();
            assert_eq!(
                warning.reason,
                WarningReason::InvalidTime {
                    field: "TimeSlot.Start",
                    value: "8 o'clock".to_string()
                }
            );
        }

        #[test]
        fn title_falls_back_to_event_text() {
            let raw = record(
                Feed::Lessons,
                json!({
                    "Id": 8,
                    "DateAt": "2024-03-11",
                    "TimeSlot": { "Start": "10:00", "End": "10:45" },
                    "Event": "Wycieczka"
                }),
            );
            assert_eq!(normalize(&raw, &ctx()).unwrap().title, "Wycieczka");

            let bare = record(
                Feed::Lessons,
                json!({ "Id": 9, "DateAt": "2024-03-11", "TimeSlot": { "Start": "10:00", "End": "10:45" } }),
            );
            let event = normalize(&bare, &ctx()).unwrap();
            assert_eq!(event.title, "Lesson");
            assert!(event.location.is_none());
        }
    }

    mod feeds {
        use super::*;

        #[test]
        fn events_sorted_by_start_then_uid() {
            let records = vec![
                lesson(30, "2024-03-12", "08:00", "08:45"),
                lesson(20, "2024-03-11", "09:00", "09:45"),
                lesson(11, "2024-03-11", "08:00", "08:45"),
                lesson(10, "2024-03-11", "08:00", "08:45"),
            ];
            let feed = normalize_feed(Feed::Lessons, &records, &ctx());
            let uids: Vec<&str> = feed.events.iter().map(|e| e.uid.as_str()).collect();
            assert_eq!(uids, vec!["lessons:10", "lessons:11", "lessons:20", "lessons:30"]);
            assert!(feed.warnings.is_empty());
        }

        #[test]
        fn output_does_not_depend_on_input_order() {
            let records = vec![
                record(Feed::Exams, json!({ "Id": 3, "Deadline": "2024-03-14" })),
                record(Feed::Exams, json!({ "Id": 1, "Deadline": "2024-03-12" })),
                record(Feed::Exams, json!({ "Id": 2, "Deadline": "2024-03-12" })),
            ];
            let mut reversed = records.clone();
            reversed.reverse();

            let forward = normalize_feed(Feed::Exams, &records, &ctx());
            let backward = normalize_feed(Feed::Exams, &reversed, &ctx());
            assert_eq!(forward.events, backward.events);
        }

        #[test]
        fn duplicate_ids_keep_the_same_record_in_any_order() {
            let records = vec![
                record(Feed::Homework, json!({ "Id": 1, "Deadline": "2024-03-10" })),
                record(Feed::Homework, json!({ "Id": 1, "Deadline": "2024-03-20" })),
                record(Feed::Homework, json!({ "Id": 2, "Deadline": "2024-03-15" })),
            ];
            let mut reversed = records.clone();
            reversed.reverse();

            let forward = normalize_feed(Feed::Homework, &records, &ctx());
            let backward = normalize_feed(Feed::Homework, &reversed, &ctx());
            assert_eq!(forward.events, backward.events);

            assert_eq!(forward.events.len(), 2);
            assert_eq!(forward.events[1].uid, "homework:1");
            assert_eq!(forward.events[1].start, EventTime::AllDay(date(2024, 3, 20)));
            assert_eq!(forward.warnings.len(), 1);
            assert_eq!(backward.warnings[0].reason, WarningReason::DuplicateId);
        }

        #[test]
        fn bad_records_do_not_affect_the_rest() {
            let records = vec![
                record(Feed::Homework, json!({ "Id": 1, "Deadline": "2024-03-12" })),
                record(Feed::Homework, json!({ "Id": 2 })),
                record(Feed::Exams, json!({ "Id": 3, "Deadline": "2024-03-12" })),
                record(Feed::Homework, json!({ "Id": 1, "Deadline": "2024-03-13" })),
            ];
            let feed = normalize_feed(Feed::Homework, &records, &ctx());

            assert_eq!(feed.events.len(), 1);
            assert_eq!(feed.events[0].uid, "homework:1");
            let reasons: Vec<&WarningReason> = feed.warnings.iter().map(|w| &w.reason).collect();
            assert_eq!(
                reasons,
                vec![
                    &WarningReason::MissingField("Deadline"),
                    &WarningReason::WrongFeed(Feed::Exams),
                    &WarningReason::DuplicateId,
                ]
            );
        }

        #[test]
        fn warning_display() {
            let warning = NormalizationWarning {
                feed: Feed::Lessons,
                record_id: "4".to_string(),
                reason: WarningReason::EmptyInterval,
            };
            assert_eq!(
                warning.to_string(),
                "[lessons] record 4: lesson does not end after it starts"
            );
        }
    }
}
