//! Raw Iris records.
//!
//! Wire models for the three feed endpoints and for account discovery, as
//! returned inside the Iris response envelope. Only the fields the
//! normalizer uses are modelled; unknown fields are ignored.
//!
//! The three record shapes differ, so they are carried as the tagged
//! variant [`RawRecord`] and dispatched explicitly by the normalizer.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use eduvulcan_core::Feed;

/// A record identifier; Iris sends numbers, some proxies send strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum IrisId {
    Number(i64),
    Text(String),
}

impl fmt::Display for IrisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A date as sent by Iris, optionally with a local time of day.
///
/// Accepted forms: `"2024-03-10"`, `"2024-03-10 12:00[:00]"`,
/// `"2024-03-10T12:00:00"`, RFC 3339, or an object
/// `{"Date": "2024-03-10", "Time": "12:00"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IrisDateRepr")]
pub struct IrisDate {
    /// The calendar date, as seen locally at the school.
    pub date: NaiveDate,
    /// The local time of day, if one was sent.
    pub time: Option<NaiveTime>,
}

impl IrisDate {
    /// Creates a date without a time component.
    pub fn from_date(date: NaiveDate) -> Self {
        Self { date, time: None }
    }

    /// Parses the textual forms accepted on the wire.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Some(Self::from_date(date));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            let local = dt.naive_local();
            return Some(Self {
                date: local.date(),
                time: Some(local.time()),
            });
        }
        for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Some(Self {
                    date: dt.date(),
                    time: Some(dt.time()),
                });
            }
        }
        None
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IrisDateRepr {
    Text(String),
    Object {
        #[serde(rename = "Date")]
        date: String,
        #[serde(rename = "Time", default)]
        time: Option<String>,
    },
}

impl TryFrom<IrisDateRepr> for IrisDate {
    type Error = String;

    fn try_from(repr: IrisDateRepr) -> Result<Self, Self::Error> {
        match repr {
            IrisDateRepr::Text(text) => {
                IrisDate::parse(&text).ok_or_else(|| format!("unrecognized date: {}", text))
            }
            IrisDateRepr::Object { date, time } => {
                let mut parsed =
                    IrisDate::parse(&date).ok_or_else(|| format!("unrecognized date: {}", date))?;
                if let Some(time) = time.as_deref().and_then(parse_time) {
                    parsed.time = Some(time);
                }
                Ok(parsed)
            }
        }
    }
}

/// Parses a local time of day (`HH:MM` or `HH:MM:SS`).
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// A school subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subject {
    pub name: Option<String>,
}

/// A classroom.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Room {
    pub code: Option<String>,
}

/// The period a lesson occupies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSlot {
    /// Local start time, e.g. `"08:00"`.
    pub start: Option<String>,
    /// Local end time, e.g. `"08:45"`.
    pub end: Option<String>,
    /// Preformatted range, e.g. `"08:00-08:45"`.
    pub display: Option<String>,
}

/// A teacher or other staff member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Employee {
    pub display_name: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
}

impl Employee {
    /// The name to show, preferring the display name.
    pub fn full_name(&self) -> Option<String> {
        if let Some(display) = self.display_name.as_deref().filter(|s| !s.trim().is_empty()) {
            return Some(display.trim().to_string());
        }
        let parts: Vec<&str> = [self.name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// A school class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Clazz {
    pub symbol: Option<String>,
}

/// A class group split (language groups, PE groups, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Distribution {
    pub name: Option<String>,
    pub shortcut: Option<String>,
}

/// A timetable entry from `mobile/schedule/withchanges/byPupil`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LessonRecord {
    pub id: IrisId,
    pub date_at: Option<IrisDate>,
    pub time_slot: Option<TimeSlot>,
    pub subject: Option<Subject>,
    pub room: Option<Room>,
    /// Free-text event shown instead of a subject (trips, assemblies).
    pub event: Option<String>,
    pub teacher_primary: Option<Employee>,
    pub teacher_secondary: Option<Employee>,
    pub clazz: Option<Clazz>,
    pub distribution: Option<Distribution>,
}

/// A homework attachment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    pub name: Option<String>,
    pub link: Option<String>,
}

/// A homework assignment from `mobile/homework/byPupil`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HomeworkRecord {
    pub id: IrisId,
    pub subject: Option<Subject>,
    pub content: Option<String>,
    /// When the homework is due.
    pub deadline: Option<IrisDate>,
    /// The lesson the homework was given in.
    pub date: Option<IrisDate>,
    pub creator: Option<Employee>,
    pub is_answer_required: Option<bool>,
    pub answer_at: Option<IrisDate>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A test or quiz from `mobile/exam/byPupil`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExamRecord {
    pub id: IrisId,
    pub subject: Option<Subject>,
    /// Exam kind as named by the school ("Sprawdzian", "Kartkówka", ...).
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub content: Option<String>,
    pub deadline: Option<IrisDate>,
    pub creator: Option<Employee>,
}

/// One upstream record of any feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Lesson(LessonRecord),
    Homework(HomeworkRecord),
    Exam(ExamRecord),
}

impl RawRecord {
    /// Decodes one envelope item as a record of `feed`.
    pub fn decode(feed: Feed, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match feed {
            Feed::Lessons => Self::Lesson(serde_json::from_value(value)?),
            Feed::Homework => Self::Homework(serde_json::from_value(value)?),
            Feed::Exams => Self::Exam(serde_json::from_value(value)?),
        })
    }

    /// The feed this record belongs to.
    pub fn feed(&self) -> Feed {
        match self {
            Self::Lesson(_) => Feed::Lessons,
            Self::Homework(_) => Feed::Homework,
            Self::Exam(_) => Feed::Exams,
        }
    }

    /// The upstream record id.
    pub fn id(&self) -> &IrisId {
        match self {
            Self::Lesson(r) => &r.id,
            Self::Homework(r) => &r.id,
            Self::Exam(r) => &r.id,
        }
    }
}

/// The response envelope wrapping every Iris payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EnvelopeResponse<T> {
    pub status: Option<EnvelopeStatus>,
    pub envelope: Option<T>,
}

/// Status block of an envelope; code 0 means success.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EnvelopeStatus {
    pub code: i64,
    pub message: Option<String>,
}

/// An entry from `mobile/register/hebe`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AccountRecord {
    pub unit: UnitRecord,
    pub pupil: PupilRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UnitRecord {
    pub name: Option<String>,
    pub short: Option<String>,
    #[serde(rename = "RestURL")]
    pub rest_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PupilRecord {
    pub id: i64,
    pub first_name: Option<String>,
    pub surname: Option<String>,
}

/// The pupil account the token gives access to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Pupil id, scoping every feed query.
    pub pupil_id: i64,
    /// Pupil first name and surname.
    pub pupil_name: String,
    /// School unit name.
    pub unit_name: Option<String>,
    /// School unit short name.
    pub unit_short: Option<String>,
    /// REST root of the school unit, when it differs from the tenant default.
    pub rest_url: Option<String>,
}

impl From<AccountRecord> for Account {
    fn from(record: AccountRecord) -> Self {
        let pupil_name = [record.pupil.first_name, record.pupil.surname]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            pupil_id: record.pupil.id,
            pupil_name,
            unit_name: record.unit.name,
            unit_short: record.unit.short,
            rest_url: record.unit.rest_url.filter(|u| !u.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_date_forms() {
        assert_eq!(IrisDate::parse("2024-03-10"), Some(IrisDate::from_date(date(2024, 3, 10))));

        let with_time = IrisDate::parse("2024-03-10 12:30:00").unwrap();
        assert_eq!(with_time.date, date(2024, 3, 10));
        assert_eq!(with_time.time, NaiveTime::from_hms_opt(12, 30, 0));

        let short_time = IrisDate::parse("2024-03-10 07:05").unwrap();
        assert_eq!(short_time.time, NaiveTime::from_hms_opt(7, 5, 0));

        // Local date is kept as sent, not converted to UTC
        let rfc = IrisDate::parse("2024-03-10T00:30:00+01:00").unwrap();
        assert_eq!(rfc.date, date(2024, 3, 10));

        assert_eq!(IrisDate::parse("10.03.2024"), None);
    }

    #[test]
    fn decodes_date_object() {
        let parsed: IrisDate =
            serde_json::from_value(json!({ "Date": "2024-03-10", "Time": "08:00", "Timestamp": 1 }))
                .unwrap();
        assert_eq!(parsed.date, date(2024, 3, 10));
        assert_eq!(parsed.time, NaiveTime::from_hms_opt(8, 0, 0));
    }

    #[test]
    fn rejects_bad_date() {
        let parsed: Result<IrisDate, _> = serde_json::from_value(json!("someday"));
        assert!(parsed.is_err());
    }

    #[test]
    fn decodes_lesson() {
        let value = json!({
            "Id": 981,
            "DateAt": "2024-03-11",
            "TimeSlot": { "Start": "08:00", "End": "08:45", "Display": "08:00-08:45", "Position": 1 },
            "Subject": { "Id": 5, "Name": "Matematyka", "Kod": "mat" },
            "Room": { "Id": 2, "Code": "12" },
            "TeacherPrimary": { "DisplayName": "Anna Nowak" },
            "Clazz": { "Symbol": "3A" }
        });
        let record = RawRecord::decode(Feed::Lessons, value).unwrap();
        assert_eq!(record.feed(), Feed::Lessons);
        assert_eq!(record.id().to_string(), "981");
        let RawRecord::Lesson(lesson) = record else {
            panic!("expected lesson");
        };
        assert_eq!(lesson.room.unwrap().code.as_deref(), Some("12"));
        assert_eq!(lesson.time_slot.unwrap().start.as_deref(), Some("08:00"));
        assert!(lesson.teacher_secondary.is_none());
    }

    #[test]
    fn decodes_homework_with_string_id() {
        let value = json!({
            "Id": "42",
            "Subject": { "Name": "Math" },
            "Deadline": { "Date": "2024-03-10" },
            "IsAnswerRequired": true
        });
        let RawRecord::Homework(homework) = RawRecord::decode(Feed::Homework, value).unwrap() else {
            panic!("expected homework");
        };
        assert_eq!(homework.id, IrisId::Text("42".to_string()));
        assert_eq!(homework.deadline.unwrap().date, date(2024, 3, 10));
        assert!(homework.attachments.is_empty());
    }

    #[test]
    fn decodes_exam_type() {
        let value = json!({ "Id": 7, "Type": "Kartkówka", "Deadline": "2024-03-12" });
        let RawRecord::Exam(exam) = RawRecord::decode(Feed::Exams, value).unwrap() else {
            panic!("expected exam");
        };
        assert_eq!(exam.kind.as_deref(), Some("Kartkówka"));
    }

    #[test]
    fn missing_id_fails_decode() {
        assert!(RawRecord::decode(Feed::Exams, json!({ "Type": "Test" })).is_err());
    }

    #[test]
    fn employee_name_fallback() {
        let employee = Employee {
            display_name: Some(" ".to_string()),
            name: Some("Anna".to_string()),
            surname: Some("Nowak".to_string()),
        };
        assert_eq!(employee.full_name().as_deref(), Some("Anna Nowak"));

        let nobody = Employee {
            display_name: None,
            name: None,
            surname: None,
        };
        assert_eq!(nobody.full_name(), None);
    }

    #[test]
    fn account_from_record() {
        let envelope: EnvelopeResponse<Vec<AccountRecord>> = serde_json::from_value(json!({
            "Status": { "Code": 0, "Message": "OK" },
            "Envelope": [{
                "Unit": { "Id": 1, "Short": "SP1", "Name": "Szkoła Podstawowa nr 1", "RestURL": "https://example.test/vulcan/000001/api" },
                "Pupil": { "Id": 1234, "FirstName": "Jan", "Surname": "Kowalski" }
            }]
        }))
        .unwrap();

        let account = Account::from(envelope.envelope.unwrap().remove(0));
        assert_eq!(account.pupil_id, 1234);
        assert_eq!(account.pupil_name, "Jan Kowalski");
        assert_eq!(account.unit_short.as_deref(), Some("SP1"));
        assert_eq!(account.rest_url.as_deref(), Some("https://example.test/vulcan/000001/api"));
    }
}
