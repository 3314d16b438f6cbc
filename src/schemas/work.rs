use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Work, WorkPatternItem, WorkSessionBlock};
use crate::db::types::{FormAccessMode, WorkKind};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PatternItemCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "points must be positive"))]
    pub(crate) points: f64,
    #[serde(default)]
    #[serde(alias = "orderIndex")]
    #[validate(range(min = 0, message = "order_index must be non-negative"))]
    pub(crate) order_index: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SessionBlockCreate {
    #[serde(alias = "blockDate", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) block_date: OffsetDateTime,
    #[validate(range(min = 1, message = "capacity must be positive"))]
    pub(crate) capacity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct WorkCreate {
    #[serde(alias = "moduleId")]
    #[validate(length(min = 1, message = "module_id must not be empty"))]
    pub(crate) module_id: String,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    pub(crate) kind: WorkKind,
    #[serde(default)]
    #[serde(alias = "isQualified")]
    pub(crate) is_qualified: bool,
    #[serde(default)]
    #[serde(alias = "gradeProgramId")]
    pub(crate) grade_program_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "programEntryId")]
    pub(crate) program_entry_id: Option<String>,
    #[serde(alias = "dateStart", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) date_start: OffsetDateTime,
    #[serde(alias = "dateLimit", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) date_limit: OffsetDateTime,
    #[serde(default)]
    #[serde(alias = "formId")]
    pub(crate) form_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "formAccess")]
    pub(crate) form_access: Option<FormAccessMode>,
    #[serde(default)]
    #[serde(alias = "timeAccessSeconds")]
    #[validate(range(min = 1, message = "time_access_seconds must be positive"))]
    pub(crate) time_access_seconds: Option<i32>,
    #[serde(default)]
    #[serde(alias = "patternItems")]
    #[validate(nested)]
    pub(crate) pattern_items: Vec<PatternItemCreate>,
    #[serde(default)]
    #[serde(alias = "sessionBlocks")]
    #[validate(nested)]
    pub(crate) session_blocks: Vec<SessionBlockCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct WorkUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(
        default,
        alias = "dateStart",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) date_start: Option<OffsetDateTime>,
    #[serde(
        default,
        alias = "dateLimit",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) date_limit: Option<OffsetDateTime>,
    #[serde(default)]
    #[serde(alias = "formAccess")]
    pub(crate) form_access: Option<FormAccessMode>,
    #[serde(default)]
    #[serde(alias = "timeAccessSeconds")]
    #[validate(range(min = 1, message = "time_access_seconds must be positive"))]
    pub(crate) time_access_seconds: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PatternItemResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) points: f64,
    pub(crate) order_index: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionBlockResponse {
    pub(crate) id: String,
    pub(crate) block_date: String,
    pub(crate) capacity: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct WorkResponse {
    pub(crate) id: String,
    pub(crate) module_id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) kind: WorkKind,
    pub(crate) is_qualified: bool,
    pub(crate) grade_program_id: Option<String>,
    pub(crate) program_entry_id: Option<String>,
    pub(crate) date_start: String,
    pub(crate) date_limit: String,
    pub(crate) form_id: Option<String>,
    pub(crate) form_access: Option<FormAccessMode>,
    pub(crate) time_access_seconds: Option<i32>,
    pub(crate) is_revised: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) pattern_items: Vec<PatternItemResponse>,
    pub(crate) session_blocks: Vec<SessionBlockResponse>,
}

impl WorkResponse {
    pub(crate) fn from_models(
        work: Work,
        pattern_items: Vec<WorkPatternItem>,
        session_blocks: Vec<WorkSessionBlock>,
    ) -> Self {
        Self {
            id: work.id,
            module_id: work.module_id,
            title: work.title,
            description: work.description,
            kind: work.kind,
            is_qualified: work.is_qualified,
            grade_program_id: work.grade_program_id,
            program_entry_id: work.program_entry_id,
            date_start: format_primitive(work.date_start),
            date_limit: format_primitive(work.date_limit),
            form_id: work.form_id,
            form_access: work.form_access,
            time_access_seconds: work.time_access_seconds,
            is_revised: work.is_revised,
            created_by: work.created_by,
            created_at: format_primitive(work.created_at),
            updated_at: format_primitive(work.updated_at),
            pattern_items: pattern_items
                .into_iter()
                .map(|item| PatternItemResponse {
                    id: item.id,
                    title: item.title,
                    description: item.description,
                    points: item.points,
                    order_index: item.order_index,
                })
                .collect(),
            session_blocks: session_blocks
                .into_iter()
                .map(|block| SessionBlockResponse {
                    id: block.id,
                    block_date: format_primitive(block.block_date),
                    capacity: block.capacity,
                })
                .collect(),
        }
    }
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // Frontend's datetime-local often sends without timezone.
    if raw.len() == 16 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}:00Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

pub(crate) fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) => parse_offset_datetime_flexible(&value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
        None => Ok(None),
    }
}
