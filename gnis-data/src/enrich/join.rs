//! Left join of features onto their description and history rows.

use std::collections::HashMap;

use gnis_core::{Table, Value};

use super::{FEATURE_ID, HISTORY_LAYER, column};
use crate::ExportError;

const DESCRIPTION: &str = "description";
const HISTORY: &str = "history";

/// Feature identity normalised across storage types.
///
/// Identifiers arrive as integers, integral reals, or text depending on how
/// a layer was written; all three compare equal when they name the same
/// feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) enum JoinKey {
    Id(i64),
    Text(String),
}

impl JoinKey {
    pub(super) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(id) => Some(Self::Id(*id)),
            Value::Real(id) if id.is_finite() && id.fract() == 0.0 => Some(Self::Id(*id as i64)),
            Value::Text(text) => {
                let text = text.trim();
                Some(
                    text.parse()
                        .map_or_else(|_| Self::Text(text.to_owned()), Self::Id),
                )
            }
            _ => None,
        }
    }
}

/// History rows keyed by feature identity. The first row for a feature wins.
#[derive(Debug)]
pub(super) struct HistoryIndex {
    entries: HashMap<JoinKey, (String, String)>,
}

impl HistoryIndex {
    pub(super) fn build(history: &Table) -> Result<Self, ExportError> {
        let id = column(history, HISTORY_LAYER, FEATURE_ID)?;
        let description = column(history, HISTORY_LAYER, DESCRIPTION)?;
        let narrative = column(history, HISTORY_LAYER, HISTORY)?;

        let mut entries = HashMap::new();
        for row in history.rows() {
            let Some(key) = JoinKey::from_value(&row[id]) else {
                continue;
            };
            entries
                .entry(key)
                .or_insert_with(|| (row[description].to_field(), row[narrative].to_field()));
        }
        Ok(Self { entries })
    }

    /// `Description: ..; History: ..` for a matched feature, otherwise `""`.
    pub(super) fn joined_text(&self, feature_id: &Value) -> String {
        JoinKey::from_value(feature_id)
            .and_then(|key| self.entries.get(&key))
            .map_or_else(String::new, |(description, history)| {
                format!("Description: {description}; History: {history}")
            })
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }
}
