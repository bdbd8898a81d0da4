use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

/// Fixed class-id to human-readable label table, supplied by the model.
///
/// The table is built once at startup. An id the table does not know is an
/// error for that frame only; the loop skips the frame and continues.
#[derive(Clone, Debug)]
pub struct LabelTable {
    labels: BTreeMap<u32, String>,
}

impl LabelTable {
    /// Build a table from labels in class-id order (index = class id).
    pub fn from_names<S: Into<String>>(names: Vec<S>) -> Self {
        Self {
            labels: names
                .into_iter()
                .enumerate()
                .map(|(id, name)| (id as u32, name.into()))
                .collect(),
        }
    }

    /// Resolve a class id to its label.
    pub fn resolve(&self, class_id: u32) -> Result<&str> {
        self.labels
            .get(&class_id)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("unknown class id {} (known: 0..{})", class_id, self.labels.len()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelTable {
    /// The original belt model's two quality classes.
    fn default() -> Self {
        Self::from_names(vec!["Mal Estado", "Buen Estado"])
    }
}
