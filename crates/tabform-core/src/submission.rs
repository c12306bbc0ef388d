//! Extraction of a flat submission from form-encoded pairs.

use crate::store::Record;

/// Collect pairs named `option_id[field_id]` into a submission record.
///
/// Other names are ignored. A repeated name keeps its first position and its last
/// value, so a checked checkbox overrides the hidden empty input posted before it.
#[must_use]
pub fn collect_submission<I, K, V>(option_id: &str, pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut record = Record::new();
    for (name, value) in pairs {
        if let Some(field_id) = field_id_of(option_id, name.as_ref()) {
            record.insert(field_id.to_string(), value.into());
        }
    }
    record
}

fn field_id_of<'n>(option_id: &str, name: &'n str) -> Option<&'n str> {
    let field_id = name
        .strip_prefix(option_id)?
        .strip_prefix('[')?
        .strip_suffix(']')?;
    (!field_id.is_empty() && !field_id.contains(['[', ']'])).then_some(field_id)
}
