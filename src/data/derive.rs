use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::DeriveError;

use super::model::{Record, Value};

// ---------------------------------------------------------------------------
// Key sets for membership filtering
// ---------------------------------------------------------------------------

/// A set of allowed text values.
pub trait KeySet {
    fn contains_key(&self, value: &str) -> bool;
    fn is_empty_set(&self) -> bool;
}

impl KeySet for BTreeSet<String> {
    fn contains_key(&self, value: &str) -> bool {
        self.contains(value)
    }

    fn is_empty_set(&self) -> bool {
        self.is_empty()
    }
}

impl KeySet for HashSet<String> {
    fn contains_key(&self, value: &str) -> bool {
        self.contains(value)
    }

    fn is_empty_set(&self) -> bool {
        self.is_empty()
    }
}

impl KeySet for [&str] {
    fn contains_key(&self, value: &str) -> bool {
        self.iter().any(|s| *s == value)
    }

    fn is_empty_set(&self) -> bool {
        self.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Derivations
// ---------------------------------------------------------------------------

/// The `n` records with the largest value under `key`, largest first.
///
/// Ties keep their input order (stable sort).  Fails when `key` is missing
/// from a record's schema or is not a numeric column.
pub fn top_n<'a, I>(rows: I, key: &str, n: usize) -> Result<Vec<&'a Record>, DeriveError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut keyed: Vec<(&'a Value, &'a Record)> = Vec::new();
    for rec in rows {
        let ty = rec
            .schema()
            .column_type(key)
            .ok_or_else(|| DeriveError::absent(key))?;
        if !ty.is_numeric() {
            return Err(DeriveError::not_numeric(key));
        }
        let value = rec.get(key).ok_or_else(|| DeriveError::absent(key))?;
        keyed.push((value, rec));
    }

    // Coerced numeric columns always compare; the fallback is unreachable for
    // well-formed datasets.
    keyed.sort_by(|(a, _), (b, _)| b.numeric_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    Ok(keyed.into_iter().take(n).map(|(_, rec)| rec).collect())
}

/// Records whose value under `key`, rendered as text, is in `allowed`.
/// Input order is kept; an empty `allowed` set yields nothing.
pub fn filter_by_key_set<'a, I, S>(
    rows: I,
    key: &str,
    allowed: &S,
) -> Result<Vec<&'a Record>, DeriveError>
where
    I: IntoIterator<Item = &'a Record>,
    S: KeySet + ?Sized,
{
    let mut out = Vec::new();
    for rec in rows {
        let value = rec.get(key).ok_or_else(|| DeriveError::absent(key))?;
        if !allowed.is_empty_set() && allowed.contains_key(&value.as_text()) {
            out.push(rec);
        }
    }
    Ok(out)
}

/// The values under `key` in row order.
pub fn column_values<'a, I>(rows: I, key: &str) -> Result<Vec<&'a Value>, DeriveError>
where
    I: IntoIterator<Item = &'a Record>,
{
    rows.into_iter()
        .map(|rec| rec.get(key).ok_or_else(|| DeriveError::absent(key)))
        .collect()
}

/// Partition records by their value under `key`.
///
/// Groups appear in order of first occurrence and each keeps its records in
/// input order.
pub fn group_by<'a, I>(rows: I, key: &str) -> Result<Groups<'a>, DeriveError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut groups = Groups::default();
    for rec in rows {
        let value = rec.get(key).ok_or_else(|| DeriveError::absent(key))?;
        groups.push(value, rec);
    }
    Ok(groups)
}

// ---------------------------------------------------------------------------
// Groups – insertion-ordered result of group_by
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Groups<'a> {
    entries: Vec<(&'a Value, Vec<&'a Record>)>,
    index: HashMap<&'a Value, usize>,
}

impl<'a> Groups<'a> {
    fn push(&mut self, value: &'a Value, rec: &'a Record) {
        match self.index.get(value) {
            Some(&i) => self.entries[i].1.push(rec),
            None => {
                self.index.insert(value, self.entries.len());
                self.entries.push((value, vec![rec]));
            }
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, value: &Value) -> Option<&[&'a Record]> {
        self.index.get(value).map(|&i| self.entries[i].1.as_slice())
    }

    /// Distinct keys in first-occurrence order.
    pub fn keys(&self) -> impl Iterator<Item = &'a Value> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a Value, &[&'a Record])> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

impl<'a> IntoIterator for Groups<'a> {
    type Item = (&'a Value, Vec<&'a Record>);
    type IntoIter = std::vec::IntoIter<(&'a Value, Vec<&'a Record>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::coerce::coerce;
    use crate::data::model::{ColumnType, Dataset, Schema};
    use crate::data::reader::parse_table;

    fn keywords(text: &str) -> Dataset {
        let schema = Schema::new([
            ("keyword", ColumnType::Text),
            ("search_volume", ColumnType::Integer),
        ]);
        let raw = parse_table(Path::new("keywords.csv"), text.as_bytes()).unwrap();
        coerce("keywords", raw, &schema).unwrap()
    }

    fn trends() -> Dataset {
        let schema = Schema::new([
            ("keyword", ColumnType::Text),
            ("date", ColumnType::Text),
            ("search_volume", ColumnType::Integer),
        ]);
        let text = "keyword,date,search_volume\nX,d1,1\nX,d2,2\nY,d1,3\n";
        let raw = parse_table(Path::new("trends.csv"), text.as_bytes()).unwrap();
        coerce("search_trends", raw, &schema).unwrap()
    }

    fn names(rows: &[&Record]) -> Vec<String> {
        rows.iter()
            .map(|r| r.get("keyword").unwrap().to_string())
            .collect()
    }

    #[test]
    fn top_n_breaks_ties_by_input_order() {
        let ds = keywords("keyword,search_volume\nA,50\nB,90\nC,90\nD,10\n");
        let top = top_n(ds.rows(), "search_volume", 2).unwrap();
        assert_eq!(names(&top), ["B", "C"]);
    }

    #[test]
    fn top_n_with_more_than_available() {
        let ds = keywords("keyword,search_volume\nA,5\nB,7\n");
        let top = top_n(ds.rows(), "search_volume", 10).unwrap();
        assert_eq!(names(&top), ["B", "A"]);
        assert!(top_n(ds.rows(), "search_volume", 0).unwrap().is_empty());
    }

    #[test]
    fn top_n_is_idempotent_and_keeps_identity() {
        let ds = keywords("keyword,search_volume\nA,3\nB,9\nC,3\nD,9\nE,1\n");
        let once = top_n(ds.rows(), "search_volume", 3).unwrap();
        let twice = top_n(once.iter().copied(), "search_volume", 3).unwrap();
        assert_eq!(names(&once), ["B", "D", "A"]);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert!(std::ptr::eq(*a, *b));
        }
        for rec in &once {
            assert!(ds.rows().iter().any(|r| std::ptr::eq(r, *rec)));
        }
    }

    #[test]
    fn top_n_rejects_text_and_missing_keys() {
        let ds = keywords("keyword,search_volume\nA,1\n");
        assert!(matches!(
            top_n(ds.rows(), "keyword", 1),
            Err(DeriveError::InvalidKey { .. })
        ));
        assert!(matches!(
            top_n(ds.rows(), "volume", 1),
            Err(DeriveError::InvalidKey { .. })
        ));
    }

    #[test]
    fn filter_with_empty_set_is_empty() {
        let ds = trends();
        let none: BTreeSet<String> = BTreeSet::new();
        assert!(filter_by_key_set(ds.rows(), "keyword", &none).unwrap().is_empty());
    }

    #[test]
    fn filter_with_all_values_keeps_everything_in_order() {
        let ds = trends();
        let all: HashSet<String> = ["X".to_string(), "Y".to_string()].into_iter().collect();
        let kept = filter_by_key_set(ds.rows(), "keyword", &all).unwrap();
        assert_eq!(kept.len(), ds.len());
        for (a, b) in kept.iter().zip(ds.rows()) {
            assert!(std::ptr::eq(*a, b));
        }
    }

    #[test]
    fn filter_matches_numbers_by_text() {
        let ds = trends();
        let kept = filter_by_key_set(ds.rows(), "search_volume", ["2", "3"].as_slice()).unwrap();
        assert_eq!(names(&kept), ["X", "Y"]);
    }

    #[test]
    fn group_by_keeps_first_occurrence_order() {
        let ds = trends();
        let groups = group_by(ds.rows(), "keyword").unwrap();
        let keys: Vec<String> = groups.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["X", "Y"]);

        let x = groups.get(&Value::from("X")).unwrap();
        let dates: Vec<String> = x.iter().map(|r| r.get("date").unwrap().to_string()).collect();
        assert_eq!(dates, ["d1", "d2"]);
        assert_eq!(groups.get(&Value::from("Y")).unwrap().len(), 1);
    }

    #[test]
    fn group_by_is_a_partition() {
        let ds = keywords("keyword,search_volume\nA,1\nB,2\nA,3\nC,1\nB,5\n");
        let groups = group_by(ds.rows(), "keyword").unwrap();
        let mut seen: Vec<*const Record> = groups
            .into_iter()
            .flat_map(|(_, recs)| recs)
            .map(|r| r as *const Record)
            .collect();
        seen.sort();
        let mut all: Vec<*const Record> = ds.rows().iter().map(|r| r as *const Record).collect();
        all.sort();
        assert_eq!(seen, all);
    }

    #[test]
    fn top_keywords_feed_trend_filter() {
        let ds = keywords("keyword,search_volume\nX,10\nY,1\nZ,7\n");
        let top = top_n(ds.rows(), "search_volume", 2).unwrap();
        let wanted: BTreeSet<String> = column_values(top.iter().copied(), "keyword")
            .unwrap()
            .into_iter()
            .map(|v| v.as_text().into_owned())
            .collect();
        let tr = trends();
        let kept = filter_by_key_set(tr.rows(), "keyword", &wanted).unwrap();
        assert_eq!(names(&kept), ["X", "X"]);
    }
}
