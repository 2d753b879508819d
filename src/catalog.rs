use std::path::{Path, PathBuf};

use crate::data::model::{ColumnType, Schema};

pub const KEYWORDS: &str = "keywords";
pub const CONSUMER: &str = "consumer";
pub const SEARCH_TRENDS: &str = "search_trends";
pub const PREDICTIONS: &str = "predictions";
pub const SALES: &str = "sales";

/// One configured dataset: logical name, file name, declared schema.
#[derive(Debug, Clone)]
pub struct DatasetSpec {
    pub name: String,
    pub file_name: String,
    pub schema: Schema,
}

impl DatasetSpec {
    pub fn new(name: impl Into<String>, file_name: impl Into<String>, schema: Schema) -> Self {
        DatasetSpec {
            name: name.into(),
            file_name: file_name.into(),
            schema,
        }
    }

    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.file_name)
    }

    /// Declared column names, used as the reader's expected header.
    pub fn expected_header(&self) -> Vec<&str> {
        self.schema.names().collect()
    }
}

/// The ordered set of datasets a registry loads.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    specs: Vec<DatasetSpec>,
}

impl Catalog {
    pub fn new(specs: Vec<DatasetSpec>) -> Self {
        Catalog { specs }
    }

    /// The five TrendSense exports.  Numeric columns are declared per column;
    /// any further columns in the files are carried along as text.
    pub fn trendsense() -> Self {
        use ColumnType::*;
        Catalog::new(vec![
            DatasetSpec::new(
                KEYWORDS,
                "trendsense_keywords.csv",
                Schema::new([
                    ("keyword", Text),
                    ("category", Text),
                    ("search_volume", Integer),
                ])
                .allow_extra_text(),
            ),
            DatasetSpec::new(
                CONSUMER,
                "trendsense_consumer_behavior.csv",
                Schema::new(Vec::<(String, ColumnType)>::new()).allow_extra_text(),
            ),
            DatasetSpec::new(
                SEARCH_TRENDS,
                "trendsense_search_trends.csv",
                Schema::new([
                    ("keyword", Text),
                    ("date", Text),
                    ("search_volume", Integer),
                ])
                .allow_extra_text(),
            ),
            DatasetSpec::new(
                PREDICTIONS,
                "trendsense_market_predictions.csv",
                Schema::new([
                    ("keyword", Text),
                    ("category", Text),
                    ("predicted_interest_30d", Real),
                    ("predicted_interest_90d", Real),
                    ("confidence_score", Real),
                ])
                .allow_extra_text(),
            ),
            DatasetSpec::new(
                SALES,
                "trendsense_sales_correlation.csv",
                Schema::new([
                    ("search_volume", Real),
                    ("sales_volume", Real),
                    ("conversion_rate", Real),
                    ("revenue", Real),
                ])
                .allow_extra_text(),
            ),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &DatasetSpec> {
        self.specs.iter()
    }

    pub fn get(&self, name: &str) -> Option<&DatasetSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trendsense_declares_five_datasets() {
        let catalog = Catalog::trendsense();
        let names: Vec<&str> = catalog.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, [KEYWORDS, CONSUMER, SEARCH_TRENDS, PREDICTIONS, SALES]);
        let kw = catalog.get(KEYWORDS).unwrap();
        assert_eq!(kw.schema.column_type("search_volume"), Some(ColumnType::Integer));
        assert_eq!(
            kw.path_in(Path::new("generated_data")),
            Path::new("generated_data/trendsense_keywords.csv")
        );
    }
}
