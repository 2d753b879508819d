/// Data layer: core types, reading, coercion and derivations.
///
/// Architecture:
/// ```text
///   generated_data/*.csv
///        │
///        ▼
///   ┌──────────┐
///   │  reader   │  parse file → RawTable (header + text rows)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  coerce   │  declared Schema → typed Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  derive   │  top_n / filter_by_key_set / group_by → chart subsets
///   └──────────┘
/// ```

pub mod coerce;
pub mod derive;
pub mod model;
pub mod reader;
