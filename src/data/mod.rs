/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv (ISO-8859-1)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse bytes → RepositoryTable (drop incomplete rows)
///   └──────────┘
///        │
///        ▼
///   ┌─────────────────┐
///   │ RepositoryTable │  Vec<RepositoryRecord>, unique values, ranges
///   └─────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply selections → filtered indices
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  group / correlate → Dashboard
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
