//! Post-processing pipeline and public entry points.
//!
//! Raw results from either backend pass through the same steps:
//! normalization, column type mapping, and packaging.

mod column_types;
mod executor;
mod normalize;
mod result;

pub use column_types::{
    infer_value_type, map_column_types, map_declared_type, ColumnTypeDescriptor, SemanticType,
    TypeFidelity,
};
pub use executor::{
    execute, execute_with, failure_reason, get_runner, options_schema, options_schema_json,
    test_connection, ConnectionStatus, OptionKind, OptionSpec, Runner, CONNECTION_TEST_SQL,
};
pub use normalize::{normalize_rows, normalize_value};
pub use result::{NormalizedResult, ResultMetadata, RowBatches};
