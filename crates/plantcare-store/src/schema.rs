use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Arrow layout of the care-document table. `seq` is the insertion ordinal
/// used to order rows that the engine may return in any order; `vector`
/// width follows the embedder the store was opened with.
pub fn build_arrow_schema(dim: usize) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("species", DataType::Utf8, false),
		Field::new("species_key", DataType::Utf8, false),
		Field::new("text", DataType::Utf8, false),
		Field::new("source", DataType::Utf8, false),
		Field::new("section", DataType::Utf8, true),
		Field::new("seq", DataType::UInt64, false),
		Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32), true),
	]))
}
