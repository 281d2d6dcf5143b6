//! LanceDB-backed document store.
//!
//! The store contract is synchronous; this type owns a tokio runtime and
//! blocks on the async LanceDB driver for each call. Rows live in a single
//! table created on first write; each row carries an insertion ordinal
//! (`seq`) so that duplicate species keys and score ties resolve to the
//! earliest row regardless of scan order.
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray, UInt64Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

use plantcare_core::traits::{DocumentStore, Embedder};
use plantcare_core::{species_key, CareDocument, Error, QueryResult, Result};

use crate::schema::build_arrow_schema;
use crate::{check_batch, embedding_text, rank};

pub struct LanceStore { rt: Runtime, db: Connection, table_name: String, embedder: Arc<dyn Embedder> }

impl LanceStore {
	pub fn open(db_path: &Path, table_name: &str, embedder: Arc<dyn Embedder>) -> Result<Self> {
		let rt = Runtime::new().map_err(|e| Error::StoreRead(format!("cannot start runtime: {e}")))?;
		let uri = db_path.to_string_lossy().to_string();
		let db = rt.block_on(async { connect(&uri).execute().await }).map_err(|e| Error::StoreRead(format!("cannot open LanceDB at {uri}: {e}")))?;
		tracing::debug!(uri = %uri, table = table_name, "opened LanceDB store");
		Ok(Self { rt, db, table_name: table_name.to_string(), embedder })
	}

	async fn table(&self) -> lancedb::Result<Option<Table>> {
		if !self.db.table_names().execute().await?.contains(&self.table_name) { return Ok(None); }
		Ok(Some(self.db.open_table(&self.table_name).execute().await?))
	}

	fn docs_to_record_batch(&self, docs: &[CareDocument], vectors: Vec<Vec<f32>>, first_seq: u64) -> Result<RecordBatch> {
		let dim = self.embedder.dim();
		let schema = build_arrow_schema(dim);
		let mut ids = Vec::new(); let mut species = Vec::new(); let mut keys = Vec::new(); let mut texts = Vec::new(); let mut sources = Vec::new(); let mut sections = Vec::new();
		for doc in docs { ids.push(doc.id.clone()); species.push(doc.species.clone()); keys.push(doc.key()); texts.push(doc.text.clone()); sources.push(doc.metadata.source.clone()); sections.push(doc.metadata.section.clone()); }
		if let Some(bad) = vectors.iter().find(|v| v.len() != dim) { return Err(Error::StoreWrite(format!("embedding has {} dims, table expects {}", bad.len(), dim))); }
		let vectors: Vec<Option<Vec<Option<f32>>>> = vectors.into_iter().map(|v| Some(v.into_iter().map(Some).collect())).collect();
		RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(species)),
			Arc::new(StringArray::from(keys)),
			Arc::new(StringArray::from(texts)),
			Arc::new(StringArray::from(sources)),
			Arc::new(StringArray::from(sections)),
			Arc::new(UInt64Array::from_iter_values((first_seq..).take(docs.len()))),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim as i32)),
		]).map_err(|e| Error::StoreWrite(format!("cannot build record batch: {e}")))
	}

	async fn insert_batch(&self, batch: RecordBatch) -> lancedb::Result<()> {
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		match self.table().await? {
			Some(t) => { t.add(reader).execute().await?; }
			None => { self.db.create_table(&self.table_name, reader).execute().await?; }
		}
		Ok(())
	}

	async fn row_count(&self) -> lancedb::Result<usize> {
		match self.table().await? { Some(t) => t.count_rows(None).await, None => Ok(0) }
	}

	async fn scan_species(&self, key: &str) -> lancedb::Result<Vec<RecordBatch>> {
		let Some(t) = self.table().await? else { return Ok(vec![]) };
		let stream = t.query().only_if(format!("species_key = '{}'", escape(key))).execute().await?;
		stream.try_collect().await
	}

	async fn nearest(&self, q: Vec<f32>, limit: usize) -> lancedb::Result<Vec<RecordBatch>> {
		let Some(t) = self.table().await? else { return Ok(vec![]) };
		let stream = t.vector_search(q)?.distance_type(DistanceType::Cosine).limit(limit).execute().await?;
		stream.try_collect().await
	}

	async fn existing_ids(&self, docs: &[CareDocument]) -> lancedb::Result<Vec<String>> {
		let Some(t) = self.table().await? else { return Ok(vec![]) };
		let list = docs.iter().map(|d| format!("'{}'", escape(&d.id))).collect::<Vec<_>>().join(", ");
		let stream = t.query().only_if(format!("id IN ({list})")).execute().await?;
		let batches: Vec<RecordBatch> = stream.try_collect().await?;
		let mut out = Vec::new();
		for batch in &batches {
			if let Some(col) = batch.column_by_name("id").and_then(|c| c.as_any().downcast_ref::<StringArray>()) {
				for i in 0..col.len() { out.push(col.value(i).to_string()); }
			}
		}
		Ok(out)
	}
}

impl DocumentStore for LanceStore {
	fn add(&self, documents: &[CareDocument]) -> Result<()> {
		if documents.is_empty() { return Ok(()); }
		let existing = self.rt.block_on(self.existing_ids(documents)).map_err(|e| Error::StoreWrite(e.to_string()))?;
		check_batch(documents, |id| existing.iter().any(|x| x == id))?;
		let texts: Vec<String> = documents.iter().map(embedding_text).collect();
		let vectors = self.embedder.embed_batch(&texts).map_err(|e| Error::StoreWrite(format!("embedding failed: {e}")))?;
		let first_seq = self.rt.block_on(self.row_count()).map_err(|e| Error::StoreWrite(e.to_string()))? as u64;
		let batch = self.docs_to_record_batch(documents, vectors, first_seq)?;
		self.rt.block_on(self.insert_batch(batch)).map_err(|e| Error::StoreWrite(e.to_string()))?;
		tracing::debug!(added = documents.len(), table = %self.table_name, "lancedb store write");
		Ok(())
	}

	fn count(&self) -> Result<usize> {
		self.rt.block_on(self.row_count()).map_err(|e| Error::StoreRead(e.to_string()))
	}

	fn find_exact(&self, species: &str) -> Result<Option<CareDocument>> {
		let key = species_key(species);
		if key.is_empty() { return Ok(None); }
		let batches = self.rt.block_on(self.scan_species(&key)).map_err(|e| Error::StoreRead(e.to_string()))?;
		let mut rows = Vec::new();
		for batch in &batches { rows.extend(decode_rows(batch)?); }
		Ok(rows.into_iter().min_by_key(|r| r.seq).map(|r| r.doc))
	}

	fn find_similar(&self, query: &str, limit: usize) -> Result<Vec<QueryResult>> {
		if limit == 0 { return Err(Error::StoreRead("similarity limit must be at least 1".into())); }
		let q = self.embedder.embed_one(query).map_err(|e| Error::StoreRead(format!("query embedding failed: {e}")))?;
		if q.iter().all(|x| *x == 0.0) { return Ok(vec![]); }
		let batches = self.rt.block_on(self.nearest(q, limit)).map_err(|e| Error::StoreRead(e.to_string()))?;
		let mut rows = Vec::new();
		for batch in &batches { rows.extend(decode_rows(batch)?); }
		rows.sort_by_key(|r| r.seq);
		let hits = rows.into_iter().map(|r| QueryResult::new(r.doc, r.distance.map_or(0.0, |d| 1.0 - d))).collect();
		Ok(rank(hits, limit))
	}
}

fn escape(s: &str) -> String { s.replace('\'', "''") }

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| Error::StoreRead(format!("column '{name}' missing or not utf8")))
}

struct Row { doc: CareDocument, seq: u64, distance: Option<f32> }

/// Rows as documents with their insertion ordinal and, for vector
/// searches, `_distance`.
fn decode_rows(batch: &RecordBatch) -> Result<Vec<Row>> {
	let ids = string_col(batch, "id")?;
	let species = string_col(batch, "species")?;
	let texts = string_col(batch, "text")?;
	let sources = string_col(batch, "source")?;
	let sections = string_col(batch, "section")?;
	let seqs = batch.column_by_name("seq")
		.and_then(|c| c.as_any().downcast_ref::<UInt64Array>())
		.ok_or_else(|| Error::StoreRead("column 'seq' missing or not uint64".into()))?;
	let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());
	let mut rows = Vec::with_capacity(batch.num_rows());
	for i in 0..batch.num_rows() {
		let section = if sections.is_null(i) { None } else { Some(sections.value(i).to_string()) };
		let doc = CareDocument::new(ids.value(i), species.value(i), texts.value(i), sources.value(i), section);
		rows.push(Row { doc, seq: seqs.value(i), distance: distances.map(|d| d.value(i)) });
	}
	Ok(rows)
}
