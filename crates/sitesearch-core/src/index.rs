//! Full-text index over a crawled corpus, backed by Tantivy.
//!
//! Every document in the corpus becomes one Tantivy document with a text
//! field per hierarchy level (`l_0`, `l_1`, …), a `text` field for the body,
//! and the document's position in the corpus as `id`. Fields are analyzed
//! with a simple word tokenizer and lowercasing; stemming is opt-in, so by
//! default indexed tokens match query terms literally.
//!
//! The built index is exported as an [`IndexBlob`]: the index directory's
//! files, base64-encoded, plus the analyzer settings needed to read them back.
//! Loading materializes the files into a [`RamDirectory`], so serving never
//! touches the filesystem.
//!
//! Queries are whitespace-separated terms. A trailing `*` makes a term a
//! prefix match. Prefix terms are expanded against the term dictionary into
//! ordinary term queries, so expanded matches are scored like exact ones.

use crate::types::{Corpus, FieldMatches, MatchData, MatchSpan};
use crate::{Error, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::directory::RamDirectory;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, STORED, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer, TokenStream,
};
use tantivy::{Directory, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use tempfile::TempDir;
use tracing::{debug, info};

/// Name of the body text field.
pub const TEXT_FIELD: &str = "text";

/// Name of the stored corpus position.
const ID_FIELD: &str = "id";

/// Name under which the analyzer is registered.
const TOKENIZER_NAME: &str = "sitesearch";

/// Tokens longer than this are dropped.
const MAX_TOKEN_LEN: usize = 40;

/// Upper bound on dictionary terms a single prefix expands to, per field.
const MAX_PREFIX_EXPANSIONS: usize = 64;

const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Name of the index field for hierarchy level `level`.
pub fn level_field_name(level: usize) -> String {
    format!("l_{level}")
}

/// Serialized index directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexBlob {
    /// Whether the analyzer stems tokens.
    pub stemming: bool,
    /// Index files by name, base64-encoded.
    pub files: BTreeMap<String, String>,
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    /// Position of the matched document in the corpus.
    pub doc: usize,
    /// Relevance score; higher is better.
    pub score: f32,
    /// Match spans keyed by indexed term, then field.
    pub matches: MatchData,
}

/// One analyzed query term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct QueryTerm {
    text: String,
    prefix: bool,
}

impl QueryTerm {
    fn matches(&self, token: &str) -> bool {
        if self.prefix {
            token.starts_with(&self.text)
        } else {
            token == self.text
        }
    }
}

fn analyzer(stemming: bool) -> TextAnalyzer {
    let builder = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser);
    if stemming {
        builder.filter(Stemmer::new(Language::English)).build()
    } else {
        builder.build()
    }
}

/// Tokens of `text` with their byte offsets.
fn tokens(analyzer: &mut TextAnalyzer, text: &str) -> Vec<(String, usize, usize)> {
    let mut stream = analyzer.token_stream(text);
    let mut out = Vec::new();
    while stream.advance() {
        let token = stream.token();
        out.push((token.text.clone(), token.offset_from, token.offset_to));
    }
    out
}

fn build_schema(level_names: &[String]) -> Schema {
    let text_options = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER_NAME)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();

    let mut schema_builder = Schema::builder();
    schema_builder.add_u64_field(ID_FIELD, STORED);
    for name in level_names {
        schema_builder.add_text_field(name, text_options.clone());
    }
    schema_builder.add_text_field(TEXT_FIELD, text_options);
    schema_builder.build()
}

/// A loaded, queryable index.
pub struct SiteIndex {
    reader: IndexReader,
    analyzer: TextAnalyzer,
    id_field: Field,
    /// Searchable fields with their names: levels first, then body text.
    fields: Vec<(String, Field)>,
}

impl SiteIndex {
    /// Index `corpus` and export the result.
    ///
    /// `level_names` lists the hierarchy fields; document hierarchies longer
    /// than that list are truncated, shorter ones leave fields empty.
    pub fn build(corpus: &Corpus, level_names: &[String], stemming: bool) -> Result<IndexBlob> {
        let dir = TempDir::new()?;
        let schema = build_schema(level_names);

        let index = Index::create_in_dir(dir.path(), schema.clone())
            .map_err(|e| Error::Index(format!("Failed to create index: {e}")))?;
        index.tokenizers().register(TOKENIZER_NAME, analyzer(stemming));

        let id_field = field(&schema, ID_FIELD)?;
        let text_field = field(&schema, TEXT_FIELD)?;
        let level_fields = level_names
            .iter()
            .map(|name| field(&schema, name))
            .collect::<Result<Vec<_>>>()?;

        let mut writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_MEMORY_BYTES)
            .map_err(|e| Error::Index(format!("Failed to create writer: {e}")))?;

        for (id, document) in corpus.iter().enumerate() {
            let mut doc = TantivyDocument::default();
            doc.add_u64(id_field, id as u64);
            for (level_field, value) in level_fields.iter().zip(&document.hierarchy) {
                if let Some(value) = value {
                    doc.add_text(*level_field, value);
                }
            }
            doc.add_text(text_field, &document.text);

            writer
                .add_document(doc)
                .map_err(|e| Error::Index(format!("Failed to add document: {e}")))?;
        }

        writer
            .commit()
            .map_err(|e| Error::Index(format!("Failed to commit: {e}")))?;
        writer
            .wait_merging_threads()
            .map_err(|e| Error::Index(format!("Failed to finish merges: {e}")))?;

        let files = export_files(dir.path())?;
        info!("Indexed {} documents into {} files", corpus.len(), files.len());

        Ok(IndexBlob { stemming, files })
    }

    /// Load an exported index into memory.
    pub fn load(blob: &IndexBlob, level_names: &[String]) -> Result<Self> {
        let directory = RamDirectory::create();
        for (name, data) in &blob.files {
            let bytes = STANDARD
                .decode(data)
                .map_err(|e| Error::Index(format!("Corrupt index file '{name}': {e}")))?;
            directory.atomic_write(Path::new(name), &bytes)?;
        }

        let index = Index::open(directory)
            .map_err(|e| Error::Index(format!("Failed to open index: {e}")))?;
        let analyzer = analyzer(blob.stemming);
        index.tokenizers().register(TOKENIZER_NAME, analyzer.clone());

        let schema = index.schema();
        let id_field = field(&schema, ID_FIELD)?;
        let mut fields = level_names
            .iter()
            .map(|name| field(&schema, name).map(|f| (name.clone(), f)))
            .collect::<Result<Vec<_>>>()?;
        fields.push((TEXT_FIELD.to_string(), field(&schema, TEXT_FIELD)?));

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::Index(format!("Failed to create reader: {e}")))?;

        debug!("Loaded index with {} fields", fields.len());

        Ok(Self {
            reader,
            analyzer,
            id_field,
            fields,
        })
    }

    /// Run `query` and return at most `limit` hits, best first.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<IndexHit>> {
        let mut analyzer = self.analyzer.clone();
        let terms = parse_query(&mut analyzer, query);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (_, field) in &self.fields {
            for term in &terms {
                for text in expand(&searcher, *field, term)? {
                    let term = Term::from_field_text(*field, &text);
                    clauses.push((
                        Occur::Should,
                        Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)),
                    ));
                }
            }
        }

        if clauses.is_empty() {
            debug!("No indexed terms for query '{query}'");
            return Ok(Vec::new());
        }

        let top_docs = searcher
            .search(&BooleanQuery::new(clauses), &TopDocs::with_limit(limit))
            .map_err(|e| Error::Index(format!("Search failed: {e}")))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| Error::Index(format!("Failed to retrieve doc: {e}")))?;

            let id = doc
                .get_first(self.id_field)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| Error::Index("Document has no id".into()))?;
            let id = usize::try_from(id)
                .map_err(|_| Error::Index(format!("Document id {id} out of range")))?;

            hits.push(IndexHit {
                doc: id,
                score,
                matches: self.match_positions(&mut analyzer, &doc, &terms),
            });
        }

        debug!("Found {} hits for query '{query}'", hits.len());
        Ok(hits)
    }

    /// Character spans of every token in `doc` matched by `terms`.
    fn match_positions(
        &self,
        analyzer: &mut TextAnalyzer,
        doc: &TantivyDocument,
        terms: &[QueryTerm],
    ) -> MatchData {
        let mut matches = MatchData::new();
        for (name, field) in &self.fields {
            let Some(text) = doc.get_first(*field).and_then(|v| v.as_str()) else {
                continue;
            };
            for (token, from, to) in tokens(analyzer, text) {
                if terms.iter().any(|term| term.matches(&token)) {
                    let field_matches: &mut FieldMatches = matches.entry(token).or_default();
                    field_matches
                        .entry(name.clone())
                        .or_default()
                        .push(char_span(text, from, to));
                }
            }
        }
        matches
    }
}

fn field(schema: &Schema, name: &str) -> Result<Field> {
    schema
        .get_field(name)
        .map_err(|_| Error::Index(format!("Missing {name} field")))
}

/// Read every index file except Tantivy's lock files.
fn export_files(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(".tantivy-") || !entry.file_type()?.is_file() {
            continue;
        }
        files.insert(name, STANDARD.encode(fs::read(entry.path())?));
    }
    Ok(files)
}

/// Split a raw query into analyzed terms.
///
/// A trailing `*` on a whitespace-separated chunk marks its last token as a
/// prefix. Duplicate terms are dropped.
fn parse_query(analyzer: &mut TextAnalyzer, query: &str) -> Vec<QueryTerm> {
    let mut terms = BTreeSet::new();
    for chunk in query.split_whitespace() {
        let prefix = chunk.ends_with('*');
        let chunk_tokens = tokens(analyzer, chunk.trim_end_matches('*'));
        let last = chunk_tokens.len().saturating_sub(1);
        for (i, (text, _, _)) in chunk_tokens.into_iter().enumerate() {
            terms.insert(QueryTerm {
                text,
                prefix: prefix && i == last,
            });
        }
    }
    terms.into_iter().collect()
}

/// Indexed terms of `field` that `term` matches.
fn expand(searcher: &Searcher, field: Field, term: &QueryTerm) -> Result<Vec<String>> {
    if !term.prefix {
        return Ok(vec![term.text.clone()]);
    }

    let mut expansions = BTreeSet::new();
    for segment in searcher.segment_readers() {
        let inverted = segment
            .inverted_index(field)
            .map_err(|e| Error::Index(format!("Failed to read term dictionary: {e}")))?;
        let mut stream = inverted.terms().range().ge(term.text.as_bytes()).into_stream()?;
        while stream.advance() && expansions.len() < MAX_PREFIX_EXPANSIONS {
            let key = stream.key();
            if !key.starts_with(term.text.as_bytes()) {
                break;
            }
            if let Ok(text) = std::str::from_utf8(key) {
                expansions.insert(text.to_string());
            }
        }
    }
    Ok(expansions.into_iter().collect())
}

/// Convert a byte range of `text` into a character span.
fn char_span(text: &str, from: usize, to: usize) -> MatchSpan {
    let count = |range: &str| range.chars().count();
    let start = text.get(..from).map_or(0, count);
    let length = text.get(from..to).map_or(0, count);
    MatchSpan::new(start, length)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::IndexedDocument;

    fn document(hierarchy: &[Option<&str>], text: &str) -> IndexedDocument {
        IndexedDocument {
            path: "/".to_string(),
            hierarchy: hierarchy.iter().map(|h| h.map(str::to_string)).collect(),
            text: text.to_string(),
            anchor: None,
        }
    }

    fn levels() -> Vec<String> {
        vec![level_field_name(0), level_field_name(1)]
    }

    fn corpus() -> Corpus {
        vec![
            document(&[Some("Guide"), Some("Installation")], "Run the installer and restart."),
            document(&[Some("Guide"), Some("Usage")], "Running searches is fast."),
            document(&[Some("Reference"), None], "Über große Dateien: run install twice."),
        ]
    }

    fn index() -> SiteIndex {
        let blob = SiteIndex::build(&corpus(), &levels(), false).unwrap();
        SiteIndex::load(&blob, &levels()).unwrap()
    }

    #[test]
    fn test_blob_contains_index_files() {
        let blob = SiteIndex::build(&corpus(), &levels(), false).unwrap();
        assert!(blob.files.contains_key("meta.json"));
        assert!(blob.files.keys().all(|name| !name.starts_with(".tantivy-")));

        let json = serde_json::to_string(&blob).unwrap();
        let back: IndexBlob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn test_prefix_query_matches_longer_tokens() {
        let hits = index().search("install*", 10).unwrap();
        let docs: BTreeSet<usize> = hits.iter().map(|hit| hit.doc).collect();
        assert_eq!(docs, BTreeSet::from([0, 2]));

        let first = hits.iter().find(|hit| hit.doc == 0).unwrap();
        assert_eq!(first.matches["installer"]["text"], vec![MatchSpan::new(8, 9)]);
        assert_eq!(first.matches["installation"]["l_1"], vec![MatchSpan::new(0, 12)]);
    }

    #[test]
    fn test_exact_term_does_not_match_prefix() {
        let hits = index().search("run", 10).unwrap();
        let docs: Vec<usize> = hits.iter().map(|hit| hit.doc).collect();
        assert!(docs.contains(&0));
        assert!(docs.contains(&2));
        assert!(!docs.contains(&1), "'Running' is not stemmed to 'run'");
    }

    #[test]
    fn test_match_offsets_count_characters() {
        let hits = index().search("dateien", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc, 2);
        assert_eq!(hits[0].matches["dateien"]["text"], vec![MatchSpan::new(11, 7)]);
    }

    #[test]
    fn test_empty_and_unknown_queries() {
        let index = index();
        assert!(index.search("", 10).unwrap().is_empty());
        assert!(index.search("   * ", 10).unwrap().is_empty());
        assert!(index.search("zebra*", 10).unwrap().is_empty());
    }

    #[test]
    fn test_stemming_is_opt_in() {
        let blob = SiteIndex::build(&corpus(), &levels(), true).unwrap();
        assert!(blob.stemming);
        let index = SiteIndex::load(&blob, &levels()).unwrap();

        let docs: BTreeSet<usize> = index.search("run", 10).unwrap().iter().map(|hit| hit.doc).collect();
        assert!(docs.contains(&1));
    }

    #[test]
    fn test_limit_caps_hits() {
        let hits = index().search("guide* run*", 1).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_parse_query_marks_last_token_as_prefix() {
        let mut analyzer = analyzer(false);
        let terms = parse_query(&mut analyzer, "Foo-Bar* baz foo");
        assert_eq!(
            terms,
            vec![
                QueryTerm { text: "bar".into(), prefix: true },
                QueryTerm { text: "baz".into(), prefix: false },
                QueryTerm { text: "foo".into(), prefix: false },
            ]
        );
    }
}
