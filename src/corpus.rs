//! Corpus driver
//!
//! A [`Treebank`] reads sentences from a string, a file, or many files and
//! hands them out lazily, one sentence at a time. Malformed sentences and
//! unreadable files are logged with `tracing` and skipped.

use crate::builder::{BuildOptions, build_tree};
use crate::grid::{ColumnType, ConfigError, GridFormat, GridReader};
use crate::tiger::{TigerReader, normalize_xml};
use crate::token::Sentence;
use crate::tree::Tree;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors of the corpus driver
#[derive(Debug, Error)]
pub enum TreebankError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to open {path:?}: {source}")]
    FileOpen { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Surface format of a corpus
#[derive(Debug, Clone)]
pub enum CorpusFormat {
    Grid(GridFormat),
    Tiger,
}

impl Default for CorpusFormat {
    fn default() -> Self {
        CorpusFormat::Grid(GridFormat::default())
    }
}

impl CorpusFormat {
    /// Check that the format can supply `columns`; XML always can
    pub fn require(&self, columns: &[ColumnType]) -> Result<(), ConfigError> {
        match self {
            CorpusFormat::Grid(grid) => grid.require(columns),
            CorpusFormat::Tiger => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    String(String),
    File(PathBuf),
    Files(Vec<PathBuf>),
}

/// Collection of sentences from a string, file, or glob pattern
///
/// ```no_run
/// use treebank::{BuildOptions, CorpusFormat, Treebank};
///
/// let corpus = Treebank::from_glob("negra/*.export.gz", CorpusFormat::default()).unwrap();
/// for tree in corpus.parsed_sents(BuildOptions::default()).unwrap() {
///     println!("{tree}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Treebank {
    source: Source,
    format: CorpusFormat,
}

impl Treebank {
    /// Create from in-memory text
    pub fn from_string(text: &str, format: CorpusFormat) -> Self {
        Self {
            source: Source::String(text.to_string()),
            format,
        }
    }

    /// Create from a single file; `.gz` files are decompressed
    pub fn from_file(path: impl AsRef<Path>, format: CorpusFormat) -> Self {
        Self {
            source: Source::File(path.as_ref().to_path_buf()),
            format,
        }
    }

    /// Create from a glob pattern
    ///
    /// Files are processed in sorted order for deterministic results.
    pub fn from_glob(pattern: &str, format: CorpusFormat) -> Result<Self, TreebankError> {
        let mut file_paths: Vec<PathBuf> = glob::glob(pattern)?.filter_map(Result::ok).collect();
        file_paths.sort();
        Ok(Self::from_paths(file_paths, format))
    }

    /// Create from explicit file paths
    pub fn from_paths(file_paths: Vec<PathBuf>, format: CorpusFormat) -> Self {
        Self {
            source: Source::Files(file_paths),
            format,
        }
    }

    pub fn format(&self) -> &CorpusFormat {
        &self.format
    }

    /// Normalized sentences, in corpus order
    pub fn sentences(&self) -> Box<dyn Iterator<Item = Sentence>> {
        match &self.source {
            Source::String(text) => read_sentences(
                &self.format,
                "<string>".to_string(),
                Box::new(Cursor::new(text.clone())),
            ),
            Source::File(path) => open_sentences(&self.format, path.clone()),
            Source::Files(paths) => {
                let format = self.format.clone();
                Box::new(
                    paths
                        .clone()
                        .into_iter()
                        .flat_map(move |path| open_sentences(&format, path)),
                )
            }
        }
    }

    /// Trees of all well-formed sentences
    pub fn parsed_sents(
        &self,
        options: BuildOptions,
    ) -> Result<Box<dyn Iterator<Item = Arc<Tree>>>, ConfigError> {
        self.format
            .require(&[ColumnType::Words, ColumnType::Pos, ColumnType::Parent])?;

        let trees = self
            .sentences()
            .filter_map(move |sentence| match build_tree(&sentence, options) {
                Ok(tree) => Some(Arc::new(tree)),
                Err(reason) => {
                    tracing::warn!(id = ?sentence.id, %reason, "skipping malformed sentence");
                    None
                }
            });
        Ok(Box::new(trees))
    }

    pub fn words(&self) -> Result<Box<dyn Iterator<Item = Vec<String>>>, ConfigError> {
        self.project(&[ColumnType::Words], |s| {
            s.words().into_iter().map(str::to_string).collect()
        })
    }

    pub fn tagged_words(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Vec<(String, String)>>>, ConfigError> {
        self.project(&[ColumnType::Words, ColumnType::Pos], |s| {
            s.tagged_words()
                .into_iter()
                .map(|(word, tag)| (word.to_string(), tag.to_string()))
                .collect()
        })
    }

    pub fn lemmatised_words(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Vec<(String, Option<String>)>>>, ConfigError> {
        self.project(&[ColumnType::Words, ColumnType::Lemma], |s| {
            s.lemmatised_words()
                .into_iter()
                .map(|(word, lemma)| (word.to_string(), lemma.map(str::to_string)))
                .collect()
        })
    }

    pub fn morphological_words(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Vec<(String, Option<String>)>>>, ConfigError> {
        self.project(&[ColumnType::Words, ColumnType::Morph], |s| {
            s.morphological_words()
                .into_iter()
                .map(|(word, morph)| (word.to_string(), morph.map(str::to_string)))
                .collect()
        })
    }

    fn project<T: 'static>(
        &self,
        columns: &[ColumnType],
        f: impl Fn(&Sentence) -> T + 'static,
    ) -> Result<Box<dyn Iterator<Item = T>>, ConfigError> {
        self.format.require(columns)?;
        Ok(Box::new(self.sentences().map(move |s| f(&s))))
    }
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, TreebankError> {
    let file = File::open(path).map_err(|source| TreebankError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Open a file and iterate over its sentences; an unreadable file yields none
fn open_sentences(format: &CorpusFormat, path: PathBuf) -> Box<dyn Iterator<Item = Sentence>> {
    match open_reader(&path) {
        Ok(reader) => read_sentences(format, path.display().to_string(), reader),
        Err(e) => {
            tracing::warn!(error = %e, "skipping file");
            Box::new(iter::empty())
        }
    }
}

fn read_sentences(
    format: &CorpusFormat,
    origin: String,
    reader: Box<dyn BufRead>,
) -> Box<dyn Iterator<Item = Sentence>> {
    match format {
        CorpusFormat::Grid(grid) => {
            let grid = grid.clone();
            let read_origin = origin.clone();
            let blocks = GridReader::new(&grid, reader).map_while(move |block| match block {
                Ok(block) => Some(block),
                Err(e) => {
                    let error = TreebankError::from(e);
                    tracing::warn!(source = %read_origin, %error, "stopped reading");
                    None
                }
            });
            Box::new(blocks.filter_map(move |block| match grid.normalize(&block) {
                Ok(sentence) => Some(sentence),
                Err(reason) => {
                    tracing::warn!(
                        source = %origin,
                        line = block.line_num,
                        id = ?block.id,
                        %reason,
                        "skipping malformed sentence"
                    );
                    None
                }
            }))
        }
        CorpusFormat::Tiger => match TigerReader::new(reader) {
            Ok(elements) => Box::new(elements.enumerate().filter_map(move |(index, xml)| {
                match normalize_xml(&xml) {
                    Ok(sentence) => Some(sentence),
                    Err(reason) => {
                        tracing::warn!(source = %origin, index, %reason, "skipping malformed sentence");
                        None
                    }
                }
            })),
            Err(e) => {
                let error = TreebankError::from(e);
                tracing::warn!(source = %origin, %error, "stopped reading");
                Box::new(iter::empty())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MalformedSentence;

    // Second sentence has a non-numeric parent, third an unknown one
    const GRID: &str = "#BOS 1
The   the   DET 500
house house N   500
is    be    V   501
red   red   ADJ 501
.     --    .   502
#500  --    NP  502
#501  --    VP  502
#502  --    S   0
#EOS 1
#BOS 2
Oops  oops  ITJ abc
#500  --    S   0
#EOS 2
#BOS 3
Hello hello ITJ 777
#500  --    S   0
#EOS 3
";

    const TIGER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<corpus id="mini">
  <body>
    <s id="s1">
      <graph root="s1_500">
        <terminals>
          <t id="s1_1" word="Ja" lemma="ja" pos="ITJ" morph="--"/>
        </terminals>
        <nonterminals>
          <nt id="s1_500" cat="S"><edge label="HD" idref="s1_1"/></nt>
        </nonterminals>
      </graph>
    </s>
    <s id="s2">
      <graph root="s2_500"><terminals/><nonterminals/></graph>
    </s>
  </body>
</corpus>
"#;

    fn house_format() -> CorpusFormat {
        CorpusFormat::Grid(GridFormat::new(&["words", "lemma", "pos", "parent"]).unwrap())
    }

    #[test]
    fn test_sentences_skip_malformed() {
        let sentences: Vec<Sentence> = Treebank::from_string(GRID, house_format())
            .sentences()
            .collect();

        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].id.as_deref(), Some("1"));
        assert_eq!(sentences[1].id.as_deref(), Some("3"));
    }

    #[test]
    fn test_parsed_sents_skip_malformed() {
        let corpus = Treebank::from_string(GRID, house_format());
        let trees: Vec<Arc<Tree>> = corpus.parsed_sents(BuildOptions::default()).unwrap().collect();

        assert_eq!(trees.len(), 1);
        assert_eq!(
            trees[0].to_string(),
            "(S (NP (DET The) (N house)) (VP (V is) (ADJ red)) (. .))"
        );

        // The same sentence fails on its own
        let third = corpus.sentences().nth(1).unwrap();
        assert_eq!(
            build_tree(&third, BuildOptions::default()),
            Err(MalformedSentence::UnknownParent {
                line: 0,
                parent: 777
            })
        );
    }

    #[test]
    fn test_projections() {
        let corpus = Treebank::from_string(GRID, house_format());

        let words: Vec<Vec<String>> = corpus.words().unwrap().collect();
        assert_eq!(words[0], vec!["The", "house", "is", "red", "."]);

        let tagged: Vec<_> = corpus.tagged_words().unwrap().collect();
        assert_eq!(tagged[1], vec![("Hello".to_string(), "ITJ".to_string())]);

        let lemmas: Vec<_> = corpus.lemmatised_words().unwrap().collect();
        assert_eq!(lemmas[0][4], (".".to_string(), Some("--".to_string())));

        assert!(matches!(
            corpus.morphological_words(),
            Err(ConfigError::MissingColumn(ColumnType::Morph))
        ));
    }

    #[test]
    fn test_parsed_sents_need_parents() {
        let format = CorpusFormat::Grid(GridFormat::new(&["words", "pos"]).unwrap());
        let result = Treebank::from_string("", format).parsed_sents(BuildOptions::default());
        assert!(matches!(
            result,
            Err(ConfigError::MissingColumn(ColumnType::Parent))
        ));
    }

    #[test]
    fn test_tiger_corpus() {
        let corpus = Treebank::from_string(TIGER, CorpusFormat::Tiger);

        let sentences: Vec<Sentence> = corpus.sentences().collect();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].id.as_deref(), Some("s1"));

        let morph: Vec<_> = corpus.morphological_words().unwrap().collect();
        assert_eq!(morph[0], vec![("Ja".to_string(), Some("--".to_string()))]);

        let trees: Vec<_> = corpus.parsed_sents(BuildOptions::morph()).unwrap().collect();
        assert_eq!(trees[0].to_string(), "(S (ITJ Ja))");
    }

    #[test]
    fn test_trees_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Tree>();
        assert_send_sync::<Arc<Tree>>();
        assert_send_sync::<Treebank>();
    }

    #[cfg(test)]
    mod multi_file {
        use super::*;
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::fs;
        use std::io::Write;
        use tempfile::{TempDir, tempdir};

        const ONE: &str = "#BOS 1\nJa ja ITJ 500\n#500 -- S 0\n#EOS 1\n";
        const TWO: &str = "#BOS 2\nNein nein ITJ 500\n#500 -- S 0\n#EOS 2\n";

        fn create_test_files(contents: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
            let dir = tempdir().unwrap();
            let mut paths = Vec::new();

            for (filename, content) in contents {
                let path = dir.path().join(filename);
                let file = fs::File::create(&path).unwrap();
                if filename.ends_with(".gz") {
                    let mut encoder = GzEncoder::new(file, Compression::default());
                    encoder.write_all(content.as_bytes()).unwrap();
                    encoder.finish().unwrap();
                } else {
                    let mut file = file;
                    write!(file, "{}", content).unwrap();
                }
                paths.push(path);
            }

            (dir, paths)
        }

        fn ids(corpus: &Treebank) -> Vec<String> {
            corpus.sentences().filter_map(|s| s.id).collect()
        }

        #[test]
        fn test_from_file() {
            let (_dir, paths) = create_test_files(&[("one.export", ONE)]);
            let corpus = Treebank::from_file(&paths[0], house_format());
            assert_eq!(ids(&corpus), vec!["1"]);
        }

        #[test]
        fn test_gzip_file() {
            let (_dir, paths) = create_test_files(&[("two.export.gz", TWO)]);
            let corpus = Treebank::from_file(&paths[0], house_format());

            let words: Vec<_> = corpus.words().unwrap().collect();
            assert_eq!(words, vec![vec!["Nein".to_string()]]);
        }

        #[test]
        fn test_from_glob_sorted() {
            let (dir, _paths) = create_test_files(&[
                ("b.export.gz", TWO),
                ("a.export", ONE),
                ("notes.txt", "#BOS 9\nignored ignored X 0\n#EOS 9\n"),
            ]);

            let pattern = format!("{}/*.export*", dir.path().display());
            let corpus = Treebank::from_glob(&pattern, house_format()).unwrap();
            assert_eq!(ids(&corpus), vec!["1", "2"]);
        }

        #[test]
        fn test_invalid_glob() {
            let result = Treebank::from_glob("[", CorpusFormat::default());
            assert!(matches!(result, Err(TreebankError::Pattern(_))));
        }

        #[test]
        fn test_skips_bad_files() {
            let (dir, paths) = create_test_files(&[("good.export", ONE)]);
            let good_file = paths[0].clone();
            let bad_file = dir.path().join("nonexistent.export");

            let corpus = Treebank::from_paths(
                vec![good_file.clone(), bad_file, good_file],
                house_format(),
            );
            assert_eq!(ids(&corpus), vec!["1", "1"]);
        }

        #[test]
        fn test_open_error_names_path() {
            let dir = tempdir().unwrap();
            let missing = dir.path().join("missing.export");
            let err = match open_reader(&missing) {
                Err(e) => e,
                Ok(_) => panic!("expected an error"),
            };
            assert!(matches!(err, TreebankError::FileOpen { ref path, .. } if path == &missing));
        }
    }
}
