use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::dom::Document;
use crate::error::Result;
use crate::options::ReadOptions;

/// Where a root wrapper reads its document from.
///
/// A [`Source::Str`] ending in the format's file extension is treated as a
/// path; any other string is the document itself.
pub enum Source<'s> {
    Path(PathBuf),
    Str(Cow<'s, str>),
    Bytes(Cow<'s, [u8]>),
    Reader(Box<dyn Read + 's>),
}

impl<'s> Source<'s> {
    /// Consume a byte or text stream.
    pub fn reader(reader: impl Read + 's) -> Self {
        Self::Reader(Box::new(reader))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Reader(_) => "reader",
        }
    }
}

impl<'s> From<&'s str> for Source<'s> {
    fn from(s: &'s str) -> Self {
        Self::Str(Cow::Borrowed(s))
    }
}

impl From<String> for Source<'_> {
    fn from(s: String) -> Self {
        Self::Str(Cow::Owned(s))
    }
}

impl<'s> From<&'s [u8]> for Source<'s> {
    fn from(b: &'s [u8]) -> Self {
        Self::Bytes(Cow::Borrowed(b))
    }
}

impl From<Vec<u8>> for Source<'_> {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(Cow::Owned(b))
    }
}

impl<'s> From<&'s Path> for Source<'s> {
    fn from(p: &'s Path) -> Self {
        Self::Path(p.to_path_buf())
    }
}

impl From<PathBuf> for Source<'_> {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

/// Parse `source` and strip namespaces from every element.
///
/// `extension` (e.g. `".gpx"`) decides whether a string names a file.
pub(crate) fn load(source: Source<'_>, extension: &str, options: &ReadOptions) -> Result<Document> {
    let kind = source.kind();
    let document = match source {
        Source::Path(path) => parse_path(&path, options)?,
        Source::Str(s) if s.to_lowercase().ends_with(extension) => {
            parse_path(Path::new(s.as_ref()), options)?
        }
        Source::Str(s) => Document::parse_str(&s, options)?,
        Source::Bytes(b) => Document::parse_bytes(&b, options)?,
        Source::Reader(r) => Document::parse_reader(r, options)?,
    };
    Ok(finish(document, kind))
}

/// Parse document text, never treating it as a path.
pub(crate) fn load_text(text: &str, options: &ReadOptions) -> Result<Document> {
    Ok(finish(Document::parse_str(text, options)?, "str"))
}

fn finish(mut document: Document, kind: &str) -> Document {
    document.strip_namespaces();
    tracing::debug!(source = kind, root = document.root().tag(), "Loaded activity document");
    document
}

fn parse_path(path: &Path, options: &ReadOptions) -> Result<Document> {
    tracing::debug!(path = %path.display(), "Reading activity file");
    let file = File::open(path)?;
    Document::parse_reader(file, options)
}
