//! Format registry: the fixed mapping between [`Format`] members and the
//! tokens pandoc accepts for `-f` / `-t`.
//!
//! The table is the single source of truth. A member without an entry (today
//! only [`Format::Unspecified`]) and any numeric value outside the enum are
//! rejected by the pipeline; nothing falls back to a default format.

use crate::proto::Format;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Registered formats in declaration order.
static FORMATS: &[(Format, &str)] = &[
    (Format::Asciidoc, "asciidoc"),
    (Format::Beamer, "beamer"),
    (Format::Bibtex, "bibtex"),
    (Format::Biblatex, "biblatex"),
    (Format::Commonmark, "commonmark"),
    (Format::CommonmarkX, "commonmark_x"),
    (Format::Context, "context"),
    (Format::Csljson, "csljson"),
    (Format::Docbook4, "docbook4"),
    (Format::Docbook5, "docbook5"),
    (Format::Docx, "docx"),
    (Format::Dokuwiki, "dokuwiki"),
    (Format::Epub3, "epub3"),
    (Format::Epub2, "epub2"),
    (Format::Fb2, "fb2"),
    (Format::Gfm, "gfm"),
    (Format::Haddock, "haddock"),
    (Format::Html5, "html5"),
    (Format::Html4, "html4"),
    (Format::Icml, "icml"),
    (Format::Ipynb, "ipynb"),
    (Format::JatsArchiving, "jats_archiving"),
    (Format::JatsArticleAuthoring, "jats_articleauthoring"),
    (Format::JatsPublishing, "jats_publishing"),
    (Format::Jira, "jira"),
    (Format::Json, "json"),
    (Format::Latex, "latex"),
    (Format::Man, "man"),
    (Format::Markdown, "markdown"),
    (Format::MarkdownMmd, "markdown_mmd"),
    (Format::MarkdownPhpExtra, "markdown_phpextra"),
    (Format::MarkdownStrict, "markdown_strict"),
    (Format::Mediawiki, "mediawiki"),
    (Format::Ms, "ms"),
    (Format::Muse, "muse"),
    (Format::Native, "native"),
    (Format::Odt, "odt"),
    (Format::Opml, "opml"),
    (Format::Opendocument, "opendocument"),
    (Format::Org, "org"),
    (Format::Pdf, "pdf"),
    (Format::Plain, "plain"),
    (Format::Pptx, "pptx"),
    (Format::Rst, "rst"),
    (Format::Rtf, "rtf"),
    (Format::Texinfo, "texinfo"),
    (Format::Textile, "textile"),
    (Format::Slideous, "slideous"),
    (Format::Slidy, "slidy"),
    (Format::Dzslides, "dzslides"),
    (Format::Revealjs, "revealjs"),
    (Format::S5, "s5"),
    (Format::Tei, "tei"),
    (Format::Xwiki, "xwiki"),
    (Format::Zimwiki, "zimwiki"),
];

static BY_FORMAT: Lazy<HashMap<i32, &'static str>> = Lazy::new(|| {
    FORMATS
        .iter()
        .map(|(format, token)| (*format as i32, *token))
        .collect()
});

static BY_TOKEN: Lazy<HashMap<&'static str, Format>> =
    Lazy::new(|| FORMATS.iter().map(|(format, token)| (*token, *format)).collect());

/// Look up the converter token for a format.
///
/// Accepts either a [`Format`] or the raw wire value carried by a request.
/// Returns `None` for unregistered members and unknown numeric values.
pub fn resolve(format: impl Into<i32>) -> Option<&'static str> {
    BY_FORMAT.get(&format.into()).copied()
}

/// Reverse lookup: the format registered under `token`.
pub fn format_for_token(token: &str) -> Option<Format> {
    BY_TOKEN.get(token).copied()
}

/// Every registered `(format, token)` pair, in declaration order.
pub fn registered() -> impl Iterator<Item = (Format, &'static str)> {
    FORMATS.iter().copied()
}
