//! go-import discovery: mapping a vanity import path onto a concrete repository.
//!
//! The host serving an import path answers `GET https://<path>?go-get=1` with an HTML page whose
//! head carries tags like
//!
//! ```html
//! <meta name="go-import" content="golang.org/x/net git https://go.googlesource.com/net">
//! ```
//!
//! Exactly one such tag must be found for the lookup to succeed.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::config::Scheme;
use crate::error::Error;
use crate::resolve::archive_reference;

/// A parsed `<meta name="go-import" content="prefix vcs repo-root">` tag.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetaImport {
    pub prefix: String,
    pub vcs: String,
    pub repo_root: String,
}

impl std::fmt::Display for MetaImport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.prefix, self.vcs, self.repo_root)
    }
}

/// Look up the repository behind an import path.
pub trait Discover: Send + Sync {
    fn discover(&self, path: &str) -> Result<MetaImport, Error>;
}

/// Discovery over HTTP(S) with a single unauthenticated `GET`.
#[derive(Debug, Clone)]
pub struct HttpDiscovery {
    client: reqwest::blocking::Client,
    scheme: Scheme,
}

impl HttpDiscovery {
    pub fn new(client: reqwest::blocking::Client, scheme: Scheme) -> Self {
        Self { client, scheme }
    }

    /// The discovery URL for an import path.
    pub fn url(&self, path: &str) -> String {
        format!("{}://{path}?go-get=1", self.scheme)
    }
}

impl Discover for HttpDiscovery {
    fn discover(&self, path: &str) -> Result<MetaImport, Error> {
        let url = self.url(path);
        tracing::debug!(%url, "requesting go-import metadata");
        // Any status is accepted; only the body is inspected.
        let body = self.client.get(&url).send()?.text()?;
        let imports = parse_meta_imports(&body).map_err(|err| Error::Discovery {
            path: path.to_string(),
            err,
        })?;
        select_single(path, imports)
    }
}

/// Require exactly one import, reporting every candidate otherwise.
pub fn select_single(path: &str, imports: Vec<MetaImport>) -> Result<MetaImport, Error> {
    match <[MetaImport; 1]>::try_from(imports) {
        Ok([import]) => Ok(import),
        Err(candidates) => Err(Error::AmbiguousImports {
            path: path.to_string(),
            candidates,
        }),
    }
}

/// Collect the go-import tags from the head of an HTML document.
///
/// Parsing stops at the end of `<head>` or the start of `<body>`. A `go-source` tag referencing
/// the archive host replaces a single preceding go-import, so such imports are downloaded as
/// archives rather than cloned. Markup errors are only reported if no import was found before
/// them.
pub fn parse_meta_imports(html: &str) -> Result<Vec<MetaImport>, quick_xml::Error> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut imports: Vec<MetaImport> = Vec::new();
    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(_) if !imports.is_empty() => return Ok(imports),
            Err(err) => return Err(err),
        };
        match event {
            Event::Eof => return Ok(imports),
            Event::Start(ref e) | Event::Empty(ref e) if is_element(e.local_name().as_ref(), "body") => {
                return Ok(imports);
            }
            Event::End(ref e) if is_element(e.local_name().as_ref(), "head") => {
                return Ok(imports);
            }
            Event::Start(ref e) | Event::Empty(ref e) if is_element(e.local_name().as_ref(), "meta") => {
                let name = attr_value(e, "name");
                let content = attr_value(e, "content");
                if name == "go-source"
                    && imports.len() == 1
                    && let Some((reference, _, _)) = archive_reference(&content)
                {
                    imports = vec![MetaImport {
                        prefix: imports[0].prefix.clone(),
                        vcs: "git".to_string(),
                        repo_root: reference.to_string(),
                    }];
                    continue;
                }
                if name != "go-import" {
                    continue;
                }
                let fields = content.split_whitespace().collect::<Vec<_>>();
                if let [prefix, vcs, repo_root] = fields.as_slice() {
                    imports.push(MetaImport {
                        prefix: prefix.to_string(),
                        vcs: vcs.to_string(),
                        repo_root: repo_root.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
}

fn is_element(local_name: &[u8], expected: &str) -> bool {
    local_name.eq_ignore_ascii_case(expected.as_bytes())
}

/// The value of the attribute `name` (matched case-insensitively), or the empty string.
fn attr_value(element: &BytesStart<'_>, name: &str) -> String {
    element
        .html_attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref().eq_ignore_ascii_case(name.as_bytes()))
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
        .unwrap_or_default()
}
