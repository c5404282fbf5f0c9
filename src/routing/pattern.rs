//! Route templates: parsing, matching and reverse generation.
//!
//! # Responsibilities
//! - Parse `/param/{value}` (path) and `http://{host}:{port}/x` (URL) templates
//! - Match a request and capture named parameters
//! - Resolve `{resource}` / `{resources}` captures to resource types
//! - Rebuild a concrete path from positional arguments
//!
//! # Design Decisions
//! - Path templates work segment by segment; arity must match exactly
//! - URL templates compile once to a single anchored regex
//! - A regex is anchored to the whole segment it constrains
//! - Captured values are percent-decoded; generated values are encoded

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::error::{PathError, PatternError};
use crate::http::{Params, Request};
use crate::resource::{ResourceRegistry, ResourceType};

/// Characters a URL placeholder may span.
const URL_PART: &str = "[^/:?#]+";

/// Whether a template describes a path or a full URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Path,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plurality {
    Singular,
    Plural,
}

/// One element of a template.
#[derive(Debug, Clone)]
pub enum Token {
    /// Matched and emitted verbatim.
    Literal(String),
    /// Captures any non-empty segment (or URL part).
    Placeholder(String),
    /// Captures only when `regex` matches. `regex` is the anchored form of `pattern`.
    RegexCapture {
        name: String,
        pattern: String,
        regex: Regex,
    },
    /// Selects a resource by its singular or plural name.
    Resource(Plurality),
}

impl Token {
    /// True for tokens that consume a positional argument during generation.
    pub fn takes_argument(&self) -> bool {
        matches!(self, Token::Placeholder(_) | Token::RegexCapture { .. })
    }
}

/// What a successful match produced.
#[derive(Debug, Default)]
pub struct Captures {
    pub params: Params,
    pub resource: Option<Arc<ResourceType>>,
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PatternTemplate {
    source: String,
    shape: Shape,
    tokens: Vec<Token>,
    url_regex: Option<Regex>,
}

enum Piece<'a> {
    Text(&'a str),
    Name(&'a str),
}

impl PatternTemplate {
    /// Compile a path template. `matchers` attach regexes to placeholders by name.
    pub fn path(source: &str, matchers: &[(String, String)]) -> Result<Self, PatternError> {
        let mut tokens = Vec::new();
        for segment in source.split('/').filter(|s| !s.is_empty()) {
            let pieces = scan(segment, source)?;
            let token = match pieces.as_slice() {
                [Piece::Name(name)] => placeholder(name, Shape::Path, matchers)?,
                pieces if pieces.iter().all(|p| matches!(p, Piece::Text(_))) => {
                    Token::Literal(segment.to_string())
                }
                _ => return Err(PatternError::PartialSegment(segment.to_string())),
            };
            tokens.push(token);
        }
        Self::build(source, Shape::Path, tokens, matchers)
    }

    /// Compile a full-URL template.
    pub fn url(source: &str, matchers: &[(String, String)]) -> Result<Self, PatternError> {
        let tokens = scan(source, source)?
            .into_iter()
            .map(|piece| match piece {
                Piece::Text(text) => Ok(Token::Literal(text.to_string())),
                Piece::Name(name) => placeholder(name, Shape::Url, matchers),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::build(source, Shape::Url, tokens, matchers)
    }

    fn build(
        source: &str,
        shape: Shape,
        tokens: Vec<Token>,
        matchers: &[(String, String)],
    ) -> Result<Self, PatternError> {
        for (name, _) in matchers {
            let used = tokens.iter().any(|t| matches!(t, Token::RegexCapture { name: n, .. } if n == name));
            if !used {
                return Err(PatternError::UnusedMatcher(name.clone()));
            }
        }

        let url_regex = match shape {
            Shape::Path => None,
            Shape::Url => Some(compile_url_regex(&tokens)?),
        };

        Ok(Self {
            source: source.to_string(),
            shape,
            tokens,
            url_regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of positional arguments generation consumes.
    pub fn arity(&self) -> usize {
        self.tokens.iter().filter(|t| t.takes_argument()).count()
    }

    /// Match `req`, capturing parameters. `resources` resolves resource tokens.
    pub fn matches(&self, req: &Request, resources: &ResourceRegistry) -> Option<Captures> {
        match self.shape {
            Shape::Path => self.match_segments(req, resources),
            Shape::Url => self.match_url(req, resources),
        }
    }

    fn match_segments(&self, req: &Request, resources: &ResourceRegistry) -> Option<Captures> {
        let segments: Vec<Cow<'_, str>> = req
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode)
            .collect();
        if segments.len() != self.tokens.len() {
            return None;
        }

        let mut captures = Captures::default();
        for (token, segment) in self.tokens.iter().zip(&segments) {
            capture(token, segment, &mut captures, resources)?;
        }
        Some(captures)
    }

    fn match_url(&self, req: &Request, resources: &ResourceRegistry) -> Option<Captures> {
        let regex = self.url_regex.as_ref()?;
        let location = req.location();
        let found = regex.captures(&location)?;

        let mut captures = Captures::default();
        for (i, token) in self.tokens.iter().enumerate() {
            if matches!(token, Token::Literal(_)) {
                continue;
            }
            let value = found.name(&group_name(i))?;
            capture(token, &decode(value.as_str()), &mut captures, resources)?;
        }
        Some(captures)
    }

    /// Rebuild a path (or URL) from positional `args`.
    ///
    /// A trailing JSON object is not consumed by placeholders; it becomes the
    /// query string. `owner` supplies the names for resource tokens. `route`
    /// only labels errors.
    pub fn generate(
        &self,
        route: &str,
        owner: &ResourceType,
        args: &[Value],
    ) -> Result<String, PathError> {
        let (scalars, query) = match args.split_last() {
            Some((Value::Object(map), rest)) => (rest, Some(map)),
            _ => (args, None),
        };

        let expected = self.arity();
        if scalars.len() < expected {
            return Err(PathError::MissingArgument {
                route: route.to_string(),
                expected,
                supplied: scalars.len(),
            });
        }
        if scalars.len() > expected {
            return Err(PathError::UnexpectedArguments {
                route: route.to_string(),
                expected,
                supplied: scalars.len(),
            });
        }

        let mut remaining = scalars.iter().enumerate();
        let mut parts = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            let part = match token {
                Token::Literal(text) => text.clone(),
                Token::Resource(Plurality::Singular) => owner.singular_name().to_string(),
                Token::Resource(Plurality::Plural) => owner.plural_name().to_string(),
                Token::Placeholder(_) | Token::RegexCapture { .. } => {
                    // Arity was checked above.
                    let Some((position, value)) = remaining.next() else {
                        break;
                    };
                    let text = scalar_text(value).map_err(|reason| PathError::InvalidArgument {
                        route: route.to_string(),
                        position: position + 1,
                        reason,
                    })?;
                    urlencoding::encode(&text).into_owned()
                }
            };
            parts.push(part);
        }

        let mut generated = match self.shape {
            Shape::Path => format!("/{}", parts.join("/")),
            Shape::Url => parts.concat(),
        };

        if let Some(map) = query.filter(|m| !m.is_empty()) {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in map {
                let text = scalar_text(value).unwrap_or_else(|_| value.to_string());
                serializer.append_pair(key, &text);
            }
            generated.push('?');
            generated.push_str(&serializer.finish());
        }

        Ok(generated)
    }
}

impl fmt::Display for PatternTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split `text` into literal runs and `{name}` placeholders.
fn scan<'a>(text: &'a str, source: &str) -> Result<Vec<Piece<'a>>, PatternError> {
    let unbalanced = || PatternError::Unbalanced(source.to_string());

    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find(|c: char| c == '{' || c == '}') {
        if rest[open..].starts_with('}') {
            return Err(unbalanced());
        }
        if open > 0 {
            pieces.push(Piece::Text(&rest[..open]));
        }
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(unbalanced)?;
        let name = after[..close].trim();
        if name.contains('{') {
            return Err(unbalanced());
        }
        if name.is_empty() {
            return Err(PatternError::EmptyName(source.to_string()));
        }
        pieces.push(Piece::Name(name));
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }
    Ok(pieces)
}

fn placeholder(
    name: &str,
    shape: Shape,
    matchers: &[(String, String)],
) -> Result<Token, PatternError> {
    match name {
        "resource" => return Ok(Token::Resource(Plurality::Singular)),
        "resources" => return Ok(Token::Resource(Plurality::Plural)),
        _ => {}
    }

    match matchers.iter().find(|(n, _)| n == name) {
        Some((_, pattern)) => {
            let regex = Regex::new(&format!("^(?:{pattern})$"))?;
            tracing::trace!(name, pattern = %pattern, ?shape, "Compiled placeholder regex");
            Ok(Token::RegexCapture {
                name: name.to_string(),
                pattern: pattern.clone(),
                regex,
            })
        }
        None => Ok(Token::Placeholder(name.to_string())),
    }
}

fn group_name(index: usize) -> String {
    format!("t{index}")
}

/// Drop the `^` and `$` a constraint may carry so it can sit inside a larger
/// regex. Segment regexes are anchored on their own.
fn unanchored(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    match pattern.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => pattern,
    }
}

fn compile_url_regex(tokens: &[Token]) -> Result<Regex, PatternError> {
    let mut source = String::from("^");
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Literal(text) => source.push_str(&regex::escape(text)),
            Token::Placeholder(_) | Token::Resource(_) => {
                source.push_str(&format!("(?P<{}>{URL_PART})", group_name(i)));
            }
            Token::RegexCapture { pattern, .. } => {
                source.push_str(&format!("(?P<{}>(?:{}))", group_name(i), unanchored(pattern)));
            }
        }
    }
    source.push('$');
    Ok(Regex::new(&source)?)
}

/// Bind one token against one value. `None` fails the whole match.
fn capture(
    token: &Token,
    value: &str,
    captures: &mut Captures,
    resources: &ResourceRegistry,
) -> Option<()> {
    match token {
        Token::Literal(text) => (text == value).then_some(()),
        Token::Placeholder(name) => {
            captures.params.insert(name.as_str(), value);
            Some(())
        }
        Token::RegexCapture { name, regex, .. } => {
            let found = regex.captures(value)?;
            let matched = found.get(1).or_else(|| found.get(0))?;
            captures.params.insert(name.as_str(), matched.as_str());
            Some(())
        }
        Token::Resource(plurality) => {
            let resource = match plurality {
                Plurality::Singular => resources.by_singular(value),
                Plurality::Plural => resources.by_plural(value),
            }?;
            captures.resource = Some(resource);
            Some(())
        }
    }
}

fn decode(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

fn scalar_text(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err("null"),
        Value::Array(_) => Err("an array"),
        Value::Object(_) => Err("an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resources() -> ResourceRegistry {
        ResourceRegistry::default().with(ResourceType::new("blanket"))
    }

    fn digits(name: &str) -> Vec<(String, String)> {
        vec![(name.to_string(), r"\d+".to_string())]
    }

    #[test]
    fn test_parse_path_tokens() {
        let template = PatternTemplate::path("/users/{id}/{resource}", &digits("id")).unwrap();
        assert_eq!(template.shape(), Shape::Path);
        assert_eq!(template.tokens().len(), 3);
        assert!(matches!(&template.tokens()[0], Token::Literal(t) if t == "users"));
        assert!(matches!(&template.tokens()[1], Token::RegexCapture { name, .. } if name == "id"));
        assert!(matches!(template.tokens()[2], Token::Resource(Plurality::Singular)));
        assert_eq!(template.arity(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            PatternTemplate::path("/users/{id", &[]),
            Err(PatternError::Unbalanced(_))
        ));
        assert!(matches!(
            PatternTemplate::path("/users/}", &[]),
            Err(PatternError::Unbalanced(_))
        ));
        assert!(matches!(
            PatternTemplate::path("/users/{}", &[]),
            Err(PatternError::EmptyName(_))
        ));
        assert!(matches!(
            PatternTemplate::path("/users/{id}.json", &[]),
            Err(PatternError::PartialSegment(_))
        ));
        assert!(matches!(
            PatternTemplate::path("/users/{id}", &digits("name")),
            Err(PatternError::UnusedMatcher(_))
        ));
        assert!(matches!(
            PatternTemplate::path("/users/{id}", &[("id".into(), "(".into())]),
            Err(PatternError::Regex(_))
        ));
    }

    #[test]
    fn test_placeholder_captures_segment() {
        let template = PatternTemplate::path("/param/{value}", &[]).unwrap();
        let req = Request::get("/param/elephant").unwrap();

        let captures = template.matches(&req, &resources()).unwrap();
        assert_eq!(captures.params.get_str("value"), Some("elephant"));
        assert!(captures.resource.is_none());
    }

    #[test]
    fn test_arity_mismatch_fails() {
        let template = PatternTemplate::path("/param/{value}", &[]).unwrap();
        assert!(template.matches(&Request::get("/param").unwrap(), &resources()).is_none());
        assert!(template
            .matches(&Request::get("/param/a/b").unwrap(), &resources())
            .is_none());
    }

    #[test]
    fn test_literal_mismatch_fails() {
        let template = PatternTemplate::path("/param/{value}", &[]).unwrap();
        assert!(template.matches(&Request::get("/other/x").unwrap(), &resources()).is_none());
    }

    #[test]
    fn test_root_template() {
        let template = PatternTemplate::path("/", &[]).unwrap();
        assert!(template.tokens().is_empty());
        assert!(template.matches(&Request::get("/").unwrap(), &resources()).is_some());
        assert!(template.matches(&Request::get("/x").unwrap(), &resources()).is_none());
    }

    #[test]
    fn test_regex_capture_is_anchored() {
        let template = PatternTemplate::path("/posts/{id}", &digits("id")).unwrap();
        let captures = template
            .matches(&Request::get("/posts/42").unwrap(), &resources())
            .unwrap();
        assert_eq!(captures.params.get_str("id"), Some("42"));

        assert!(template.matches(&Request::get("/posts/42abc").unwrap(), &resources()).is_none());
        assert!(template.matches(&Request::get("/posts/abc").unwrap(), &resources()).is_none());
    }

    #[test]
    fn test_regex_capture_uses_first_group() {
        let matchers = vec![("slug".to_string(), r"post-(\w+)".to_string())];
        let template = PatternTemplate::path("/blog/{slug}", &matchers).unwrap();
        let captures = template
            .matches(&Request::get("/blog/post-hello").unwrap(), &resources())
            .unwrap();
        assert_eq!(captures.params.get_str("slug"), Some("hello"));
    }

    #[test]
    fn test_url_template_with_numeric_port() {
        let template = PatternTemplate::url("http://localhost:{port}/port", &digits("port")).unwrap();
        assert_eq!(template.shape(), Shape::Url);

        let captures = template
            .matches(&Request::get("http://localhost:3000/port").unwrap(), &resources())
            .unwrap();
        assert_eq!(captures.params.get_str("port"), Some("3000"));

        assert!(template
            .matches(&Request::get("http://localhost/port").unwrap(), &resources())
            .is_none());
        assert!(template
            .matches(&Request::get("http://localhost:3000/other").unwrap(), &resources())
            .is_none());
    }

    #[test]
    fn test_anchored_regex_works_in_both_shapes() {
        let anchored = vec![("id".to_string(), r"^\d+$".to_string())];

        let path = PatternTemplate::path("/items/{id}", &anchored).unwrap();
        let captures = path.matches(&Request::get("/items/42").unwrap(), &resources()).unwrap();
        assert_eq!(captures.params.get_str("id"), Some("42"));

        let url = PatternTemplate::url("http://localhost:3000/items/{id}", &anchored).unwrap();
        let captures = url
            .matches(&Request::get("http://localhost:3000/items/42").unwrap(), &resources())
            .unwrap();
        assert_eq!(captures.params.get_str("id"), Some("42"));
        assert!(url
            .matches(&Request::get("http://localhost:3000/items/abc").unwrap(), &resources())
            .is_none());
    }

    #[test]
    fn test_unanchored_keeps_escaped_dollar() {
        assert_eq!(unanchored(r"^\d+$"), r"\d+");
        assert_eq!(unanchored(r"[a-z]+"), r"[a-z]+");
        assert_eq!(unanchored(r"cost\$"), r"cost\$");
    }

    #[test]
    fn test_url_template_requires_port_part() {
        let template =
            PatternTemplate::url("http://{host}:{port}/{section}", &digits("port")).unwrap();
        // Placeholders cannot swallow ':' or '/'
        let req = Request::get("http://localhost:3000/port").unwrap();
        let captures = template.matches(&req, &resources()).unwrap();
        assert_eq!(captures.params.get_str("host"), Some("localhost"));
        assert_eq!(captures.params.get_str("section"), Some("port"));

        let req = Request::get("http://localhost/port").unwrap();
        assert!(template.matches(&req, &resources()).is_none());
    }

    #[test]
    fn test_resource_tokens_select_resource() {
        let template = PatternTemplate::path("/{resources}", &[]).unwrap();
        let captures = template
            .matches(&Request::get("/blankets").unwrap(), &resources())
            .unwrap();
        assert_eq!(captures.resource.unwrap().name(), "blanket");
        assert!(captures.params.is_empty());

        assert!(template.matches(&Request::get("/blanket").unwrap(), &resources()).is_none());
        assert!(template.matches(&Request::get("/pillows").unwrap(), &resources()).is_none());

        let template = PatternTemplate::path("/{resource}", &[]).unwrap();
        let captures = template
            .matches(&Request::get("/blanket").unwrap(), &resources())
            .unwrap();
        assert_eq!(captures.resource.unwrap().name(), "blanket");
    }

    #[test]
    fn test_captures_are_decoded() {
        let template = PatternTemplate::path("/tags/{tag}", &[]).unwrap();
        let captures = template
            .matches(&Request::get("/tags/hello%20world").unwrap(), &resources())
            .unwrap();
        assert_eq!(captures.params.get_str("tag"), Some("hello world"));
    }

    #[test]
    fn test_generate_path() {
        let owner = ResourceType::new("blanket");
        let template = PatternTemplate::path("/{resources}/{id}/edit", &digits("id")).unwrap();

        assert_eq!(
            template.generate("edit", &owner, &[json!(7)]).unwrap(),
            "/blankets/7/edit"
        );
    }

    #[test]
    fn test_generate_trailing_object_is_query() {
        let owner = ResourceType::new("blanket");
        let template = PatternTemplate::path("/search/{term}", &[]).unwrap();

        let path = template
            .generate("search", &owner, &[json!("wool"), json!({ "page": 2, "sort": "new" })])
            .unwrap();
        assert_eq!(path, "/search/wool?page=2&sort=new");
    }

    #[test]
    fn test_generate_argument_count_must_match() {
        let owner = ResourceType::new("blanket");
        let template = PatternTemplate::path("/a/{x}/{y}", &[]).unwrap();

        assert!(matches!(
            template.generate("a", &owner, &[json!(1)]),
            Err(PathError::MissingArgument { expected: 2, supplied: 1, .. })
        ));
        // A trailing object never fills a placeholder
        assert!(matches!(
            template.generate("a", &owner, &[json!(1), json!({ "y": 2 })]),
            Err(PathError::MissingArgument { expected: 2, supplied: 1, .. })
        ));
        assert!(matches!(
            template.generate("a", &owner, &[json!(1), json!(2), json!(3)]),
            Err(PathError::UnexpectedArguments { expected: 2, supplied: 3, .. })
        ));
        assert!(matches!(
            template.generate("a", &owner, &[json!(1), json!(null)]),
            Err(PathError::InvalidArgument { position: 2, reason: "null", .. })
        ));
    }

    #[test]
    fn test_generate_url() {
        let owner = ResourceType::new("default");
        let template = PatternTemplate::url("http://localhost:{port}/port", &digits("port")).unwrap();
        assert_eq!(
            template.generate("port", &owner, &[json!(3000)]).unwrap(),
            "http://localhost:3000/port"
        );
    }

    #[test]
    fn test_generated_path_matches_back() {
        let owner = ResourceType::new("blanket");
        let registry = resources();
        let template = PatternTemplate::path("/{resources}/{name}/{id}", &digits("id")).unwrap();

        let path = template
            .generate("show", &owner, &[json!("red & blue"), json!(12)])
            .unwrap();
        let captures = template
            .matches(&Request::get(&path).unwrap(), &registry)
            .unwrap();

        assert_eq!(captures.params.get_str("name"), Some("red & blue"));
        assert_eq!(captures.params.get_str("id"), Some("12"));
        assert_eq!(captures.resource.unwrap().name(), "blanket");
    }
}
