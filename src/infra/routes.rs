//! Named route templates used to build include URLs.

use std::collections::{BTreeSet, HashMap};

use url::form_urlencoded;

use crate::application::routing::{
    RouteError, RouteParams, SSI_RENDER_ROUTE, TOKEN_PARAM, UrlGenerator,
};
use crate::cache::BLOCK_ID_KEY;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone)]
struct RouteTemplate {
    segments: Vec<Segment>,
}

impl RouteTemplate {
    fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let rest = pattern
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with `/`"))?;

        let mut segments = Vec::new();
        let mut seen = BTreeSet::new();
        for raw in rest.split('/') {
            if raw.is_empty() {
                return Err(invalid("empty path segment"));
            }
            match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) if !name.is_empty() => {
                    if !seen.insert(name.to_string()) {
                        return Err(invalid("duplicate placeholder"));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                }
                Some(_) => return Err(invalid("empty placeholder")),
                None if raw.contains(['{', '}']) => {
                    return Err(invalid("placeholders must span a whole segment"));
                }
                None => segments.push(Segment::Literal(raw.to_string())),
            }
        }

        Ok(Self { segments })
    }

    fn generate(&self, route: &str, params: &RouteParams) -> Result<String, RouteError> {
        let mut path = String::new();
        let mut consumed = BTreeSet::new();

        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Placeholder(name) => {
                    let value =
                        params
                            .get(name)
                            .ok_or_else(|| RouteError::MissingParameter {
                                route: route.to_string(),
                                param: name.clone(),
                            })?;
                    path.push_str(&encode_path_segment(value));
                    consumed.insert(name.as_str());
                }
            }
        }

        let mut query = form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (name, value) in params {
            if consumed.contains(name.as_str()) {
                continue;
            }
            query.append_pair(name, value);
            has_query = true;
        }

        if has_query {
            path.push('?');
            path.push_str(&query.finish());
        }

        Ok(path)
    }
}

/// Percent-encode a value so it fits in exactly one path segment.
fn encode_path_segment(value: &str) -> String {
    // `byte_serialize` writes spaces as `+` and a literal `+` as `%2B`,
    // so any `+` left in the output stands for a space.
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// In-process URL generator over named path templates.
///
/// Placeholder values are percent-encoded into their segment; parameters that
/// match no placeholder are appended as a query string in name order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, RouteTemplate>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, name: &str, pattern: &str) -> Result<Self, RouteError> {
        self.routes
            .insert(name.to_string(), RouteTemplate::parse(pattern)?);
        Ok(self)
    }

    /// Route table exposing the fragment render endpoint under `prefix`.
    pub fn for_ssi(prefix: &str) -> Result<Self, RouteError> {
        Self::new().with_route(SSI_RENDER_ROUTE, &ssi_route_pattern(prefix))
    }
}

impl UrlGenerator for RouteTable {
    fn generate(&self, route: &str, params: &RouteParams) -> Result<String, RouteError> {
        self.routes
            .get(route)
            .ok_or_else(|| RouteError::UnknownRoute(route.to_string()))?
            .generate(route, params)
    }
}

fn ssi_route_pattern(prefix: &str) -> String {
    format!(
        "{}/{{{TOKEN_PARAM}}}/{{{BLOCK_ID_KEY}}}",
        prefix.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> RouteParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn ssi_route_encodes_block_id_into_one_segment() {
        let table = RouteTable::for_ssi("/symfony-cmf/block/cache/ssi").expect("table");
        let url = table
            .generate(
                SSI_RENDER_ROUTE,
                &params(&[
                    ("_token", "XXXXX"),
                    ("block_id", "/cms/content/home/additionalInfoBlock"),
                    ("updated_at", "as"),
                ]),
            )
            .expect("url");

        assert_eq!(
            url,
            "/symfony-cmf/block/cache/ssi/XXXXX/%2Fcms%2Fcontent%2Fhome%2FadditionalInfoBlock?updated_at=as"
        );
    }

    #[test]
    fn spaces_and_plus_signs_survive_path_encoding() {
        assert_eq!(encode_path_segment("a b+c"), "a%20b%2Bc");
    }

    #[test]
    fn query_parameters_follow_name_order() {
        let table = RouteTable::new()
            .with_route("list", "/items/{id}")
            .expect("table");
        let url = table
            .generate(
                "list",
                &params(&[("id", "7"), ("z", "last"), ("a", "first value")]),
            )
            .expect("url");

        assert_eq!(url, "/items/7?a=first+value&z=last");
    }

    #[test]
    fn missing_placeholder_is_an_error() {
        let table = RouteTable::for_ssi("/_fragments/ssi").expect("table");
        let err = table
            .generate(SSI_RENDER_ROUTE, &params(&[("block_id", "/cms/a")]))
            .expect_err("missing token");

        assert_eq!(
            err,
            RouteError::MissingParameter {
                route: SSI_RENDER_ROUTE.to_string(),
                param: "_token".to_string(),
            }
        );
    }

    #[test]
    fn unknown_route_is_an_error() {
        let err = RouteTable::new()
            .generate("nope", &RouteParams::new())
            .expect_err("unknown");
        assert_eq!(err, RouteError::UnknownRoute("nope".to_string()));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        for pattern in ["relative/{id}", "/a//b", "/a/{}", "/a/x{id}", "/{id}/{id}"] {
            assert!(
                RouteTemplate::parse(pattern).is_err(),
                "pattern `{pattern}` should be rejected"
            );
        }
    }

    #[test]
    fn trailing_slash_on_prefix_is_ignored() {
        assert_eq!(
            ssi_route_pattern("/_fragments/ssi/"),
            "/_fragments/ssi/{_token}/{block_id}"
        );
    }
}
