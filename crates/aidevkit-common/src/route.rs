use thiserror::Error;
use tracing::warn;

/// Placeholder token for the API version segment, e.g. `https://host/{version}/models`.
pub const VERSION_TOKEN: &str = "{version}";
/// Placeholder token for a resource id, e.g. `models/{id}`.
pub const ID_TOKEN: &str = "{id}";

/// Errors raised while assembling a route.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The `{version}` placeholder was never substituted. This is a
    /// configuration mistake on the integrator's side and is fatal for the
    /// whole request.
    #[error("unresolved version placeholder in route: {url}")]
    UnresolvedVersion { url: String },
}

/// A single directive applied while assembling a request URL.
///
/// Directives are processed in the order they were added. Invalid directives
/// (empty id, empty query key) are logged and skipped so one bad parameter
/// does not take the whole request down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathParam {
    /// Substitute a resource id into the `{id}` placeholder, or append it as
    /// a path segment when the route carries no placeholder.
    Id(String),
    /// Append a percent-encoded query parameter.
    Query { key: String, value: String },
    /// Append an RPC-style method suffix (`:generateContent`).
    Method(String),
    /// Append a child path segment.
    Child(String),
    /// Substitute the `{version}` placeholder.
    Version(String),
}

/// Assembles a fully qualified request URL from a base URL and an ordered
/// list of [`PathParam`] directives.
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    base_url: String,
    params: Vec<PathParam>,
}

impl RouteBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, param: PathParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.param(PathParam::Id(id.into()))
    }

    pub fn query(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.param(PathParam::Query {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn method(self, method: impl Into<String>) -> Self {
        self.param(PathParam::Method(method.into()))
    }

    pub fn child(self, segment: impl Into<String>) -> Self {
        self.param(PathParam::Child(segment.into()))
    }

    pub fn version(self, version: impl Into<String>) -> Self {
        self.param(PathParam::Version(version.into()))
    }

    /// Process the directives and produce the final URL.
    ///
    /// Duplicate id or method directives are first-wins: later ones are
    /// ignored with a warning. A `{version}` placeholder still present after
    /// all directives ran is a fatal configuration error.
    pub fn build(self) -> Result<String, RouteError> {
        let mut path = self.base_url;
        let mut method_suffix: Option<String> = None;
        let mut id_applied = false;
        let mut queries: Vec<(String, String)> = Vec::new();

        for param in self.params {
            match param {
                PathParam::Id(id) => {
                    if id.is_empty() {
                        warn!("empty id path parameter, skipping");
                        continue;
                    }
                    if id_applied {
                        warn!(id, "duplicate id path parameter, keeping the first");
                        continue;
                    }
                    if path.contains(ID_TOKEN) {
                        path = path.replacen(ID_TOKEN, &id, 1);
                    } else {
                        path = format!("{}/{}", path.trim_end_matches('/'), id);
                    }
                    id_applied = true;
                }
                PathParam::Query { key, value } => {
                    if key.is_empty() {
                        warn!("empty query parameter key, skipping");
                        continue;
                    }
                    queries.push((key, value));
                }
                PathParam::Method(method) => {
                    if method.is_empty() {
                        warn!("empty method path parameter, skipping");
                        continue;
                    }
                    if method_suffix.is_some() {
                        warn!(method, "duplicate method path parameter, keeping the first");
                        continue;
                    }
                    method_suffix = Some(method);
                }
                PathParam::Child(segment) => {
                    if segment.is_empty() {
                        warn!("empty child path segment, skipping");
                        continue;
                    }
                    path = format!(
                        "{}/{}",
                        path.trim_end_matches('/'),
                        segment.trim_start_matches('/')
                    );
                }
                PathParam::Version(version) => {
                    if version.is_empty() {
                        warn!("empty version path parameter, skipping");
                        continue;
                    }
                    path = path.replace(VERSION_TOKEN, &version);
                }
            }
        }

        if path.contains(VERSION_TOKEN) {
            return Err(RouteError::UnresolvedVersion { url: path });
        }

        let mut url = path;
        if let Some(method) = method_suffix {
            url.push(':');
            url.push_str(&method);
        }

        if !queries.is_empty() {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, value) in &queries {
                serializer.append_pair(key, value);
            }
            url.push('?');
            url.push_str(&serializer.finish());
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_version_and_id() {
        let url = RouteBuilder::new("https://api.example.com/{version}/models/{id}")
            .version("v1beta")
            .id("gemini-2.0-flash")
            .build()
            .expect("route should build");
        assert_eq!(url, "https://api.example.com/v1beta/models/gemini-2.0-flash");
        assert!(!url.contains('{'));
    }

    #[test]
    fn appends_id_without_placeholder() {
        let url = RouteBuilder::new("https://api.example.com/v1/models")
            .id("gpt-4o")
            .build()
            .expect("route should build");
        assert_eq!(url, "https://api.example.com/v1/models/gpt-4o");
    }

    #[test]
    fn unresolved_version_is_fatal() {
        let err = RouteBuilder::new("https://api.example.com/{version}/models")
            .id("gpt-4o")
            .build()
            .unwrap_err();
        assert!(matches!(err, RouteError::UnresolvedVersion { .. }));
    }

    #[test]
    fn empty_id_is_skipped() {
        let url = RouteBuilder::new("https://api.example.com/v1/models")
            .id("")
            .build()
            .expect("route should build");
        assert_eq!(url, "https://api.example.com/v1/models");
    }

    #[test]
    fn duplicate_id_first_wins() {
        let url = RouteBuilder::new("https://api.example.com/v1/models")
            .id("first")
            .id("second")
            .build()
            .expect("route should build");
        assert_eq!(url, "https://api.example.com/v1/models/first");
    }

    #[test]
    fn duplicate_method_first_wins() {
        let url = RouteBuilder::new("https://api.example.com/v1/models/gemini")
            .method("generateContent")
            .method("streamGenerateContent")
            .build()
            .expect("route should build");
        assert_eq!(
            url,
            "https://api.example.com/v1/models/gemini:generateContent"
        );
    }

    #[test]
    fn query_params_are_encoded_and_joined() {
        let url = RouteBuilder::new("https://api.example.com/v1/models")
            .query("pageSize", "10")
            .query("filter", "name=a&b")
            .build()
            .expect("route should build");
        assert_eq!(url.matches('?').count(), 1);
        assert!(url.ends_with("?pageSize=10&filter=name%3Da%26b"));
    }

    #[test]
    fn method_precedes_query_string() {
        let url = RouteBuilder::new("https://api.example.com/{version}/models/{id}")
            .version("v1beta")
            .id("gemini-2.0-flash")
            .method("streamGenerateContent")
            .query("alt", "sse")
            .build()
            .expect("route should build");
        assert_eq!(
            url,
            "https://api.example.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn child_segments_are_appended_in_order() {
        let url = RouteBuilder::new("https://api.example.com/v1")
            .child("assistants")
            .id("asst_123")
            .child("files")
            .build()
            .expect("route should build");
        assert_eq!(url, "https://api.example.com/v1/assistants/asst_123/files");
    }
}
