//! Request routing.

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use tiny_http::Method;
use url::Url;

/// What a request asks the report server for.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Banner,
    List,
    /// Render the report's own master document.
    Render { id: String, locals: Value },
    /// Render the request body as the report's master.
    Submit { id: String, locals: Value },
    NotFound,
    MethodNotAllowed,
}

impl Route {
    pub fn parse(method: &Method, url: &str) -> Self {
        let Some(parsed) = Url::parse("http://localhost/")
            .ok()
            .and_then(|base| base.join(url).ok())
        else {
            return Self::NotFound;
        };

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();

        let get = *method == Method::Get;
        match segments.as_slice() {
            [] if get => Self::Banner,
            ["reports"] if get => Self::List,
            ["reports", id] => {
                let id = percent_decode_str(id).decode_utf8_lossy().into_owned();
                let locals = query_locals(&parsed);
                match method {
                    Method::Get => Self::Render { id, locals },
                    Method::Post => Self::Submit { id, locals },
                    _ => Self::MethodNotAllowed,
                }
            }
            [] | ["reports"] => Self::MethodNotAllowed,
            _ => Self::NotFound,
        }
    }
}

/// Query pairs as template locals; a repeated key keeps its last value.
fn query_locals(url: &Url) -> Value {
    let locals: Map<String, Value> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect();
    Value::Object(locals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn get(url: &str) -> Route {
        Route::parse(&Method::Get, url)
    }

    #[test]
    fn test_fixed_routes() {
        assert_eq!(get("/"), Route::Banner);
        assert_eq!(get("/reports"), Route::List);
        assert_eq!(get("/reports/"), Route::List);
        assert_eq!(get("/elsewhere"), Route::NotFound);
        assert_eq!(get("/reports/a/b"), Route::NotFound);
    }

    #[test]
    fn test_report_with_query_locals() {
        assert_eq!(
            get("/reports/cato?param=par&name=J%C3%BCrgen+K"),
            Route::Render {
                id: "cato".into(),
                locals: json!({ "param": "par", "name": "Jürgen K" }),
            }
        );
    }

    #[test]
    fn test_encoded_report_id() {
        let Route::Render { id, locals } = get("/reports/annual%20review") else {
            panic!("expected a render route");
        };
        assert_eq!(id, "annual review");
        assert_eq!(locals, json!({}));
    }

    #[test]
    fn test_methods() {
        assert!(matches!(
            Route::parse(&Method::Post, "/reports/cato"),
            Route::Submit { .. }
        ));
        assert_eq!(Route::parse(&Method::Post, "/reports"), Route::MethodNotAllowed);
        assert_eq!(Route::parse(&Method::Delete, "/reports/cato"), Route::MethodNotAllowed);
    }

    #[test]
    fn test_dot_segments_collapse() {
        // `..` is resolved by URL parsing before routing.
        assert_eq!(get("/reports/../reports"), Route::List);
        assert_eq!(get("/reports/cato/.."), Route::List);
    }
}
