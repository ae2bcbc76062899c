//! `OpenAPI` document for the bus surface, embedded at compile time.

use serde_json::Value;

fn build_openapi_document() -> Value {
    match serde_json::from_str(include_str!("../../../docs/api/openapi.json")) {
        Ok(value) => value,
        Err(err) => panic!("embedded OpenAPI document is invalid JSON: {err}"),
    }
}

/// Return a fresh copy of the embedded `OpenAPI` specification.
#[must_use]
pub fn openapi_document() -> Value {
    build_openapi_document()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_describes_bus_route() {
        let doc = openapi_document();
        assert!(doc["paths"]["/bus"]["post"].is_object());
        assert!(doc["paths"]["/subscriptions"]["get"].is_object());
        assert!(doc["paths"]["/health"]["get"].is_object());
        assert!(doc["paths"]["/metrics"]["get"].is_object());
    }
}
