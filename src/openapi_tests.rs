#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use crate::test_utils::test_utils::setup_test_server;
    use axum::http::StatusCode;
    use utoipa::OpenApi;
    use utoipa::openapi::{RefOr, schema::Schema};

    fn object_properties(name: &str) -> Vec<String> {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components present");
        match components.schemas.get(name) {
            Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
            _ => panic!("{name} should be an object schema"),
        }
    }

    #[test]
    fn test_health_schema_fields() {
        let properties = object_properties("HealthResponse");
        for field in ["status", "version", "database"] {
            assert!(properties.iter().any(|p| p == field), "missing {field}");
        }
    }

    #[test]
    fn test_health_documents_only_success() {
        let openapi = ApiDoc::openapi();
        let health = openapi.paths.paths.get("/health").expect("health path");
        let json = serde_json::to_value(health).expect("path item serializes");
        let responses = json["get"]["responses"].as_object().expect("responses");

        let codes: Vec<&String> = responses.keys().collect();
        assert_eq!(codes, vec!["200"]);
    }

    #[test]
    fn test_document_lists_health_path() {
        let openapi = ApiDoc::openapi();
        assert!(openapi.paths.paths.contains_key("/health"));
        assert_eq!(openapi.info.title, "Warbler");
    }

    #[tokio::test]
    async fn test_openapi_json_is_served() {
        let (server, _state) = setup_test_server().await;

        let response = server.get("/api-docs/openapi.json").await;

        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert!(body["paths"]["/health"]["get"].is_object());
    }
}
