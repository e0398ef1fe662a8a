//! Loading documents and model files from various sources.
//!
//! Documents can come from files, strings and HTTP URLs. Model files are
//! validated against the model JSON Schema before they are deserialized.

use std::path::Path;

use serde_json::Value;

use crate::document::{parse_document, Document};
use crate::error::{DocumentError, SchemaError};
use crate::model::ModelDescription;
use crate::validator::validate_model;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load and parse a document from a file path.
///
/// # Errors
///
/// Returns `DocumentError::FileNotFound` if the file doesn't exist,
/// `DocumentError::InvalidJson` if the file isn't valid JSON, and any
/// parser error.
pub fn load_document(path: &Path) -> Result<Document, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| DocumentError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_document_str(&content)
}

/// Parse a document from a JSON string.
///
/// # Errors
///
/// Returns `DocumentError::InvalidJson` if the string isn't valid JSON, and
/// any parser error.
pub fn load_document_str(content: &str) -> Result<Document, DocumentError> {
    let raw: Value =
        serde_json::from_str(content).map_err(|source| DocumentError::InvalidJson { source })?;
    parse_document(&raw)
}

/// Fetch and parse a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `DocumentError::NetworkError` if the request fails or the server
/// answers with an error status, and any parser error.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Document, DocumentError> {
    let network_error = |source| DocumentError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/vnd.api+json")
        .send()
        .map_err(network_error)?;

    // Check for HTTP errors before parsing
    let response = response.error_for_status().map_err(network_error)?;
    let raw: Value = response.json().map_err(network_error)?;
    parse_document(&raw)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_document_auto(source: &str) -> Result<Document, DocumentError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(DocumentError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Load a model file.
///
/// # Errors
///
/// Returns `SchemaError::FileNotFound` / `SchemaError::ReadError` for I/O
/// problems, `SchemaError::InvalidJson` for unparsable files and
/// `SchemaError::InvalidModel` for files that do not match the model format.
pub fn load_model(path: &Path) -> Result<ModelDescription, SchemaError> {
    if !path.exists() {
        return Err(SchemaError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| SchemaError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_model_str(&content)
}

/// Load a model from a JSON string.
///
/// # Errors
///
/// See [`load_model`].
pub fn load_model_str(content: &str) -> Result<ModelDescription, SchemaError> {
    let raw: Value =
        serde_json::from_str(content).map_err(|source| SchemaError::InvalidJson { source })?;
    validate_model(&raw)?;
    serde_json::from_value(raw).map_err(|source| SchemaError::InvalidJson { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PET_DOCUMENT: &str =
        r#"{"data":{"type":"pet","id":"1","attributes":{"age":1}}}"#;

    const PET_MODEL: &str = r#"{
        "entities": [{
            "name": "Pet",
            "attributes": [
                { "name": "id", "kind": "string" },
                { "name": "age", "kind": "integer16" }
            ]
        }]
    }"#;

    #[test]
    fn load_document_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", PET_DOCUMENT).unwrap();

        let document = load_document(file.path()).unwrap();
        assert_eq!(document.data.unwrap()[0].resource_type, "pet");
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/document.json"));
        let err = result.unwrap_err();
        assert!(matches!(err, DocumentError::FileNotFound { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn load_document_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not valid json").unwrap();

        let result = load_document(file.path());
        assert!(matches!(result, Err(DocumentError::InvalidJson { .. })));
    }

    #[test]
    fn load_document_str_runs_parser() {
        let err = load_document_str(r#"{"data":{"type":"pet","id":1}}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/pets"));
        assert!(is_url("http://localhost:8080/pets"));
        assert!(!is_url("/path/to/document.json"));
        assert!(!is_url("document.json"));
    }

    #[test]
    fn load_document_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", PET_DOCUMENT).unwrap();

        let result = load_document_auto(file.path().to_str().unwrap());
        assert!(result.is_ok());
    }

    #[test]
    fn load_model_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", PET_MODEL).unwrap();

        let model = load_model(file.path()).unwrap();
        assert_eq!(model.entities[0].attributes.len(), 2);
    }

    #[test]
    fn load_model_rejects_unknown_keys() {
        let err = load_model_str(r#"{"entities":[{"name":"Pet","colour":"red"}]}"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidModel { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn load_model_file_not_found() {
        let err = load_model(Path::new("/nonexistent/model.json")).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_document_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/pets/1")
                .with_status(200)
                .with_header("content-type", "application/vnd.api+json")
                .with_body(PET_DOCUMENT)
                .create();

            let document = load_document_url(&format!("{}/pets/1", server.url())).unwrap();
            assert_eq!(document.data.unwrap()[0].id.as_deref(), Some("1"));
            mock.assert();
        }

        #[test]
        fn load_document_url_404() {
            let mut server = mockito::Server::new();
            server.mock("GET", "/missing").with_status(404).create();

            let result = load_document_url(&format!("{}/missing", server.url()));
            let err = result.unwrap_err();
            assert!(matches!(err, DocumentError::NetworkError { .. }));
            assert_eq!(err.exit_code(), 3);
        }

        #[test]
        fn load_document_auto_url() {
            let mut server = mockito::Server::new();
            server
                .mock("GET", "/pets")
                .with_status(200)
                .with_body(r#"{"data":[]}"#)
                .create();

            let document = load_document_auto(&format!("{}/pets", server.url())).unwrap();
            assert_eq!(document.data, Some(Vec::new()));
        }
    }
}
