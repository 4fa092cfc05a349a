use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;

/// What an authenticator gets to see of an incoming request.
///
/// Header names are lowercase. Indexer clients usually send the key as a
/// query parameter, so the decoded query string is carried as well.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    pub fn new(source_ip: IpAddr) -> Self {
        Self {
            headers: HashMap::new(),
            query: HashMap::new(),
            source_ip,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.insert(name.to_string(), value.to_string());
        self
    }
}

/// The client a request was accepted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub client: String,
    pub method: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            client: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity() {
        let identity = Identity::anonymous();
        assert_eq!(identity.client, "anonymous");
        assert_eq!(identity.method, "none");
    }

    #[test]
    fn test_request_builder_lowercases_headers() {
        let request = AuthRequest::new("10.0.0.1".parse().unwrap())
            .with_header("X-API-Key", "k")
            .with_query("apikey", "q");
        assert_eq!(request.headers.get("x-api-key").map(String::as_str), Some("k"));
        assert_eq!(request.query.get("apikey").map(String::as_str), Some("q"));
    }
}
