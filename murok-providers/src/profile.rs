use crate::request::{Body, HttpRequest, bearer_header, join_url};

/// Active child profile lookup. Turn submission is gated on the id this
/// returns, so the conversation screen fetches it as soon as it mounts.
pub fn build_child_profile_request(base_url: &str, token: &str) -> HttpRequest {
    HttpRequest {
        method: "GET".into(),
        url: join_url(base_url, "/api/users/children/me"),
        headers: vec![
            ("Accept".into(), "application/json".into()),
            bearer_header(token),
        ],
        body: Body::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_profile_lookup() {
        let req = build_child_profile_request("https://api.example.com", "tok");
        assert_eq!(req.method, "GET");
        assert!(req.url.ends_with("/api/users/children/me"));
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
    }
}
