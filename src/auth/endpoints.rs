/// Adobe IMS endpoints used for the authorization-code flow.
///
/// Public clients (PKCE, no secret) must use the newer authorize/token
/// versions; the v1 token endpoint rejects them with `invalid_client`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
}

const IMS_BASE: &str = "https://ims-na1.adobelogin.com/ims";

impl Endpoints {
    pub fn for_client(has_secret: bool) -> Self {
        let (authorize, token) = if has_secret { ("v1", "v1") } else { ("v2", "v3") };
        Self {
            authorize: format!("{IMS_BASE}/authorize/{authorize}"),
            token: format!("{IMS_BASE}/token/{token}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_client_uses_newer_versions() {
        let ep = Endpoints::for_client(false);
        assert!(ep.authorize.ends_with("/authorize/v2"));
        assert!(ep.token.ends_with("/token/v3"));
    }

    #[test]
    fn test_confidential_client_uses_v1() {
        let ep = Endpoints::for_client(true);
        assert!(ep.authorize.ends_with("/authorize/v1"));
        assert!(ep.token.ends_with("/token/v1"));
    }
}
