//! End-to-end principal extraction scenarios

use actix_web::{http::header::HeaderValue, test as actix_test, web, App, HttpMessage, HttpResponse};
use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use credgate_auth::{
    cookie::encode_cookie_value, AuthError, Certificate, ClientCertificates, Cookie,
    DelegationTokenCodec, Ed25519Signer, ExtractorCodecs, Principal, PrincipalExtractor,
    PrincipalKind, PrincipalSet, RemoteUser, RequestSnapshot, SsoCookieCodec, TokenClaims,
    DEFAULT_SSO_COOKIE_NAME, DEFAULT_TOKEN_HEADER,
};
use std::sync::Arc;

const USER_DN: &str = "CN=Service Account, OU=Robots, O=Example, C=CA";
const CA_DN: &str = "CN=Example CA, O=Example, C=CA";

struct Keys {
    token: Ed25519Signer,
    cookie: Ed25519Signer,
}

impl Keys {
    fn new() -> Self {
        Self {
            token: Ed25519Signer::generate(),
            cookie: Ed25519Signer::generate(),
        }
    }

    fn codecs(&self) -> ExtractorCodecs {
        ExtractorCodecs::new(
            DelegationTokenCodec::new(Arc::new(self.token.verifier())),
            SsoCookieCodec::new(Arc::new(self.cookie.verifier())),
        )
    }

    fn token(&self, user: &str, scope: &str) -> String {
        TokenClaims::new(user, Utc::now() + Duration::hours(1))
            .with_scope(scope)
            .sign(&self.token)
    }

    fn cookie_value(&self, user: &str) -> String {
        encode_cookie_value(
            &TokenClaims::new(user, Utc::now() + Duration::hours(1)),
            &self.cookie,
        )
    }

    fn sso_cookie(&self, user: &str) -> Cookie {
        Cookie::new(DEFAULT_SSO_COOKIE_NAME, self.cookie_value(user))
    }
}

fn request() -> RequestSnapshot {
    RequestSnapshot::new("/vault/data/file.fits", "ws.example.org")
}

fn certificates() -> Vec<Certificate> {
    vec![
        Certificate::new(USER_DN, CA_DN),
        Certificate::new(CA_DN, CA_DN),
    ]
}

fn set(principals: &[Principal]) -> PrincipalSet {
    principals.iter().cloned().collect()
}

#[test]
fn no_credentials_yields_empty_set() {
    let keys = Keys::new();
    let extractor = PrincipalExtractor::extract(request(), &keys.codecs()).unwrap();

    assert!(extractor.principals().is_empty());
    assert!(extractor.certificate_chain().is_none());
    assert!(extractor.delegation_token().is_none());
    assert!(extractor.sso_cookie_credential().is_none());
}

#[test]
fn remote_user_only() {
    let keys = Keys::new();
    let extractor =
        PrincipalExtractor::extract(request().with_remote_user("alice"), &keys.codecs()).unwrap();

    assert_eq!(
        extractor.principals(),
        set(&[Principal::http("alice").unwrap()])
    );
}

#[test]
fn remote_user_outranks_sso_cookie() {
    let keys = Keys::new();
    let extractor = PrincipalExtractor::extract(
        request()
            .with_remote_user("alice")
            .with_cookie(keys.sso_cookie("carol")),
        &keys.codecs(),
    )
    .unwrap();

    assert_eq!(
        extractor.principals(),
        set(&[Principal::http("alice").unwrap()])
    );
    // The cookie is still retained for callers that need it
    assert!(extractor.sso_cookie_credential().is_some());
}

#[test]
fn sso_cookie_only() {
    let keys = Keys::new();
    let extractor =
        PrincipalExtractor::extract(request().with_cookie(keys.sso_cookie("carol")), &keys.codecs())
            .unwrap();

    assert_eq!(
        extractor.principals(),
        set(&[Principal::cookie("carol").unwrap()])
    );
}

#[test]
fn delegation_token_only() {
    let keys = Keys::new();
    let extractor = PrincipalExtractor::extract(
        request().with_token(keys.token("tom", "/vault")),
        &keys.codecs(),
    )
    .unwrap();

    assert_eq!(
        extractor.principals(),
        set(&[Principal::token("tom").unwrap()])
    );
    let token = extractor.delegation_token().unwrap();
    assert_eq!(token.user().name(), "tom");
    assert_eq!(token.scope(), Some("/vault"));
}

#[test]
fn malformed_token_denies_access() {
    let keys = Keys::new();

    for raw in [
        "not-a-token".to_string(),
        keys.token("tom", "/elsewhere"),
        TokenClaims::new("tom", Utc::now() + Duration::hours(1)).sign(&keys.cookie),
        TokenClaims::new("tom", Utc::now() - Duration::hours(1)).sign(&keys.token),
    ] {
        let result = PrincipalExtractor::extract(
            request()
                .with_remote_user("alice")
                .with_token(raw),
            &keys.codecs(),
        );
        assert_matches!(result, Err(AuthError::AccessDenied(_)));
    }
}

#[test]
fn dot_segments_do_not_widen_token_scope() {
    let keys = Keys::new();

    for uri in ["/vault/../admin/secret", "/vault/%2e%2e/admin/secret"] {
        let result = PrincipalExtractor::extract(
            RequestSnapshot::new(uri, "ws.example.org").with_token(keys.token("tom", "/vault")),
            &keys.codecs(),
        );
        assert_matches!(result, Err(AuthError::AccessDenied(_)));
    }
}

#[test]
fn only_the_token_can_abort_extraction() {
    let keys = Keys::new();
    let extractor = PrincipalExtractor::extract(
        request()
            .with_remote_user("a".repeat(4096))
            .with_certificates(vec![Certificate::new("", CA_DN)])
            .with_cookie(Cookie::new(DEFAULT_SSO_COOKIE_NAME, "%%%"))
            .with_cookie(Cookie::new(
                DEFAULT_SSO_COOKIE_NAME,
                keys.cookie_value(&"c".repeat(4096)),
            )),
        &keys.codecs(),
    )
    .unwrap();

    assert!(extractor.principals().is_empty());
    assert!(extractor.certificate_chain().is_none());
    assert!(extractor.sso_cookie_credential().is_none());
}

#[test]
fn forged_cookie_is_ignored() {
    let keys = Keys::new();
    let forger = Ed25519Signer::generate();
    let forged = encode_cookie_value(
        &TokenClaims::new("carol", Utc::now() + Duration::hours(1)),
        &forger,
    );

    let extractor = PrincipalExtractor::extract(
        request().with_cookie(Cookie::new(DEFAULT_SSO_COOKIE_NAME, forged)),
        &keys.codecs(),
    )
    .unwrap();

    assert!(extractor.principals().is_empty());
    assert!(extractor.sso_cookie_credential().is_none());
}

#[test]
fn certificate_subject_coexists_with_remote_user() {
    let keys = Keys::new();
    let extractor = PrincipalExtractor::extract(
        request()
            .with_remote_user("alice")
            .with_certificates(certificates()),
        &keys.codecs(),
    )
    .unwrap();

    assert_eq!(
        extractor.principals(),
        set(&[
            Principal::http("alice").unwrap(),
            Principal::x500("cn=service account,ou=robots,o=example,c=ca").unwrap(),
        ])
    );
    assert_eq!(extractor.certificate_chain().unwrap().certificates().len(), 2);
}

#[test]
fn certificate_subject_coexists_with_delegated_user() {
    let keys = Keys::new();
    let extractor = PrincipalExtractor::extract(
        request()
            .with_certificates(certificates())
            .with_token(keys.token("tom", "/vault/data")),
        &keys.codecs(),
    )
    .unwrap();

    let kinds: Vec<PrincipalKind> = {
        let mut kinds: Vec<_> = extractor.principals().iter().map(|p| p.kind()).collect();
        kinds.sort();
        kinds
    };
    assert_eq!(kinds, vec![PrincipalKind::Token, PrincipalKind::X500]);
}

#[test]
fn first_sso_cookie_wins() {
    let keys = Keys::new();
    let carol = keys.cookie_value("carol");
    let extractor = PrincipalExtractor::extract(
        request()
            .with_cookie(Cookie::new("unrelated", "1"))
            .with_cookie(Cookie::new(DEFAULT_SSO_COOKIE_NAME, carol.clone()))
            .with_cookie(keys.sso_cookie("dave")),
        &keys.codecs(),
    )
    .unwrap();

    assert_eq!(
        extractor.principals(),
        set(&[Principal::cookie("carol").unwrap()])
    );
    assert_eq!(
        extractor.sso_cookie_credential().unwrap().value(),
        carol.as_str()
    );
}

#[test]
fn accessors_reflect_inputs() {
    let keys = Keys::new();
    let extractor = PrincipalExtractor::extract(
        request()
            .with_certificates(certificates())
            .with_token(keys.token("tom", "/vault"))
            .with_cookie(keys.sso_cookie("carol")),
        &keys.codecs(),
    )
    .unwrap();

    let chain = extractor.certificate_chain().unwrap();
    assert!(extractor.principals().contains(chain.principal()));

    let token = extractor.delegation_token().unwrap();
    assert_eq!(token.user(), &Principal::token("tom").unwrap());

    let credential = extractor.sso_cookie_credential().unwrap();
    assert_eq!(credential.domain(), "example.org");
}

async fn whoami(extractor: PrincipalExtractor) -> HttpResponse {
    let mut names: Vec<String> = extractor
        .principals()
        .into_iter()
        .map(|p| p.to_string())
        .collect();
    names.sort();
    HttpResponse::Ok().json(names)
}

#[actix_web::test]
async fn http_extractor_resolves_principals() {
    let keys = Keys::new();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(Arc::new(keys.codecs())))
            .route("/vault/{tail:.*}", web::get().to(whoami)),
    )
    .await;

    let req = actix_test::TestRequest::get()
        .uri("/vault/data/file.fits")
        .insert_header(("host", "ws.example.org"))
        .insert_header((DEFAULT_TOKEN_HEADER, keys.token("tom", "/vault")))
        .to_request();
    req.extensions_mut()
        .insert(ClientCertificates(certificates()));

    let names: Vec<String> = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        names,
        vec![
            "token:tom".to_string(),
            "x500:cn=service account,ou=robots,o=example,c=ca".to_string(),
        ]
    );
}

#[actix_web::test]
async fn http_extractor_prefers_remote_user() {
    let keys = Keys::new();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(Arc::new(keys.codecs())))
            .route("/vault/{tail:.*}", web::get().to(whoami)),
    )
    .await;

    let req = actix_test::TestRequest::get()
        .uri("/vault/data")
        .insert_header(("host", "ws.example.org"))
        .insert_header((
            "cookie",
            format!("{}={}", DEFAULT_SSO_COOKIE_NAME, keys.cookie_value("carol")),
        ))
        .to_request();
    req.extensions_mut()
        .insert(RemoteUser("alice".to_string()));

    let names: Vec<String> = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(names, vec!["http:alice".to_string()]);
}

#[actix_web::test]
async fn http_extractor_rejects_forged_token() {
    let keys = Keys::new();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(Arc::new(keys.codecs())))
            .route("/vault/{tail:.*}", web::get().to(whoami)),
    )
    .await;

    let req = actix_test::TestRequest::get()
        .uri("/vault/data")
        .insert_header((DEFAULT_TOKEN_HEADER, "userid=admin&signature=AAAA"))
        .to_request();

    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
}

#[actix_web::test]
async fn http_extractor_rejects_non_ascii_token() {
    let keys = Keys::new();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(Arc::new(keys.codecs())))
            .route("/vault/{tail:.*}", web::get().to(whoami)),
    )
    .await;

    let token = HeaderValue::from_bytes(b"userid=adm\xffin&signature=AAAA").unwrap();
    let req = actix_test::TestRequest::get()
        .uri("/vault/data")
        .insert_header((DEFAULT_TOKEN_HEADER, token))
        .to_request();
    req.extensions_mut()
        .insert(RemoteUser("alice".to_string()));

    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
}

#[actix_web::test]
async fn http_extractor_rejects_dot_segment_escape() {
    let keys = Keys::new();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(Arc::new(keys.codecs())))
            .default_service(web::to(whoami)),
    )
    .await;

    let req = actix_test::TestRequest::get()
        .uri("/vault/%2e%2e/admin/secret")
        .insert_header((DEFAULT_TOKEN_HEADER, keys.token("tom", "/vault")))
        .to_request();

    let resp = actix_test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
}
