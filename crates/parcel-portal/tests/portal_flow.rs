//! End-to-end tests against an in-process stand-in for the portal.
//!
//! The server mimics the real portal closely enough to exercise the login
//! handshake (cookies set on a redirect), the cookie echo on the deliveries
//! page, and the "login page instead of data" response of an expired session.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Form, State};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Response};
use axum::routing::{get, post};
use chrono::NaiveDate;
use parcel_portal::{
    AuthError, Credentials, DeltaDetector, ExtractError, PollError, Poller, PollerConfig, Portal,
    PortalConfig, Session, authenticate,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const FIXTURE: &str = include_str!("fixtures/deliveries.html");
const LOGIN_PAGE: &str = r#"<html><body><form id="login" method="post"></form></body></html>"#;
const USERNAME: &str = "flat12";
const PASSWORD: &str = "p&ss=word";

#[derive(Clone, Default)]
struct PortalState {
    logins: Arc<AtomicUsize>,
    omit_secondary: Arc<AtomicBool>,
}

async fn login(
    State(state): State<PortalState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let valid = form.get("res_username").map(String::as_str) == Some(USERNAME)
        && form.get("res_password").map(String::as_str) == Some(PASSWORD)
        && form.contains_key("page");
    if !valid {
        return Html(LOGIN_PAGE).into_response();
    }

    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    let session = format!("PHPSESSID=sess-{n}; path=/; HttpOnly");
    let secondary = if state.omit_secondary.load(Ordering::SeqCst) {
        "theme=dark; path=/".to_string()
    } else {
        format!("WILBURN_resdata=res-{n}; path=/")
    };

    (
        StatusCode::FOUND,
        AppendHeaders([
            (LOCATION, "/home/".to_string()),
            (SET_COOKIE, session),
            (SET_COOKIE, secondary),
        ]),
    )
        .into_response()
}

async fn home() -> Html<&'static str> {
    Html("<html><body>Welcome</body></html>")
}

async fn deliveries(headers: HeaderMap) -> Html<&'static str> {
    let cookies = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let authorised = cookies.contains("PHPSESSID=sess-") && cookies.contains("WILBURN_resdata=res-");
    if authorised {
        Html(FIXTURE)
    } else {
        Html(LOGIN_PAGE)
    }
}

async fn start_portal(state: PortalState) -> SocketAddr {
    let app = Router::new()
        .route("/login/", post(login))
        .route("/home/", get(home))
        .route("/requests/deliveries/", get(deliveries))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn portal_for(addr: SocketAddr) -> Portal {
    let config = PortalConfig::new("wilburn").with_base_url(format!("http://{addr}"));
    Portal::new(config).unwrap()
}

fn credentials() -> Credentials {
    Credentials::new(USERNAME, PASSWORD)
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_authenticate_captures_both_cookies() {
    let addr = start_portal(PortalState::default()).await;
    let portal = portal_for(addr);

    let session = authenticate(&portal, &credentials()).await.unwrap();
    assert!(session.is_valid());
    assert_eq!(session.subdomain, "wilburn");
    assert_eq!(session.session_cookie, "sess-1");
    assert_eq!(session.secondary_cookie_name, "WILBURN_resdata");
    assert_eq!(session.secondary_cookie, "res-1");
}

#[tokio::test]
async fn test_wrong_password_has_no_session_token() {
    let addr = start_portal(PortalState::default()).await;
    let portal = portal_for(addr);

    let err = authenticate(&portal, &Credentials::new(USERNAME, "nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::MissingSessionToken(name) if name == "PHPSESSID"));
}

#[tokio::test]
async fn test_missing_secondary_cookie() {
    let state = PortalState::default();
    state.omit_secondary.store(true, Ordering::SeqCst);
    let addr = start_portal(state).await;
    let portal = portal_for(addr);

    let err = authenticate(&portal, &credentials()).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingSecondaryToken(suffix) if suffix == "_resdata"));
}

#[tokio::test]
async fn test_unreachable_portal_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = authenticate(&portal_for(addr), &credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Transport { .. }));
}

#[tokio::test]
async fn test_poll_parses_fixture() {
    let addr = start_portal(PortalState::default()).await;
    let portal = portal_for(addr);
    let session = authenticate(&portal, &credentials()).await.unwrap();

    let parcels = portal.poll(&session).await.unwrap();
    assert_eq!(parcels.len(), 3);

    assert_eq!(parcels[0].code, "RM123456GB");
    assert!(parcels[0].collected);
    assert_eq!(parcels[0].collected_by, "Jane Doe");
    assert_eq!(parcels[0].collected_date, Some(ymd(2024, 1, 3)));

    assert_eq!(parcels[1].code, "DPD-88812");
    assert_eq!(parcels[1].collected_date, Some(ymd(2023, 12, 21)));

    assert_eq!(parcels[2].code, "AMZ-0042");
    assert!(!parcels[2].collected);
    assert_eq!(parcels[2].collected_by, "Concierge");
    assert_eq!(parcels[2].collected_date, None);
    assert_eq!(parcels[2].delivered_date, Some(ymd(2023, 11, 2)));
}

#[tokio::test]
async fn test_fetched_page_is_normalized() {
    let addr = start_portal(PortalState::default()).await;
    let portal = portal_for(addr);
    let session = authenticate(&portal, &credentials()).await.unwrap();

    let page = portal.fetch_deliveries_page(&session).await.unwrap();
    assert!(!page.contains('\n'));
    assert!(!page.contains('\t'));
    assert!(page.contains("historic_parcels"));
}

#[tokio::test]
async fn test_expired_session_gets_login_page() {
    let addr = start_portal(PortalState::default()).await;
    let portal = portal_for(addr);

    let err = portal
        .poll(&Session::new("wilburn", "PHPSESSID"))
        .await
        .unwrap_err();
    assert_eq!(err.stage(), "extract");
    assert!(matches!(
        err,
        PollError::Extract(ExtractError::TableNotFound(_))
    ));
}

#[tokio::test]
async fn test_unchanged_page_yields_no_new_parcels() {
    let addr = start_portal(PortalState::default()).await;
    let portal = portal_for(addr);
    let session = authenticate(&portal, &credentials()).await.unwrap();
    let mut detector = DeltaDetector::new();

    let first = detector.observe(portal.poll(&session).await.unwrap()).unwrap();
    assert_eq!(first.count(), 3);
    assert!(!first.notify);

    assert_eq!(detector.observe(portal.poll(&session).await.unwrap()), None);
}

#[tokio::test]
async fn test_poller_publishes_snapshots() {
    let addr = start_portal(PortalState::default()).await;
    let config = PollerConfig {
        poll_interval: Duration::from_millis(20),
        refresh_interval: Duration::from_secs(3600),
        retry_delay: Duration::from_millis(10),
    };
    let poller = Poller::connect(portal_for(addr), credentials(), config)
        .await
        .unwrap();
    let mut handle = poller.spawn(CancellationToken::new());

    for _ in 0..2 {
        let snapshot = tokio::time::timeout(Duration::from_secs(5), handle.recv())
            .await
            .expect("snapshot in time")
            .expect("poller still running");
        assert_eq!(snapshot.len(), 3);
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn test_poller_refreshes_session() {
    let state = PortalState::default();
    let addr = start_portal(state.clone()).await;
    let config = PollerConfig {
        poll_interval: Duration::from_secs(3600),
        refresh_interval: Duration::from_millis(50),
        retry_delay: Duration::from_millis(10),
    };
    let poller = Poller::connect(portal_for(addr), credentials(), config)
        .await
        .unwrap();
    assert_eq!(poller.session().session_cookie, "sess-1");
    let handle = poller.spawn(CancellationToken::new());

    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.session().session_cookie == "sess-1" {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session refreshed in time");

    let refreshed = handle.session();
    assert!(refreshed.is_valid());
    assert_ne!(refreshed.secondary_cookie, "res-1");
    assert!(state.logins.load(Ordering::SeqCst) >= 2);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_session() {
    let state = PortalState::default();
    let addr = start_portal(state.clone()).await;
    let config = PollerConfig {
        poll_interval: Duration::from_secs(3600),
        refresh_interval: Duration::from_millis(30),
        retry_delay: Duration::from_millis(10),
    };
    let poller = Poller::connect(portal_for(addr), credentials(), config)
        .await
        .unwrap();
    state.omit_secondary.store(true, Ordering::SeqCst);
    let handle = poller.spawn(CancellationToken::new());

    tokio::time::timeout(Duration::from_secs(5), async {
        while state.logins.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("refresh attempted in time");

    assert_eq!(handle.session().session_cookie, "sess-1");
    handle.shutdown().await;
}

#[tokio::test]
async fn test_connect_fails_on_bad_credentials() {
    let addr = start_portal(PortalState::default()).await;
    let result = Poller::connect(
        portal_for(addr),
        Credentials::new(USERNAME, "wrong"),
        PollerConfig::default(),
    )
    .await;
    assert!(matches!(result, Err(AuthError::MissingSessionToken(_))));
}
