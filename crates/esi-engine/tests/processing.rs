//! End-to-end processing tests over a stubbed fetch capability.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use esi_engine::{EsiProcessor, EsiProcessorBuilder, HostResponse, ProcessOutcome};
use esi_core::RequestDescriptor;
use esi_http::{FetchError, FetchResponse, HttpFetch};

/// Serves canned responses and counts fetches.
struct StubFetch {
    responses: HashMap<String, FetchResponse>,
    calls: AtomicUsize,
}

impl StubFetch {
    fn new(responses: HashMap<String, FetchResponse>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpFetch for StubFetch {
    async fn get(
        &self,
        uri: &str,
        _headers: &BTreeMap<String, String>,
    ) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(uri)
            .cloned()
            .ok_or_else(|| FetchError::Connection(format!("no route to {uri}")))
    }
}

fn processor_over(fetch: Arc<StubFetch>) -> EsiProcessor {
    EsiProcessorBuilder::new(fetch).build()
}

fn request() -> RequestDescriptor {
    RequestDescriptor::new("http", "example.com", "/page")
        .with_header("Cookie", "showPricesWithVat=true")
}

fn rendered(outcome: ProcessOutcome) -> Vec<String> {
    match outcome {
        ProcessOutcome::Rendered(body) => body.chunks,
        ProcessOutcome::Passthrough => panic!("expected rendered outcome"),
    }
}

#[tokio::test]
async fn test_plain_text_round_trips() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let outcome = processor
        .process(&request(), &HostResponse::new(200, "just text"))
        .await
        .unwrap();
    assert_eq!(rendered(outcome).concat(), "just text");
}

#[tokio::test]
async fn test_empty_body_renders_nothing() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let outcome = processor
        .process(&request(), &HostResponse::new(200, ""))
        .await
        .unwrap();
    assert!(rendered(outcome).is_empty());
}

#[tokio::test]
async fn test_include_is_spliced_between_text() {
    let fetch = Arc::new(StubFetch::new(HashMap::from([(
        String::from("http://host/fragment"),
        FetchResponse::new(200, "Fragment"),
    )])));
    let processor = processor_over(Arc::clone(&fetch));

    let body = r#"Pre<esi:include src="http://host/fragment"/>Post"#;
    let outcome = processor
        .process(&request(), &HostResponse::new(200, body))
        .await
        .unwrap();
    assert_eq!(rendered(outcome).concat(), "PreFragmentPost");
    assert_eq!(fetch.calls(), 1);
}

#[tokio::test]
async fn test_onerror_continue_swallows_failed_include() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let body = r#"Pre<esi:include src="http://host/down" onerror="continue"/>Post"#;
    let outcome = processor
        .process(&request(), &HostResponse::new(200, body))
        .await
        .unwrap();
    assert_eq!(rendered(outcome).concat(), "PrePost");
}

#[tokio::test]
async fn test_alt_is_fetched_when_src_fails() {
    let fetch = Arc::new(StubFetch::new(HashMap::from([(
        String::from("http://alt/fragment"),
        FetchResponse::new(200, "Alternative"),
    )])));
    let processor = processor_over(fetch);

    let body = r#"<esi:include src="http://host/down" alt="http://alt/fragment"/>"#;
    let outcome = processor
        .process(&request(), &HostResponse::new(200, body))
        .await
        .unwrap();
    assert_eq!(rendered(outcome).concat(), "Alternative");
}

#[tokio::test]
async fn test_uncaught_include_failure_fails_the_render() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let body = r#"<esi:include src="http://host/down"/>"#;
    let error = processor
        .process(&request(), &HostResponse::new(200, body))
        .await
        .unwrap_err();
    assert!(matches!(error, esi_engine::EngineError::Execute(_)));
}

#[tokio::test]
async fn test_text_tag_displays_markup_verbatim() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let body = r#"<esi:text><esi:include src="http://host/f"/></esi:text>"#;
    let outcome = processor
        .process(&request(), &HostResponse::new(200, body))
        .await
        .unwrap();
    assert_eq!(
        rendered(outcome).concat(),
        r#"<esi:include src="http://host/f"/>"#
    );
}

#[tokio::test]
async fn test_choose_picks_branch_from_request_state() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let body = concat!(
        r#"<esi:choose>"#,
        r#"<esi:when test="$(HTTP_COOKIE{showPricesWithVat})=='true'">with vat</esi:when>"#,
        r#"<esi:otherwise>without vat</esi:otherwise>"#,
        r#"</esi:choose>"#,
    );
    let outcome = processor
        .process(&request(), &HostResponse::new(200, body))
        .await
        .unwrap();
    assert_eq!(rendered(outcome).concat(), "with vat");

    let other_request = RequestDescriptor::new("http", "example.com", "/page");
    let outcome = processor
        .process(&other_request, &HostResponse::new(200, body))
        .await
        .unwrap();
    assert_eq!(rendered(outcome).concat(), "without vat");
}

#[tokio::test]
async fn test_vars_substitution_uses_request_variables() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let body = "<esi:vars>host=$(HTTP_HOST) vat=$(HTTP_COOKIE{showPricesWithVat})</esi:vars>";
    let outcome = processor
        .process(&request(), &HostResponse::new(200, body))
        .await
        .unwrap();
    assert_eq!(
        rendered(outcome).concat(),
        "host=example.com vat=true"
    );
}

#[tokio::test]
async fn test_include_within_ttl_is_fetched_once() {
    let fetch = Arc::new(StubFetch::new(HashMap::from([(
        String::from("http://host/fragment"),
        FetchResponse::new(200, "Fragment").with_header("Cache-Control", "max-age=60"),
    )])));
    let processor = processor_over(Arc::clone(&fetch));

    let body = r#"<esi:include src="http://host/fragment"/>"#;
    for _ in 0..2 {
        let outcome = processor
            .process(&request(), &HostResponse::new(200, body))
            .await
            .unwrap();
        assert_eq!(rendered(outcome).concat(), "Fragment");
    }
    assert_eq!(fetch.calls(), 1);
}

#[tokio::test]
async fn test_nested_includes_resolve_transitively() {
    let fetch = Arc::new(StubFetch::new(HashMap::from([
        (
            String::from("http://host/outer"),
            FetchResponse::new(200, r#"[<esi:include src="http://host/inner"/>]"#),
        ),
        (String::from("http://host/inner"), FetchResponse::new(200, "inner")),
    ])));
    let processor = processor_over(fetch);

    let body = r#"<esi:include src="http://host/outer"/>"#;
    let outcome = processor
        .process(&request(), &HostResponse::new(200, body))
        .await
        .unwrap();
    assert_eq!(rendered(outcome).concat(), "[inner]");
}

#[tokio::test]
async fn test_cacheable_page_replays_headers_without_reparsing() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let response = HostResponse::new(200, "cached page")
        .with_header("Cache-Control", "max-age=60")
        .with_header("Content-Language", "en");

    let first = processor.process(&request(), &response).await.unwrap();
    let ProcessOutcome::Rendered(first) = first else {
        panic!("expected rendered outcome");
    };
    assert_eq!(first.replay_headers, None);

    // The second pass hits the page cache; the cached headers come
    // back for the host to replay, and the stale body is not reparsed.
    let second = processor
        .process(&request(), &HostResponse::new(200, "different body now"))
        .await
        .unwrap();
    let ProcessOutcome::Rendered(second) = second else {
        panic!("expected rendered outcome");
    };
    assert_eq!(second.chunks.concat(), "cached page");
    let replayed = second.replay_headers.expect("headers replayed from cache");
    assert_eq!(
        replayed.get("content-language"),
        Some(&vec![String::from("en")])
    );
}

#[tokio::test]
async fn test_non_cacheable_page_is_reprocessed() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let first = processor
        .process(&request(), &HostResponse::new(200, "first"))
        .await
        .unwrap();
    assert_eq!(rendered(first).concat(), "first");
    let second = processor
        .process(&request(), &HostResponse::new(200, "second"))
        .await
        .unwrap();
    assert_eq!(rendered(second).concat(), "second");
}

#[tokio::test]
async fn test_marked_sub_request_passes_through() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let marked = request().with_header("X-Esi", "1");
    let outcome = processor
        .process(&marked, &HostResponse::new(200, "untouched"))
        .await
        .unwrap();
    assert_eq!(outcome, ProcessOutcome::Passthrough);
}

#[tokio::test]
async fn test_not_modified_passes_through() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let outcome = processor
        .process(&request(), &HostResponse::new(304, ""))
        .await
        .unwrap();
    assert_eq!(outcome, ProcessOutcome::Passthrough);
}

#[tokio::test]
async fn test_markup_error_aborts_processing() {
    let processor = processor_over(Arc::new(StubFetch::new(HashMap::new())));
    let body = r#"<esi:choose><esi:when test="broken">x</esi:when></esi:choose>"#;
    let error = processor
        .process(&request(), &HostResponse::new(200, body))
        .await
        .unwrap_err();
    assert!(matches!(error, esi_engine::EngineError::Markup(_)));
}
