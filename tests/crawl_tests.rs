//! End-to-end crawl tests against a mock HTTP server
//!
//! These drive the full per-site pipeline: robots gating, rate limiting,
//! fetching, captcha detection, extraction, scoring and record emission.

use std::sync::Arc;
use std::time::{Duration, Instant};

use spindel::config::Settings;
use spindel::contacts::EmailType;
use spindel::crawler::{CrawlContext, SiteCrawler};
use spindel::extract::DiscoverySource;
use spindel::job::{JobConfig, JobInput, SiteSpec, Worker};
use spindel::safety::SafetyGate;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.between_requests = Duration::from_millis(10);
    settings.per_host_min_time = Duration::from_millis(100);
    settings.request_timeout = Duration::from_secs(5);
    settings.enable_cache = false;
    settings.audit_log_path = std::env::temp_dir()
        .join(format!("spindel-test-audit-{}.log", std::process::id()))
        .to_string_lossy()
        .to_string();
    settings
}

/// Context that may fetch the loopback mock server
fn test_ctx() -> CrawlContext {
    CrawlContext::with_safety(test_settings(), SafetyGate::allowing_private_targets())
        .expect("test context")
}

fn site_for(server: &MockServer) -> SiteSpec {
    let uri = url::Url::parse(&server.uri()).unwrap();
    SiteSpec {
        root_url: server.uri(),
        host: uri.host_str().unwrap().to_string(),
        company_name: "Test AB".to_string(),
    }
}

fn html_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_allow_all_robots(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(server)
        .await;
}

async fn mount_not_found_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn happy_path_emits_one_record() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<html><body>
                <a href="mailto:info@example.se">Maila oss</a>
                <a href="tel:+4684002227">Ring oss</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let result = crawler.crawl_site(&site_for(&server), 1).await;

    assert!(result.errors.is_empty());
    assert_eq!(result.emails.len(), 1);

    let records = spindel::contacts::build_records(&result);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.email, "info@example.se");
    assert_eq!(record.email_type, EmailType::Role);
    assert_eq!(record.discovery_path, DiscoverySource::Mailto);
    assert_eq!(record.phone.as_deref(), Some("+4684002227"));
    // Role localpart off the site's own domain (the mock serves from
    // 127.0.0.1): 50 + 10 = 60. On the company domain the same mailbox
    // scores 90; see the scorer's unit tests.
    assert_eq!(record.confidence, 0.60);
}

#[tokio::test]
async fn jsonld_and_mailto_both_emitted_with_social() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<html><head>
                <script type="application/ld+json">
                {"@type":"Organization","email":"kontakt@example.se",
                 "sameAs":["https://linkedin.com/company/x"]}
                </script>
            </head><body>
                <a href="mailto:info@example.se">info</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let result = crawler.crawl_site(&site_for(&server), 1).await;

    assert_eq!(result.emails.len(), 2);
    assert_eq!(result.emails["kontakt@example.se"].email_type, EmailType::Role);
    assert_eq!(result.emails["info@example.se"].email_type, EmailType::Role);
    assert_eq!(
        result.emails["kontakt@example.se"].discovery_path,
        DiscoverySource::JsonLd
    );
    assert_eq!(
        result.socials.linkedin.as_deref(),
        Some("https://linkedin.com/company/x")
    );
}

#[tokio::test]
async fn robots_disallow_prevents_all_fetches() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .mount(&server)
        .await;

    // Any page fetch would hit this and fail the expectation
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response("<a href='mailto:info@example.se'>x</a>"))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let site = site_for(&server);
    let result = crawler.crawl_site(&site, 3).await;

    // Robots skips are polite, not errors
    assert!(result.errors.is_empty());
    assert!(result.emails.is_empty());
    assert!(result.source_pages.is_empty());

    // One robots-blocked increment per attempted candidate URL
    assert_eq!(ctx.metrics.request_count("robots-blocked", &site.host), 3);
    assert_eq!(ctx.metrics.robots_blocked_count(&site.host), 3);
}

#[tokio::test]
async fn captcha_page_is_skipped_with_reason() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            "<html><head><title>Just a moment...</title></head><body></body></html>",
        ))
        .mount(&server)
        .await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let site = site_for(&server);
    let result = crawler.crawl_site(&site, 1).await;

    assert!(result.emails.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].reason.contains("Captcha detected (cloudflare)"));
    assert_eq!(ctx.metrics.request_count("captcha", &site.host), 1);
}

#[tokio::test]
async fn duplicate_email_across_pages_collapses() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<a href="mailto:info@acme.se">info</a>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/kontakt"))
        .respond_with(html_response(
            "<html><body><p>Skriv till info@acme.se</p></body></html>",
        ))
        .mount(&server)
        .await;
    mount_not_found_fallback(&server).await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let result = crawler.crawl_site(&site_for(&server), 2).await;

    assert_eq!(result.emails.len(), 1);
    let records = spindel::contacts::build_records(&result);
    assert_eq!(records.len(), 1);

    let evidence = records[0].raw_evidence.as_deref().unwrap();
    assert!(evidence.contains("mailto"));
    assert!(evidence.contains("inline"));
}

#[tokio::test]
async fn max_pages_bounds_fetches() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response("<html><body></body></html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/kontakt"))
        .respond_with(html_response("<html><body></body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let result = crawler.crawl_site(&site_for(&server), 1).await;

    assert_eq!(result.source_pages.len(), 1);
}

#[tokio::test]
async fn not_found_pages_record_errors_but_crawl_continues() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<a href="mailto:info@acme.se">info</a>"#,
        ))
        .mount(&server)
        .await;
    mount_not_found_fallback(&server).await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let site = site_for(&server);
    let result = crawler.crawl_site(&site, 3).await;

    // Root succeeded, the two candidate pages 404ed
    assert_eq!(result.emails.len(), 1);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors.iter().all(|e| e.reason.contains("404")));
    assert_eq!(ctx.metrics.request_count("404", &site.host), 2);
    assert_eq!(ctx.metrics.request_count("success", &site.host), 1);
}

#[tokio::test]
async fn blocked_status_is_classified() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let site = site_for(&server);
    let result = crawler.crawl_site(&site, 1).await;

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].reason.contains("403"));
    assert_eq!(ctx.metrics.request_count("blocked", &site.host), 1);
}

#[tokio::test]
async fn non_html_content_is_rejected() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("%PDF-1.4")
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&server)
        .await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let site = site_for(&server);
    let result = crawler.crawl_site(&site, 1).await;

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].reason.contains("Not an HTML page"));
    assert_eq!(ctx.metrics.request_count("non-html", &site.host), 1);
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    // First attempt gets a 500; the retry is served the real page
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<a href="mailto:info@acme.se">info</a>"#,
        ))
        .mount(&server)
        .await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);
    let result = crawler.crawl_site(&site_for(&server), 1).await;

    assert!(result.errors.is_empty());
    assert_eq!(result.emails.len(), 1);
}

#[tokio::test]
async fn per_host_spacing_is_enforced() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .respond_with(html_response("<html><body></body></html>"))
        .mount(&server)
        .await;

    let ctx = test_ctx();
    let crawler = SiteCrawler::new(&ctx);

    let started = Instant::now();
    let result = crawler.crawl_site(&site_for(&server), 3).await;
    let elapsed = started.elapsed();

    assert_eq!(result.source_pages.len(), 3);
    // Three admissions to one host need two 100 ms spacing intervals
    assert!(
        elapsed >= Duration::from_millis(200),
        "crawl finished too fast: {:?}",
        elapsed
    );
}

#[tokio::test]
async fn worker_produces_result_envelope() {
    let server = MockServer::start().await;
    mount_allow_all_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(
            r#"<a href="mailto:info@example.se">info</a>"#,
        ))
        .mount(&server)
        .await;
    mount_not_found_fallback(&server).await;

    let ctx = Arc::new(test_ctx());
    let worker = Worker::new(Arc::clone(&ctx));

    let job = JobInput {
        job_id: Uuid::new_v4(),
        sites: vec![site_for(&server)],
        config: JobConfig {
            max_pages: 2,
            concurrency: 1,
            tags: String::new(),
            user: "integration".to_string(),
        },
    };

    let result = worker.run_job(job).await;

    assert_eq!(result.stats.total_sites, 1);
    assert_eq!(result.stats.total_records, 1);
    assert_eq!(result.records[0].email, "info@example.se");
    // The 404 on /kontakt lands in the error envelope, job still resolves
    assert_eq!(result.errors.len(), 1);
    assert!(result.stats.avg_records_per_site > 0.99);
}
