//! Unit tests for request metrics

use needys_api_user::metrics::Metrics;

#[test]
fn instances_do_not_share_a_registry() {
    let first = Metrics::new().expect("metrics");
    let second = Metrics::new().expect("metrics");

    first.http_requests_total.inc();

    assert_eq!(first.http_requests_total.get(), 1);
    assert_eq!(second.http_requests_total.get(), 0);
}

#[test]
fn export_renders_text_format() {
    let metrics = Metrics::new().expect("metrics");
    metrics.http_request_duration_seconds.observe(0.25);

    let text = metrics.export().expect("export");
    assert!(text.contains("# TYPE http_requests_total counter"));
    assert!(text.contains("http_request_duration_seconds_count 1"));
}
