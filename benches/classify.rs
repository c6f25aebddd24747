use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use refundscan::classify::Classifier;
use refundscan::model::message::RawMessage;
use refundscan::parser::body::extract_body;
use refundscan::parser::text::clean_snippet;

fn fixture_messages() -> Vec<RawMessage> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("messages.json");
    let json = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&json).unwrap()
}

fn marketing_html() -> String {
    let mut html = String::from(
        "<!DOCTYPE html><html><head><style>@media (max-width:600px){.c{width:100%}} p{margin:0}</style></head><body>",
    );
    for i in 0..200 {
        html.push_str(&format!(
            "<p class=\"c\">Item {i}: your return&nbsp;was received &amp; a refund is on the way. \
             Track it at https://shop.example/orders/{i}?ref=mail</p><!-- row {i} -->\u{200B}"
        ));
    }
    html.push_str("<script>track()</script></body></html>");
    html
}

fn bench_clean_snippet(c: &mut Criterion) {
    let html = marketing_html();
    c.bench_function("clean_snippet_marketing_html", |b| b.iter(|| clean_snippet(&html)));
}

fn bench_classify_fixtures(c: &mut Criterion) {
    let messages = fixture_messages();
    let classifier = Classifier::default();

    c.bench_function("extract_and_classify_fixtures", |b| {
        b.iter(|| {
            messages
                .iter()
                .filter_map(|m| {
                    let body = extract_body(m.payload.as_ref());
                    classifier.classify(m.header("subject").unwrap_or_default(), &body)
                })
                .count()
        })
    });
}

criterion_group!(benches, bench_clean_snippet, bench_classify_fixtures);
criterion_main!(benches);
