//! Cross-frame selector compiler benchmarks.
//!
//! Measures splitting of CSS and XPath selectors at frame boundaries:
//! - Frame depths: 0, 1, 2, 3
//! - Dialects: CSS, XPath
//!
//! Run with: cargo bench --bench selector_split
//! Results saved to: target/criterion/

use std::hint::black_box;

use cdp_scope::By;
use cdp_scope::dom::compiler::{crosses_frames, split_frame_segments};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const FRAME_DEPTHS: &[usize] = &[0, 1, 2, 3];

// ============================================================================
// Selector Builders
// ============================================================================

fn css_selector(depth: usize) -> By {
    let mut parts: Vec<String> = (0..depth)
        .map(|i| format!("div.wrapper > iframe#frame-{i}"))
        .collect();
    parts.push("form[name=\"checkout\"] button.pay:not([disabled])".to_string());
    By::css(parts.join(" "))
}

fn xpath_selector(depth: usize) -> By {
    let mut selector: String = (0..depth)
        .map(|i| format!("//div[@class='wrapper']/iframe[@id='frame-{i}']"))
        .collect();
    selector.push_str("//form[@name='checkout']//button[contains(text(), 'Pay now')]");
    By::xpath(selector)
}

// ============================================================================
// Benchmark: Split
// ============================================================================

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_frame_segments");

    for &depth in FRAME_DEPTHS {
        let css = css_selector(depth);
        group.bench_with_input(BenchmarkId::new("css", depth), &css, |b, by| {
            b.iter(|| split_frame_segments(black_box(by)));
        });

        let xpath = xpath_selector(depth);
        group.bench_with_input(BenchmarkId::new("xpath", depth), &xpath, |b, by| {
            b.iter(|| split_frame_segments(black_box(by)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Detection
// ============================================================================

fn bench_crosses_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("crosses_frames");

    let inputs = [
        ("css_plain", css_selector(0)),
        ("css_framed", css_selector(2)),
        ("xpath_plain", xpath_selector(0)),
        ("xpath_framed", xpath_selector(2)),
    ];

    for (name, by) in &inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), by, |b, by| {
            b.iter(|| crosses_frames(black_box(by)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_split, bench_crosses_frames);
criterion_main!(benches);
