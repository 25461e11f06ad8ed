//! End-to-end pipeline scenarios against mock providers: force-rule
//! resolution flowing into prompts, debug traces, and image single-output
//! plus collage handling.
use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbImage};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adgen_pipeline::context::resolver::{resolve, RawRequest};
use adgen_pipeline::guard::UsageGuard;
use adgen_pipeline::orchestrator::{ImageGenRequest, Orchestrator, TextGenRequest};
use adgen_pipeline::{Config, IndustrySource};

fn config_for(server: &MockServer) -> Config {
    Config {
        text_provider_url: server.uri(),
        text_provider_api_key: Some("test-key".to_string()),
        text_model: "test-model".to_string(),
        image_provider_url: server.uri(),
        image_provider_api_key: Some("test-key".to_string()),
        api_host: "127.0.0.1".to_string(),
        api_port: "0".to_string(),
    }
}

fn png_of(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([9, 99, 9])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn czech_automotive_brief_overrides_requested_fashion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Prodáváme prověřené vozy."}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let raw: RawRequest = serde_json::from_value(serde_json::json!({
        "brief": "Potřebuji propagovat autobazar v Brně",
        "industry": "fashion",
        "debug": true
    }))
    .unwrap();
    let pack = resolve(&raw);
    assert_eq!(pack.resolved_industry.as_str(), "automotive");
    assert_eq!(pack.sources.industry_source, IndustrySource::Force);

    let orchestrator = Orchestrator::new(&config_for(&server), Arc::new(UsageGuard::new()));
    let result = orchestrator
        .generate_text(
            &pack,
            &TextGenRequest {
                debug: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.output_text, "Prodáváme prověřené vozy.");
    let trace = result.debug.expect("debug trace requested");
    assert_eq!(trace.context_used.resolved_industry, "automotive");
    assert_eq!(trace.context_used.output_type, "text");
    assert_eq!(trace.industry_used.as_deref(), Some("automotive"));
    let system = trace.final_system_prompt.unwrap();
    assert!(system.contains("automotive"));
    assert!(system.chars().count() <= 400);
}

#[tokio::test]
async fn debug_trace_truncates_long_briefs() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .mount(&server)
        .await;

    let long_brief = format!("autoservis {}", "velmi dlouhý popis ".repeat(30));
    let pack = resolve(&RawRequest {
        brief: Some(long_brief),
        ..Default::default()
    });

    let orchestrator = Orchestrator::new(&config_for(&server), Arc::new(UsageGuard::new()));
    let result = orchestrator
        .generate_text(
            &pack,
            &TextGenRequest {
                debug: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let trace = result.debug.unwrap();
    assert_eq!(trace.context_used.brief.chars().count(), 200);
}

#[tokio::test]
async fn image_uses_first_of_many_candidates_and_flags_collage() {
    let server = MockServer::start().await;
    let urls: Vec<String> = (0..3)
        .map(|i| format!("{}/assets/{}.png", server.uri(), i))
        .collect();

    Mock::given(method("POST"))
        .and(path("/v1/generations"))
        .and(body_partial_json(serde_json::json!({"num_outputs": 1})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "output": urls })),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Provider ignored the negative prompt and returned a stacked two-panel
    // image: 1024x2304 against a 1024x1280 target.
    Mock::given(method("GET"))
        .and(path("/assets/0.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png_of(1024, 2304), "image/png"))
        .expect(1)
        .mount(&server)
        .await;
    for leftover in ["/assets/1.png", "/assets/2.png"] {
        Mock::given(method("GET"))
            .and(path(leftover))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let pack = resolve(&RawRequest {
        brief: Some("pozvánka na degustační menu".to_string()),
        ..Default::default()
    });
    assert_eq!(pack.resolved_industry.as_str(), "restaurant");

    let orchestrator = Orchestrator::new(&config_for(&server), Arc::new(UsageGuard::new()));
    let result = orchestrator
        .generate_image_background(
            &pack,
            &ImageGenRequest {
                format: Some("portrait".to_string()),
                debug: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Result is still returned, cropped to the exact target.
    assert_eq!((result.width, result.height), (1024, 1280));
    assert_eq!((result.source_width, result.source_height), (1024, 2304));
    assert!(result.public_url.ends_with("/assets/0.png"));
    let decoded = image::load_from_memory(&result.png_bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1024, 1280));

    let trace = result.debug.unwrap();
    assert_eq!(trace.suspected_collage, Some(true));
    assert_eq!(trace.multiple_outputs_returned, Some(3));
    assert_eq!(trace.hero_lock_used, Some(true));
    assert!(trace.negative_prompt.unwrap().contains("collage"));
}

#[tokio::test]
async fn from_image_passes_source_reference_and_seed_is_reproducible() {
    let server = MockServer::start().await;
    let asset = format!("{}/assets/out.png", server.uri());

    Mock::given(method("POST"))
        .and(path("/v1/generations"))
        .and(body_partial_json(
            serde_json::json!({"image": "https://cdn.example/src.png"}),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "output": [asset] })),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/assets/out.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png_of(512, 512), "image/png"))
        .mount(&server)
        .await;

    let pack = resolve(&RawRequest {
        brief: Some("restyling produktové fotky".to_string()),
        ..Default::default()
    });
    let orchestrator = Orchestrator::new(&config_for(&server), Arc::new(UsageGuard::new()));
    let req = ImageGenRequest {
        width: Some(512),
        height: Some(512),
        variation_key: Some("campaign-7".to_string()),
        source_image: Some("https://cdn.example/src.png".to_string()),
        debug: true,
        ..Default::default()
    };

    let first = orchestrator
        .generate_image_from_image(&pack, &req)
        .await
        .unwrap();
    let second = orchestrator
        .generate_image_from_image(&pack, &req)
        .await
        .unwrap();

    assert_eq!((first.width, first.height), (512, 512));

    // Same variation key compiles the same provider prompt both times.
    let first_trace = first.debug.unwrap();
    let second_trace = second.debug.unwrap();
    assert_eq!(first_trace.provider_prompt, second_trace.provider_prompt);
    assert_eq!(first_trace.suspected_collage, Some(false));
}
