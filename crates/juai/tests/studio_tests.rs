//! End-to-end behavior of the `Studio` facade over scripted adapters.

mod common;

use std::time::Duration;

use common::*;
use juai::dispatch::FallbackDispatcher;
use juai::jobs::JobStatus;
use juai::router::IntentCategory;
use juai::types::EditOptions;
use juai::{
    AspectRatio, AssetKind, BatchStatus, ErrorCode, GenerationRequest, IntentRouter, Modality,
    ProductionRequest, RawStatus, Studio, StudioError, ToolId,
};

#[tokio::test(start_paused = true)]
async fn test_video_job_runs_to_completion() {
    let kling = FakeAdapter::new("kling", ToolId::Kling)
        .polls_with(vec![
            Ok(RawStatus::pending()),
            Ok(RawStatus::processing(Some(55))),
            Ok(RawStatus::succeeded("https://cdn.example/chase.mp4")),
        ])
        .build();
    let studio = studio(vec![route(ToolId::Kling, &kling)]);
    let mut events = studio.subscribe();

    let ticket = studio
        .generate_video(GenerationRequest::video("night city drive").with_tool(ToolId::Kling))
        .await
        .unwrap();

    assert_eq!(ticket.status, JobStatus::Pending);
    assert_eq!(ticket.progress, 10);
    assert_eq!(ticket.provider, "kling");
    assert!(!ticket.fallback_used);
    assert!(ticket.routing.is_none());

    let done = wait_terminal(&mut events, &ticket.job_id).await;
    assert_eq!(done.status, JobStatus::Completed);

    let status = studio.check_status(&ticket.job_id).unwrap();
    assert_eq!(status.status, JobStatus::Completed);
    assert_eq!(status.progress, 100);
    assert_eq!(status.result_url.as_deref(), Some("https://cdn.example/chase.mp4"));
    assert!(status.error.is_none());
    assert_eq!(kling.poll_count(), 3);
    assert!(studio.active_jobs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_progress_never_decreases_while_running() {
    let kling = FakeAdapter::new("kling", ToolId::Kling)
        .polls_with(vec![
            Ok(RawStatus::processing(Some(70))),
            Ok(RawStatus::processing(Some(30))),
            Ok(RawStatus::processing(None)),
            Ok(RawStatus::succeeded("https://cdn.example/out.mp4")),
        ])
        .build();
    let studio = studio(vec![route(ToolId::Kling, &kling)]);
    let mut events = studio.subscribe();

    let ticket = studio
        .submit_generation(GenerationRequest::video("a walk in the rain").with_tool(ToolId::Kling))
        .await
        .unwrap();

    let mut seen = Vec::new();
    loop {
        let event = events.recv().await.unwrap();
        if event.job_id != ticket.job_id {
            continue;
        }
        seen.push(event.progress);
        if event.status == JobStatus::Completed {
            break;
        }
    }

    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went back: {:?}", seen);
    assert_eq!(seen.last(), Some(&100));
}

#[tokio::test(start_paused = true)]
async fn test_auto_routing_picks_intent_tool_and_rewrites_prompt() {
    let kling = FakeAdapter::new("kling", ToolId::Kling).build();
    let studio = studio(vec![route(ToolId::Kling, &kling)]);

    let ticket = studio
        .generate_video(GenerationRequest::video("자동차 추격 장면"))
        .await
        .unwrap();

    assert_eq!(ticket.tool, ToolId::Kling);
    let routing = ticket.routing.expect("auto requests carry a routing decision");
    assert_eq!(routing.intent, IntentCategory::RealismAction);
    assert_eq!(routing.detected_keywords, vec!["자동차", "추격", "장면"]);

    let seen = kling.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].prompt.starts_with("자동차 추격 장면, handheld"));
    assert!(seen[0].prompt.contains("shot on iPhone 15 Pro"));
}

#[tokio::test(start_paused = true)]
async fn test_auto_routing_prefers_candidate_matching_modality() {
    let midjourney = FakeAdapter::new("goapi:midjourney", ToolId::Midjourney).build();
    let studio = studio(vec![route(ToolId::Midjourney, &midjourney)]);

    let ticket = studio
        .generate_image(GenerationRequest::image("패션 모델 룩북"))
        .await
        .unwrap();

    // Kling is the primary for this intent but can't make images.
    assert_eq!(ticket.tool, ToolId::Midjourney);
    let routing = ticket.routing.unwrap();
    assert_eq!(routing.intent, IntentCategory::CharacterProduct);
    assert_eq!(routing.primary_tool, ToolId::Kling);
    let seen = &midjourney.seen()[0];
    assert!(seen.prompt.ends_with("studio lighting, 8k"));
    assert!(!seen.enhanced_prompt.contains("--"));
}

#[tokio::test(start_paused = true)]
async fn test_auto_routing_falls_back_to_modality_default() {
    let suno = FakeAdapter::new("goapi:suno", ToolId::Suno).build();
    let studio = studio(vec![route(ToolId::Suno, &suno)]);

    let ticket = studio
        .generate_music(GenerationRequest::music("epic movie intro"))
        .await
        .unwrap();

    assert_eq!(ticket.tool, ToolId::Suno);
    assert_eq!(ticket.routing.unwrap().intent, IntentCategory::Cinematic);
    assert_eq!(suno.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_avatar_script_is_sent_verbatim() {
    let heygen = FakeAdapter::new("heygen", ToolId::Heygen).build();
    let studio = studio(vec![route(ToolId::Heygen, &heygen)]);

    let ticket = studio
        .generate_avatar(GenerationRequest::avatar("오늘의 뉴스를 전해드립니다."))
        .await
        .unwrap();

    assert_eq!(ticket.tool, ToolId::Heygen);
    assert!(ticket.routing.is_none());
    assert_eq!(heygen.seen()[0].prompt, "오늘의 뉴스를 전해드립니다.");
}

#[tokio::test(start_paused = true)]
async fn test_style_is_resolved_and_applied() {
    let kling = FakeAdapter::new("kling", ToolId::Kling).build();
    let studio = studio(vec![route(ToolId::Kling, &kling)]);

    studio
        .generate_video(
            GenerationRequest::video("harbor at dusk")
                .with_tool(ToolId::Kling)
                .with_style("golden_hour"),
        )
        .await
        .unwrap();
    studio
        .generate_video(
            GenerationRequest::video("harbor at dusk")
                .with_tool(ToolId::Kling)
                .with_style("does_not_exist"),
        )
        .await
        .unwrap();

    let seen = kling.seen();
    assert_eq!(seen[0].style_id, "golden_hour");
    assert_eq!(seen[1].style_id, "warm_film");
    assert!(seen[0].enhanced_prompt.starts_with("harbor at dusk, "));
    assert_ne!(seen[0].enhanced_prompt, seen[1].enhanced_prompt);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_uses_fallback_and_polls_it() {
    let official = FakeAdapter::new("kling", ToolId::Kling)
        .submit_fails(transient("kling"))
        .build();
    let aggregator = FakeAdapter::new("goapi:kling", ToolId::Kling).build();
    let studio = studio(vec![route_with_fallback(ToolId::Kling, &official, &aggregator)]);
    let mut events = studio.subscribe();

    let ticket = studio
        .generate_video(GenerationRequest::video("surfers at dawn").with_tool(ToolId::Kling))
        .await
        .unwrap();

    assert!(ticket.fallback_used);
    assert_eq!(ticket.provider, "goapi:kling");
    assert_eq!(official.submit_count(), 1);
    assert_eq!(aggregator.submit_count(), 1);

    let done = wait_terminal(&mut events, &ticket.job_id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(official.poll_count(), 0);
    assert!(aggregator.poll_count() >= 1);

    let status = studio.check_status(&ticket.job_id).unwrap();
    assert!(status.fallback_used);
    assert_eq!(status.result_url, Some(aggregator.result_url()));
}

#[tokio::test(start_paused = true)]
async fn test_auth_failure_never_reaches_fallback() {
    let official = FakeAdapter::new("kling", ToolId::Kling)
        .submit_fails(auth("kling"))
        .build();
    let aggregator = FakeAdapter::new("goapi:kling", ToolId::Kling).build();
    let studio = studio(vec![route_with_fallback(ToolId::Kling, &official, &aggregator)]);

    let err = studio
        .generate_video(GenerationRequest::video("surfers").with_tool(ToolId::Kling))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::QuotaOrAuthError);
    assert_eq!(aggregator.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_both_providers_failing_reports_both_messages() {
    let official = FakeAdapter::new("kling", ToolId::Kling)
        .submit_fails(transient("kling"))
        .build();
    let aggregator = FakeAdapter::new("goapi:kling", ToolId::Kling)
        .submit_fails(transient("goapi:kling"))
        .build();
    let studio = studio(vec![route_with_fallback(ToolId::Kling, &official, &aggregator)]);

    let err = studio
        .generate_video(GenerationRequest::video("surfers").with_tool(ToolId::Kling))
        .await
        .unwrap_err();

    let api = err.to_api_error();
    assert_eq!(api.code, ErrorCode::TransientProviderError);
    assert!(api.message.contains("kling is temporarily unavailable"));
    assert!(api.message.contains("goapi:kling is temporarily unavailable"));
    assert_eq!(official.submit_count(), 1);
    assert_eq!(aggregator.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_fallback_surfaces_primary_error() {
    let official = FakeAdapter::new("kling", ToolId::Kling)
        .submit_fails(transient("kling"))
        .build();
    let aggregator = FakeAdapter::new("goapi:kling", ToolId::Kling).build();
    let studio = studio(vec![
        route_with_fallback(ToolId::Kling, &official, &aggregator).fallback_enabled(false)
    ]);

    let err = studio
        .generate_video(GenerationRequest::video("surfers").with_tool(ToolId::Kling))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::TransientProviderError);
    assert!(err.to_string().contains("without fallback"));
    assert_eq!(aggregator.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_provider_is_a_configuration_error() {
    let studio = studio(vec![]);

    let err = studio
        .generate_video(GenerationRequest::video("anything").with_tool(ToolId::Luma))
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::Dispatch(_)));
    assert_eq!(err.code(), ErrorCode::ConfigurationError);
}

#[tokio::test(start_paused = true)]
async fn test_validation_happens_before_any_network_call() {
    let creatomate = FakeAdapter::new("creatomate", ToolId::Creatomate).build();
    let kling = FakeAdapter::new("kling", ToolId::Kling).build();
    let studio = studio(vec![
        route(ToolId::Creatomate, &creatomate),
        route(ToolId::Kling, &kling),
    ]);

    let one_clip = GenerationRequest::edit("promo").with_edit(EditOptions {
        sources: vec!["https://cdn.example/a.mp4".to_string()],
        ..EditOptions::default()
    });
    let err = studio.edit_video(one_clip).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let err = studio
        .generate_image(GenerationRequest::video("wrong wrapper"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let err = studio
        .generate_video(GenerationRequest::video("  ").with_tool(ToolId::Kling))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    assert_eq!(creatomate.submit_count(), 0);
    assert_eq!(kling.submit_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_job_times_out_after_budget() {
    let kling = FakeAdapter::new("kling", ToolId::Kling)
        .polls_with(vec![Ok(RawStatus::processing(None))])
        .build();
    let studio = studio(vec![route(ToolId::Kling, &kling)]);
    let mut events = studio.subscribe();

    let ticket = studio
        .generate_video(GenerationRequest::video("slow render").with_tool(ToolId::Kling))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    let running = studio.check_status(&ticket.job_id).unwrap();
    assert_eq!(running.status, JobStatus::Processing);
    assert_eq!(studio.active_jobs().len(), 1);

    let done = wait_terminal(&mut events, &ticket.job_id).await;
    assert_eq!(done.status, JobStatus::Failed);

    let status = studio.check_status(&ticket.job_id).unwrap();
    assert_eq!(status.error_code, Some(ErrorCode::TimeoutBudgetExceeded));
    assert!(status.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert!(status.result_url.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_provider_failure_fails_job_with_message() {
    let heygen = FakeAdapter::new("heygen", ToolId::Heygen)
        .polls_with(vec![
            Ok(RawStatus::processing(None)),
            Ok(RawStatus::failed("avatar not found")),
        ])
        .build();
    let studio = studio(vec![route(ToolId::Heygen, &heygen)]);
    let mut events = studio.subscribe();

    let ticket = studio
        .generate_avatar(GenerationRequest::avatar("안녕하세요"))
        .await
        .unwrap();

    let done = wait_terminal(&mut events, &ticket.job_id).await;
    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.error.as_deref(), Some("avatar not found"));

    let status = studio.check_status(&ticket.job_id).unwrap();
    assert_eq!(status.error_code, Some(ErrorCode::ProviderRejected));
    assert_eq!(status.progress, 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_jobs_are_independent() {
    let kling = FakeAdapter::new("kling", ToolId::Kling).build();
    let flux = FakeAdapter::new("goapi:flux", ToolId::Flux)
        .polls_with(vec![Ok(RawStatus::failed("nsfw filter"))])
        .build();
    let studio = studio(vec![route(ToolId::Kling, &kling), route(ToolId::Flux, &flux)]);
    let mut events = studio.subscribe();

    let video = studio
        .generate_video(GenerationRequest::video("a").with_tool(ToolId::Kling))
        .await
        .unwrap();
    let image = studio
        .generate_image(GenerationRequest::image("b").with_tool(ToolId::Flux))
        .await
        .unwrap();
    assert_ne!(video.job_id, image.job_id);

    let mut finished = std::collections::HashMap::new();
    while finished.len() < 2 {
        let event = events.recv().await.unwrap();
        if matches!(event.status, JobStatus::Completed | JobStatus::Failed) {
            finished.insert(event.job_id.clone(), event.status);
        }
    }

    assert_eq!(finished[&video.job_id], JobStatus::Completed);
    assert_eq!(finished[&image.job_id], JobStatus::Failed);
}

#[tokio::test]
async fn test_tool_listing_reflects_availability() {
    let official = FakeAdapter::new("kling", ToolId::Kling).unavailable().build();
    let aggregator = FakeAdapter::new("goapi:kling", ToolId::Kling).build();
    let sora = FakeAdapter::new("goapi:sora", ToolId::Sora).unavailable().build();
    let studio = studio(vec![
        route_with_fallback(ToolId::Kling, &official, &aggregator),
        route(ToolId::Sora, &sora),
    ]);

    let tools = studio.list_available_tools();
    assert_eq!(tools.len(), ToolId::ALL.len());

    let kling = tools.iter().find(|t| t.id == ToolId::Kling).unwrap();
    assert!(kling.available);
    assert_eq!(kling.source_adapter.as_deref(), Some("goapi:kling"));

    let sora = tools.iter().find(|t| t.id == ToolId::Sora).unwrap();
    assert!(!sora.available);
    assert!(sora.source_adapter.is_none());

    let json = serde_json::to_value(kling).unwrap();
    assert_eq!(json["sourceAdapter"], "goapi:kling");
    assert_eq!(json["modality"], "video");
}

#[tokio::test]
async fn test_unknown_job_id() {
    let studio = studio(vec![]);
    let err = studio.check_status("00000000-0000-0000-0000-000000000000").unwrap_err();
    assert_eq!(err.to_api_error().code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_keyword_only_helpers_use_templates() {
    let studio = Studio::builder()
        .with_router(IntentRouter::keyword_only())
        .with_dispatcher(FallbackDispatcher::default())
        .build();

    assert_eq!(studio.list_style_presets()[0].id, "warm_film");
    assert_eq!(
        studio.draft_avatar_script("신제품", "friendly").await,
        "안녕하세요. 신제품에 대해 설명드리겠습니다."
    );
    assert_eq!(
        studio.suggest_music_prompt("beach vlog", "upbeat").await,
        "Instrumental only, cinematic, 90-120 BPM, upbeat, high fidelity"
    );
    assert!(studio
        .optimize_prompt("city lights", ToolId::Sora)
        .await
        .starts_with("city lights, cinematic"));

    let decision = studio.classify("뉴스 리포터", None).await;
    assert_eq!(decision.intent, IntentCategory::Informational);
    assert_eq!(decision.primary_tool, ToolId::Heygen);
}

#[tokio::test(start_paused = true)]
async fn test_production_submits_thumbnail_and_clip() {
    let midjourney = FakeAdapter::new("goapi:midjourney", ToolId::Midjourney).build();
    let kling = FakeAdapter::new("kling", ToolId::Kling).build();
    let studio = studio(vec![
        route(ToolId::Midjourney, &midjourney),
        route(ToolId::Kling, &kling),
    ]);
    let mut clip_events = studio.subscribe();
    let mut thumbnail_events = studio.subscribe();

    let request = ProductionRequest::new("봄 신상 룩북")
        .with_style("cinematic")
        .with_aspect_ratio(AspectRatio::Landscape)
        .with_duration(45);
    let batch = studio.produce(request).await.unwrap();

    assert_eq!(batch.status, BatchStatus::Accepted);
    assert!(batch.errors.is_empty());
    assert_eq!(batch.estimate.total_secs, 180);

    let thumbnail = batch.asset(AssetKind::Thumbnail).unwrap();
    let clip = batch.asset(AssetKind::Clip).unwrap();
    assert_eq!(thumbnail.tool, ToolId::Midjourney);
    assert_eq!(clip.tool, ToolId::Kling);
    assert_eq!(midjourney.seen()[0].prompt, "thumbnail, eye-catching, 봄 신상 룩북");
    assert_eq!(kling.seen()[0].style_id, "cinematic");

    let done = wait_terminal(&mut clip_events, &clip.job_id).await;
    assert_eq!(done.status, JobStatus::Completed);
    let done = wait_terminal(&mut thumbnail_events, &thumbnail.job_id).await;
    assert_eq!(done.status, JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_production_reports_partial_failure() {
    let midjourney = FakeAdapter::new("goapi:midjourney", ToolId::Midjourney)
        .submit_fails(auth("goapi:midjourney"))
        .build();
    let kling = FakeAdapter::new("kling", ToolId::Kling).build();
    let studio = studio(vec![
        route(ToolId::Midjourney, &midjourney),
        route(ToolId::Kling, &kling),
    ]);

    let batch = studio.produce(ProductionRequest::new("카페 브이로그")).await.unwrap();

    assert_eq!(batch.status, BatchStatus::Partial);
    assert!(batch.asset(AssetKind::Thumbnail).is_none());
    assert!(batch.asset(AssetKind::Clip).is_some());
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].kind, AssetKind::Thumbnail);
    assert_eq!(batch.errors[0].error.code, ErrorCode::QuotaOrAuthError);
    assert_eq!(studio.active_jobs().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_production_without_providers_fails_every_asset() {
    let studio = studio(vec![]);

    let batch = studio.produce(ProductionRequest::new("도심 야경")).await.unwrap();

    assert_eq!(batch.status, BatchStatus::Failed);
    assert!(batch.assets.is_empty());
    assert_eq!(batch.errors.len(), 2);
    assert!(batch
        .errors
        .iter()
        .all(|e| e.error.code == ErrorCode::ConfigurationError));
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_policy_still_times_out() {
    let kling = FakeAdapter::new("kling", ToolId::Kling)
        .polls_with(vec![Ok(RawStatus::processing(None))])
        .build();
    let policy = fast_policy()
        .with_interval(Duration::ZERO)
        .with_budget(Modality::Video, Duration::from_secs(2));
    let studio = Studio::builder()
        .with_router(IntentRouter::keyword_only())
        .with_dispatcher(FallbackDispatcher::new(vec![route(ToolId::Kling, &kling)]))
        .with_policy(policy)
        .build();
    let mut events = studio.subscribe();

    let ticket = studio
        .generate_video(GenerationRequest::video("slow render").with_tool(ToolId::Kling))
        .await
        .unwrap();

    let done = wait_terminal(&mut events, &ticket.job_id).await;
    assert_eq!(done.status, JobStatus::Failed);
    assert!(kling.poll_count() > 0);
    assert_eq!(
        studio.check_status(&ticket.job_id).unwrap().error_code,
        Some(ErrorCode::TimeoutBudgetExceeded)
    );
}
