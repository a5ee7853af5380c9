use crate::common::response::JobOutcome;
use crate::modules::media::events::MediaJob;
use crate::modules::media::service::MediaService;
use crate::state::AppState;
use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::BasicAckOptions;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub async fn start_transcoder_worker(state: AppState) -> anyhow::Result<()> {
    info!("🎥 Starting media worker...");

    let queue_name = state.config.job_queue.clone();
    let concurrency = state.config.worker_concurrency;
    let prefetch = u16::try_from(concurrency).unwrap_or(u16::MAX);

    let mut consumer = state
        .queue
        .consume(&queue_name, "media_worker", prefetch)
        .await?;

    info!("🎥 Media worker listening on '{}' ({} concurrent jobs)", queue_name, concurrency);

    // Jobs run concurrently up to the limit; each owns its own staging directory.
    let permits = Arc::new(Semaphore::new(concurrency));

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(e) => {
                error!("Consumer error: {}", e);
                continue;
            }
        };

        let permit = permits.clone().acquire_owned().await?;
        let state = state.clone();

        tokio::spawn(async move {
            handle_delivery(&state, delivery).await;
            drop(permit);
        });
    }

    warn!("Media worker consumer stream ended");
    Ok(())
}

async fn handle_delivery(state: &AppState, delivery: Delivery) {
    info!("📦 Received media job");

    let outcome = match serde_json::from_slice::<MediaJob>(&delivery.data) {
        Ok(job) => process_job(&state.media, job).await,
        Err(e) => {
            error!("❌ Failed to parse job: {}", e);
            JobOutcome::error(None, "unknown", &format!("Malformed job payload: {}", e), true)
        }
    };

    match serde_json::to_vec(&outcome) {
        Ok(payload) => {
            if let Err(e) = state.queue.publish(&state.config.result_queue, &payload).await {
                error!("Failed to publish outcome for {:?}: {}", outcome.request_id, e);
            }
        }
        Err(e) => error!("Failed to serialize outcome: {}", e),
    }

    // Failed jobs are acked too; redelivering a poison message would loop forever.
    if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
        error!("Failed to ack message: {}", e);
    }
}

pub async fn process_job(media: &MediaService, job: MediaJob) -> JobOutcome {
    let request_id = job.request_id();
    let kind = job.kind();
    info!("Processing {} job {}", kind, request_id);

    let result = match job {
        MediaJob::Hls {
            source_path,
            owner_id,
            ..
        } => media
            .transcode_to_hls(&source_path, &owner_id)
            .await
            .map(|r| JobOutcome::success(request_id, kind, &r, "HLS package ready")),
        MediaJob::AutoThumbnail {
            source_path,
            owner_id,
            timestamp,
            ..
        } => media
            .generate_auto_thumbnail(&source_path, &owner_id, timestamp)
            .await
            .map(|r| JobOutcome::success(request_id, kind, &r, "Thumbnail generated")),
        MediaJob::ThumbnailAt {
            source_path,
            owner_id,
            timestamp,
            ..
        } => media
            .generate_thumbnail_at_timestamp(&source_path, &owner_id, timestamp)
            .await
            .map(|r| JobOutcome::success(request_id, kind, &r, "Thumbnail generated")),
        MediaJob::Frames {
            source_path,
            owner_id,
            frame_count,
            ..
        } => media
            .extract_multiple_frames(&source_path, &owner_id, frame_count)
            .await
            .map(|r| JobOutcome::success(request_id, kind, &r, "Frames extracted")),
        MediaJob::CheckManifest { manifest_path, .. } => {
            let exists = media.check_hls_manifest_exists(&manifest_path).await;
            Ok(JobOutcome::success(
                request_id,
                kind,
                &serde_json::json!({ "exists": exists }),
                "Manifest checked",
            ))
        }
    };

    result.unwrap_or_else(|e| {
        error!("❌ {} job {} failed: {}", kind, request_id, e);
        JobOutcome::error(Some(request_id), kind, &e.to_string(), e.is_client_error())
    })
}
