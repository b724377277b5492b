use rtsprec::config;
use rtsprec::record::playback::output_file_name;
use rtsprec::record::{
    RecordingProgress, RecordingService, RecordingStatus, RecordingTarget, RTSPRecordingService,
};
use std::error::Error;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const RTSP_URL: &str = "rtsp://example.com/PLTV/88888888/224/3221225618/index.smil";

// usage: record [rtsp-url] [seconds] [name]
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| RTSP_URL.to_string());
    let seconds: u64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(0);
    let name = args.next().unwrap_or_else(|| "demo".to_string());

    let config = config::get_config();
    let output = config.record_path.join(output_file_name(&name));

    let mut target = RecordingTarget::new(url, &output).with_transport(config.transport());
    if seconds > 0 {
        target = target.with_duration(Duration::from_secs(seconds));
    }

    println!(
        "Recording {} -> {} ({})",
        target.url,
        output.display(),
        if seconds > 0 {
            format!("{} s of media", seconds)
        } else {
            "until the stream ends".to_string()
        }
    );

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("Stopping...");
            stop.cancel();
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<RecordingProgress>();
    tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            println!(
                "{:>12} bytes  pcr {:>8}  {:>8} kbit/s",
                progress.bytes_written,
                progress
                    .pcr_elapsed_seconds
                    .map(|s| format!("{:.1}s", s))
                    .unwrap_or_else(|| "-".into()),
                progress
                    .bitrate_kbps
                    .map(|k| format!("{:.0}", k))
                    .unwrap_or_else(|| "-".into()),
            );
        }
    });

    let service = RTSPRecordingService::from_config(&config);
    let result = service.record(target, Some(tx), cancel).await;

    match result.status {
        RecordingStatus::Completed => println!(
            "Completed: {} bytes{}",
            result.bytes_written,
            if result.stopped_by_pcr { " (target duration reached)" } else { "" }
        ),
        RecordingStatus::Cancelled => println!("Cancelled after {} bytes", result.bytes_written),
        RecordingStatus::Failed => println!(
            "Failed: {}",
            result.error_message.as_deref().unwrap_or("unknown error")
        ),
    }

    Ok(())
}
