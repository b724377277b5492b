//! Time-shifted ("playback") recordings of IPTV channels.
//!
//! Head-ends serve past programmes from the live URL when it carries a time
//! range: Huawei-style `/PLTV/` paths take `playseek=<start>-<end>` in
//! server-local time, most others take `starttime=`/`endtime=` in UTC.

use super::RecordingTarget;
use crate::format::rtsp::TransportMode;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Local, TimeZone, Utc};
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

const PLAYSEEK_FORMAT: &str = "%Y%m%d%H%M%S";
const STARTTIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// The server is asked for one extra minute past the window end.
const END_PADDING_MINUTES: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl PlaybackWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    /// Media duration to record; `None` for an empty or inverted window.
    pub fn target_duration(&self) -> Option<Duration> {
        (self.end - self.start).to_std().ok().filter(|d| !d.is_zero())
    }

    pub fn starts_after(&self, now: DateTime<Utc>) -> bool {
        self.start > now
    }

    /// Recording target for this window, named after `task_name`.
    pub fn target(
        &self,
        url: &str,
        record_dir: &Path,
        task_name: &str,
        transport: TransportMode,
        now: DateTime<Utc>,
    ) -> RecordingTarget {
        let target = RecordingTarget::new(
            build_recording_url(url, self, now),
            record_dir.join(output_file_name(task_name)),
        )
        .with_transport(transport);

        match self.target_duration() {
            Some(duration) => target.with_duration(duration),
            None => target,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}

fn query_separator(url: &str) -> char {
    if url.contains('?') {
        '&'
    } else {
        '?'
    }
}

/// [`build_recording_url_in`] with this machine's local time zone.
pub fn build_recording_url(url: &str, window: &PlaybackWindow, now: DateTime<Utc>) -> String {
    build_recording_url_in(url, window, now, &Local)
}

/// Append the playback range to `url`.
///
/// The URL is returned unchanged when it already carries a range or when
/// the window has not started yet (a live recording).
pub fn build_recording_url_in<Tz>(
    url: &str,
    window: &PlaybackWindow,
    now: DateTime<Utc>,
    local: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if contains_ignore_case(url, "playseek=") || window.starts_after(now) {
        return url.to_string();
    }

    let padded_end = window.end + ChronoDuration::minutes(END_PADDING_MINUTES);

    if contains_ignore_case(url, "/PLTV/") {
        let start = window.start.with_timezone(local).format(PLAYSEEK_FORMAT);
        let end = padded_end.with_timezone(local).format(PLAYSEEK_FORMAT);
        return format!("{}{}playseek={}-{}", url, query_separator(url), start, end);
    }

    if contains_ignore_case(url, "starttime=") {
        return url.to_string();
    }

    let start = window.start.with_timezone(&Utc).format(STARTTIME_FORMAT);
    let end = padded_end.with_timezone(&Utc).format(STARTTIME_FORMAT);
    format!(
        "{}{}starttime={}&endtime={}",
        url,
        query_separator(url),
        start,
        end
    )
}

/// File name for a task: the task name with a `.ts` extension.
pub fn output_file_name(task_name: &str) -> String {
    if task_name.to_ascii_lowercase().ends_with(".ts") {
        task_name.to_string()
    } else {
        format!("{}.ts", task_name)
    }
}

/// `<prefix>_<channel>_<start>_<end>`, times in the window's own offset.
pub fn task_name(prefix: Option<&str>, channel: &str, window: &PlaybackWindow) -> String {
    let prefix = prefix.map(str::trim).filter(|p| !p.is_empty()).unwrap_or("Playback");
    format!(
        "{}_{}_{}_{}",
        prefix,
        channel,
        window.start.format(PLAYSEEK_FORMAT),
        window.end.format(PLAYSEEK_FORMAT)
    )
}
