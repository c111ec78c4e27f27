use crate::pipeline::{Pipeline, RunMode, RunOptions};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use producthunt_client::CandidateSource;
use radar_core::{CoreError, ErrorExt, PostTime};
use std::future::Future;
use std::pin::Pin;
use telegram_client::TelegramChannel;
use tracing::{error, info, warn};

/// A mode fired once a day at a local wall-clock time.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    pub post_time: PostTime,
    pub timezone: Tz,
    pub mode: RunMode,
    pub options: RunOptions,
}

/// The first instant strictly after `now` whose local time in `tz` is `at`.
///
/// When `at` falls in a DST gap the run moves an hour later; when it is
/// ambiguous the earlier instant wins.
pub fn next_run(now: DateTime<Utc>, at: PostTime, tz: Tz) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(at.hour, at.minute, 0).unwrap_or(NaiveTime::MIN);
    let today = now.with_timezone(&tz).date_naive();

    for offset in 0..=2 {
        let local = (today + Duration::days(offset)).and_time(time);
        let instant = tz
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
            .map(|t| t.with_timezone(&Utc));

        if let Some(instant) = instant.filter(|t| *t > now) {
            return instant;
        }
    }

    now + Duration::days(1)
}

pub fn startup_notice(post_time: PostTime, timezone: Tz, mode: &RunMode) -> String {
    format!(
        "🤖 <b>Fintech Radar Bot Started</b>\n\n\
         ⏰ Daily {} posts scheduled for {} {}\n\
         📊 Watching Product Hunt for fintech and B2B launches\n\n\
         ✅ Bot is ready and running!",
        mode.name(),
        post_time,
        timezone
    )
}

/// `None` once `shutdown` has fired, otherwise the output of `work`.
///
/// `shutdown` is borrowed so one signal registration covers the whole loop.
pub async fn unless_shutdown<W, F>(work: W, shutdown: &mut Pin<&mut F>) -> Option<W::Output>
where
    W: Future,
    F: Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = shutdown.as_mut() => None,
    }
}

/// Run `schedule` every day until Ctrl-C.
///
/// A failed connection check aborts startup. Errors from individual runs
/// are logged and the loop carries on to the next day.
pub async fn run_daily<S>(
    pipeline: &Pipeline<S, TelegramChannel>,
    schedule: &DailySchedule,
) -> Result<(), CoreError>
where
    S: CandidateSource,
{
    if let Some(channel) = pipeline.channel() {
        channel.test_connection().await?;

        let notice = startup_notice(schedule.post_time, schedule.timezone, &schedule.mode);
        match channel.send_text(&notice).await {
            Ok(()) => info!("Startup notification sent"),
            Err(e) => {
                error!("Failed to send startup notification");
                e.log_error();
            }
        }
    }

    info!(
        "Scheduler started. Daily posts scheduled for {} {}",
        schedule.post_time, schedule.timezone
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let now = Utc::now();
        let next = next_run(now, schedule.post_time, schedule.timezone);
        let wait = (next - now).to_std().unwrap_or(std::time::Duration::ZERO);
        info!(
            "Next {} run at {}",
            schedule.mode.name(),
            next.with_timezone(&schedule.timezone)
        );

        if unless_shutdown(tokio::time::sleep(wait), &mut shutdown)
            .await
            .is_none()
        {
            info!("Received shutdown signal");
            return Ok(());
        }

        info!("Executing daily post job...");
        let run = pipeline.run(&schedule.mode, &schedule.options);
        let Some(outcome) = unless_shutdown(run, &mut shutdown).await else {
            warn!("Received shutdown signal during a run, stopping");
            return Ok(());
        };
        match outcome {
            Ok(report) if report.exit_code() == 0 => {
                info!(
                    sent = report.sent,
                    selected = report.selected.len(),
                    "Daily post job completed"
                );
            }
            Ok(report) => error!(failed = report.failed, "Daily post job failed"),
            Err(e) => {
                error!("Error in daily post job");
                e.log_error();
            }
        }
    }
}
