use tracing::{debug, info, warn};

use crate::controller::{ControllerError, WheelEvent, WheelHandle};

/// Presses spin until `spins` results have been revealed, the run ends or
/// the wheel refuses for good. Reveals and the end of the run are passed to
/// `report`. Returns how many spins were revealed.
pub async fn run(
    handle: &mut WheelHandle,
    spins: u32,
    mut report: impl FnMut(&WheelEvent),
) -> Result<u32, ControllerError> {
    if spins == 0 {
        info!("No demo spins requested");
        return Ok(0);
    }

    let mut revealed = 0;
    while let Some(event) = handle.next_event().await {
        if let WheelEvent::SpinRevealed(_) | WheelEvent::RunComplete = &event {
            report(&event);
        }
        match event {
            WheelEvent::SessionStarted { session, segments, .. } => {
                info!("Session {} has {} segments", session, segments);
                handle.spin().await?;
            }
            WheelEvent::SpinStarted { spin_id, target, rotation } => {
                debug!("Spin {} heading to segment {} ({:.1}°)", spin_id, target, rotation);
            }
            WheelEvent::SpinRevealed(_) => {
                revealed += 1;
                if revealed == spins {
                    break;
                }
                handle.spin().await?;
            }
            WheelEvent::SpinRefused { reason, blocking } => {
                warn!("{}", reason);
                if !blocking {
                    break;
                }
                handle.next_session().await?;
            }
            WheelEvent::Countdown { session, remaining, .. } => {
                debug!("Session {}: {} left", session, remaining);
            }
            WheelEvent::SpinCancelled { spin_id } => {
                debug!("Spin {} cancelled before its reveal", spin_id);
            }
            WheelEvent::CelebrationDismissed { spin_id } => {
                debug!("Celebration for spin {} dismissed", spin_id);
            }
            WheelEvent::RunComplete => break,
        }
    }
    Ok(revealed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{spawn, Timings};
    use prize_wheel_shared::{ForceOutcome, RandSource, SpinAllocator, WheelConfig};
    use tokio::time::Instant;

    fn start(config: WheelConfig) -> WheelHandle {
        let allocator = SpinAllocator::new(config, RandSource::seeded(5)).expect("valid config");
        spawn(allocator, Timings::default(), ForceOutcome::Auto)
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_spins_returns_immediately() {
        let mut handle = start(WheelConfig::classic());
        let started = Instant::now();
        let mut reported = 0;
        let revealed = run(&mut handle, 0, |_| reported += 1).await.expect("demo");
        assert_eq!(revealed, 0);
        assert_eq!(reported, 0);
        assert_eq!(Instant::now(), started);
        handle.shutdown().await.expect("shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_requested_spins() {
        let mut handle = start(WheelConfig::classic());
        let mut reported = Vec::new();
        let revealed = run(&mut handle, 3, |event| reported.push(event.clone()))
            .await
            .expect("demo");
        assert_eq!(revealed, 3);
        assert_eq!(reported.len(), 3);
        assert!(reported.iter().all(|e| matches!(e, WheelEvent::SpinRevealed(_))));
        handle.shutdown().await.expect("shutdown");
    }
}
