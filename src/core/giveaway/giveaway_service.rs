// Business logic for reaction giveaways.
//
// A giveaway is a small state machine: it opens, collects entrants through a
// reaction, and leaves `Open` exactly once - by a manual draw, a manual
// cancel, or the deadline elapsing. The manual paths and the deadline path
// run as separate tasks, so the status lives in an atomic and every
// transition goes through a compare-exchange. Whoever flips `Open` first
// wins; the loser observes the failure and becomes a no-op.
//
// NO Discord dependencies here - reading the reaction tally is a port the
// infra layer implements.

use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// BOUNDS
// ============================================================================

pub const MIN_DURATION: Duration = Duration::from_secs(5);
pub const MAX_DURATION: Duration = Duration::from_secs(300);

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum GiveawayError {
    #[error("giveaway duration must be between {} and {} seconds", MIN_DURATION.as_secs(), MAX_DURATION.as_secs())]
    DurationOutOfRange,

    #[error("only the giveaway starter may operate its controls")]
    NotAuthorized,

    #[error("this giveaway has already finished")]
    AlreadyFinished,

    #[error("failed to read the reaction tally: {0}")]
    TallyError(String),
}

// ============================================================================
// PORT
// ============================================================================

/// One user who reacted with the giveaway emoji.
#[derive(Debug, Clone)]
pub struct Participant {
    pub user_id: u64,
    pub is_bot: bool,
}

/// Read capability for the current set of reactors on the giveaway message.
/// The infra layer implements this over the chat platform's reaction API.
#[async_trait]
pub trait ReactionTally: Send + Sync {
    async fn entrants(&self) -> Result<Vec<Participant>, GiveawayError>;
}

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveawayStatus {
    Open,
    Drawn,
    Cancelled,
    Expired,
}

// Atomic encoding of GiveawayStatus.
const STATUS_OPEN: u8 = 0;
const STATUS_DRAWN: u8 = 1;
const STATUS_CANCELLED: u8 = 2;
const STATUS_EXPIRED: u8 = 3;

impl GiveawayStatus {
    fn from_raw(raw: u8) -> Self {
        match raw {
            STATUS_OPEN => GiveawayStatus::Open,
            STATUS_DRAWN => GiveawayStatus::Drawn,
            STATUS_CANCELLED => GiveawayStatus::Cancelled,
            _ => GiveawayStatus::Expired,
        }
    }
}

/// The result of a draw: either a uniformly chosen winner, or nobody entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveawayOutcome {
    Winner(u64),
    NoParticipants,
}

// ============================================================================
// STATE MACHINE
// ============================================================================

/// A single giveaway. Owned by the command invocation that started it;
/// shared with the deadline task behind an `Arc`.
pub struct GiveawaySession {
    starter: u64,
    duration: Duration,
    status: AtomicU8,
}

impl GiveawaySession {
    /// Open a new giveaway. Durations outside [5, 300] seconds are rejected
    /// before any session exists.
    pub fn start(starter: u64, duration_secs: u64) -> Result<Self, GiveawayError> {
        let duration = Duration::from_secs(duration_secs);
        if duration < MIN_DURATION || duration > MAX_DURATION {
            return Err(GiveawayError::DurationOutOfRange);
        }

        Ok(Self {
            starter,
            duration,
            status: AtomicU8::new(STATUS_OPEN),
        })
    }

    #[allow(dead_code)]
    pub fn starter(&self) -> u64 {
        self.starter
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn status(&self) -> GiveawayStatus {
        GiveawayStatus::from_raw(self.status.load(Ordering::Acquire))
    }

    /// The exactly-once gate: flip `Open` to `target`, or fail if some other
    /// path got there first.
    fn transition(&self, target: u8) -> Result<(), GiveawayError> {
        self.status
            .compare_exchange(STATUS_OPEN, target, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| GiveawayError::AlreadyFinished)
    }

    /// Manual draw by the starter. Reads the tally, then atomically moves to
    /// `Drawn` and picks a winner (or reports nobody entered).
    pub async fn request_draw<R>(
        &self,
        actor: u64,
        tally: &dyn ReactionTally,
        rng: &mut R,
    ) -> Result<GiveawayOutcome, GiveawayError>
    where
        R: Rng + Send,
    {
        if actor != self.starter {
            return Err(GiveawayError::NotAuthorized);
        }
        if self.status() != GiveawayStatus::Open {
            return Err(GiveawayError::AlreadyFinished);
        }

        // Read the tally before committing the transition: a tally failure
        // must leave the session `Open` so the starter can try again.
        let entrants = tally.entrants().await?;
        self.transition(STATUS_DRAWN)?;

        Ok(self.pick_winner(entrants, rng))
    }

    /// Manual cancel by the starter.
    pub fn request_cancel(&self, actor: u64) -> Result<(), GiveawayError> {
        if actor != self.starter {
            return Err(GiveawayError::NotAuthorized);
        }

        self.transition(STATUS_CANCELLED)
    }

    /// Deadline expiry. System-triggered, so no authorization check. Returns
    /// `Ok(None)` when a manual action already finished the session - the
    /// timer lost the race and this call is a no-op.
    pub async fn on_deadline_elapsed<R>(
        &self,
        tally: &dyn ReactionTally,
        rng: &mut R,
    ) -> Result<Option<GiveawayOutcome>, GiveawayError>
    where
        R: Rng + Send,
    {
        if self.status() != GiveawayStatus::Open {
            return Ok(None);
        }

        let entrants = tally.entrants().await?;
        if self.transition(STATUS_EXPIRED).is_err() {
            return Ok(None);
        }

        Ok(Some(self.pick_winner(entrants, rng)))
    }

    /// Last-resort expiry for when the tally stays unreadable: terminate
    /// without a draw so the session still leaves `Open` exactly once and
    /// its controls do not outlive their handler.
    pub fn force_expire(&self) -> Result<(), GiveawayError> {
        self.transition(STATUS_EXPIRED)
    }

    /// Uniform choice over the qualifying entrants. Bots never qualify
    /// (the bot itself seeds the reaction); every human reactor does,
    /// the starter included - their reaction is a real opt-in, not the
    /// act of starting the giveaway.
    fn pick_winner<R: Rng>(&self, entrants: Vec<Participant>, rng: &mut R) -> GiveawayOutcome {
        let pool: Vec<u64> = entrants
            .into_iter()
            .filter(|p| !p.is_bot)
            .map(|p| p.user_id)
            .collect();

        if pool.is_empty() {
            GiveawayOutcome::NoParticipants
        } else {
            GiveawayOutcome::Winner(pool[rng.gen_range(0..pool.len())])
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    struct FixedTally(Vec<Participant>);

    #[async_trait]
    impl ReactionTally for FixedTally {
        async fn entrants(&self) -> Result<Vec<Participant>, GiveawayError> {
            Ok(self.0.clone())
        }
    }

    struct FailingTally;

    #[async_trait]
    impl ReactionTally for FailingTally {
        async fn entrants(&self) -> Result<Vec<Participant>, GiveawayError> {
            Err(GiveawayError::TallyError("gateway hiccup".to_string()))
        }
    }

    /// Fails the first `failures` reads, then answers like a normal tally.
    struct FlakyTally {
        failures: std::sync::atomic::AtomicU32,
        entrants: Vec<Participant>,
    }

    #[async_trait]
    impl ReactionTally for FlakyTally {
        async fn entrants(&self) -> Result<Vec<Participant>, GiveawayError> {
            use std::sync::atomic::Ordering;
            if self
                .failures
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(GiveawayError::TallyError("gateway hiccup".to_string()));
            }
            Ok(self.entrants.clone())
        }
    }

    fn entrant(user_id: u64) -> Participant {
        Participant {
            user_id,
            is_bot: false,
        }
    }

    fn bot(user_id: u64) -> Participant {
        Participant {
            user_id,
            is_bot: true,
        }
    }

    #[test]
    fn duration_bounds_are_enforced_before_creation() {
        assert!(matches!(
            GiveawaySession::start(1, 4),
            Err(GiveawayError::DurationOutOfRange)
        ));
        assert!(matches!(
            GiveawaySession::start(1, 301),
            Err(GiveawayError::DurationOutOfRange)
        ));
        assert!(GiveawaySession::start(1, 5).is_ok());
        assert!(GiveawaySession::start(1, 300).is_ok());
    }

    #[tokio::test]
    async fn only_the_starter_may_draw_or_cancel() {
        let session = GiveawaySession::start(1, 60).unwrap();
        let tally = FixedTally(vec![entrant(2)]);
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            session.request_draw(2, &tally, &mut rng).await,
            Err(GiveawayError::NotAuthorized)
        ));
        assert!(matches!(
            session.request_cancel(2),
            Err(GiveawayError::NotAuthorized)
        ));

        // The failed attempts left the session open.
        assert_eq!(session.status(), GiveawayStatus::Open);
    }

    #[tokio::test]
    async fn draw_excludes_bots() {
        let session = GiveawaySession::start(1, 60).unwrap();
        let tally = FixedTally(vec![bot(99), entrant(42)]);
        let mut rng = StdRng::seed_from_u64(0);

        let outcome = session.request_draw(1, &tally, &mut rng).await.unwrap();
        assert_eq!(outcome, GiveawayOutcome::Winner(42));
        assert_eq!(session.status(), GiveawayStatus::Drawn);
    }

    #[tokio::test]
    async fn the_starter_qualifies_when_they_react() {
        let session = GiveawaySession::start(1, 60).unwrap();
        let tally = FixedTally(vec![entrant(1)]);
        let mut rng = StdRng::seed_from_u64(0);

        let outcome = session.request_draw(1, &tally, &mut rng).await.unwrap();
        assert_eq!(outcome, GiveawayOutcome::Winner(1));
    }

    #[tokio::test]
    async fn draw_with_no_qualifying_entrants_reports_no_participants() {
        let session = GiveawaySession::start(1, 60).unwrap();
        // Only bots reacted.
        let tally = FixedTally(vec![bot(99), bot(98)]);
        let mut rng = StdRng::seed_from_u64(0);

        let outcome = session.request_draw(1, &tally, &mut rng).await.unwrap();
        assert_eq!(outcome, GiveawayOutcome::NoParticipants);
        assert_eq!(session.status(), GiveawayStatus::Drawn);
    }

    #[tokio::test]
    async fn tally_failure_leaves_the_session_open() {
        let session = GiveawaySession::start(1, 60).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            session.request_draw(1, &FailingTally, &mut rng).await,
            Err(GiveawayError::TallyError(_))
        ));
        assert_eq!(session.status(), GiveawayStatus::Open);

        // A later draw still works.
        let tally = FixedTally(vec![entrant(7)]);
        let outcome = session.request_draw(1, &tally, &mut rng).await.unwrap();
        assert_eq!(outcome, GiveawayOutcome::Winner(7));
    }

    #[tokio::test]
    async fn terminal_status_never_reverts() {
        let session = GiveawaySession::start(1, 60).unwrap();
        session.request_cancel(1).unwrap();
        assert_eq!(session.status(), GiveawayStatus::Cancelled);

        let tally = FixedTally(vec![entrant(2)]);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            session.request_draw(1, &tally, &mut rng).await,
            Err(GiveawayError::AlreadyFinished)
        ));
        assert!(matches!(
            session.request_cancel(1),
            Err(GiveawayError::AlreadyFinished)
        ));

        // The timer path quietly loses the race.
        let elapsed = session.on_deadline_elapsed(&tally, &mut rng).await.unwrap();
        assert!(elapsed.is_none());
        assert_eq!(session.status(), GiveawayStatus::Cancelled);
    }

    #[tokio::test]
    async fn deadline_expiry_draws_like_a_manual_draw() {
        let session = GiveawaySession::start(1, 60).unwrap();
        let tally = FixedTally(vec![entrant(5), entrant(6)]);
        let mut rng = StdRng::seed_from_u64(3);

        let outcome = session
            .on_deadline_elapsed(&tally, &mut rng)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            outcome,
            GiveawayOutcome::Winner(5) | GiveawayOutcome::Winner(6)
        ));
        assert_eq!(session.status(), GiveawayStatus::Expired);
    }

    #[tokio::test]
    async fn expiry_survives_a_transient_tally_failure() {
        let session = GiveawaySession::start(1, 60).unwrap();
        let tally = FlakyTally {
            failures: std::sync::atomic::AtomicU32::new(1),
            entrants: vec![entrant(7)],
        };
        let mut rng = StdRng::seed_from_u64(0);

        // First attempt hits the flake and must leave the session open so
        // the expiry path can try again.
        assert!(matches!(
            session.on_deadline_elapsed(&tally, &mut rng).await,
            Err(GiveawayError::TallyError(_))
        ));
        assert_eq!(session.status(), GiveawayStatus::Open);

        let outcome = session
            .on_deadline_elapsed(&tally, &mut rng)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, GiveawayOutcome::Winner(7));
        assert_eq!(session.status(), GiveawayStatus::Expired);
    }

    #[tokio::test]
    async fn force_expire_ends_a_session_with_an_unreadable_tally() {
        let session = GiveawaySession::start(1, 60).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        assert!(session
            .on_deadline_elapsed(&FailingTally, &mut rng)
            .await
            .is_err());

        session.force_expire().unwrap();
        assert_eq!(session.status(), GiveawayStatus::Expired);

        // Expiry happened exactly once; nothing can run the session again.
        assert!(matches!(
            session.force_expire(),
            Err(GiveawayError::AlreadyFinished)
        ));
        let tally = FixedTally(vec![entrant(2)]);
        assert!(matches!(
            session.request_draw(1, &tally, &mut rng).await,
            Err(GiveawayError::AlreadyFinished)
        ));
    }

    #[tokio::test]
    async fn expiry_with_no_reactions_reports_no_participants() {
        let session = GiveawaySession::start(1, 5).unwrap();
        let tally = FixedTally(Vec::new());
        let mut rng = StdRng::seed_from_u64(0);

        let outcome = session
            .on_deadline_elapsed(&tally, &mut rng)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, GiveawayOutcome::NoParticipants);
        assert_eq!(session.status(), GiveawayStatus::Expired);
    }

    #[tokio::test]
    async fn racing_draw_and_cancel_produce_exactly_one_transition() {
        for seed in 0..50u64 {
            let session = Arc::new(GiveawaySession::start(1, 60).unwrap());

            let drawer = {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    let tally = FixedTally(vec![entrant(2)]);
                    let mut rng = StdRng::seed_from_u64(seed);
                    session.request_draw(1, &tally, &mut rng).await.is_ok()
                })
            };
            let canceller = {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.request_cancel(1).is_ok() })
            };

            let (drew, cancelled) = (drawer.await.unwrap(), canceller.await.unwrap());
            assert!(
                drew ^ cancelled,
                "exactly one of draw/cancel must win (seed {seed})"
            );

            let status = session.status();
            assert!(status == GiveawayStatus::Drawn || status == GiveawayStatus::Cancelled);
        }
    }
}
