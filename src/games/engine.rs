//! Round engine: owns the balance, selection and seeds, and drives one round
//! at a time through `Idle -> Committed -> Revealing -> Settled -> Idle`.
//!
//! `start_round` hands back a [`Round`] that mutably borrows the engine, so no
//! configuration call can land until the round has settled. The draw is fixed
//! the moment the round is committed; the reveal only paces how it is shown.

use crate::common::config::KenoConfig;
use crate::common::traits::{RevealScheduler, SeedSource};
use crate::errors::RoundError;
use crate::games::commitment::{commit_extended, CommitmentDigest};
use crate::games::draw::DrawExtractor;
use crate::games::payout::{DifficultyTier, PayoutTable};
use crate::games::scheduler::TokioScheduler;
use crate::games::seed::OsSeedSource;
use crate::games::types::{
    AuditInfo, CommitmentMode, Draw, RoundEvent, RoundRecord, RoundState, Seed, Selection,
    Settlement, StakeAdjustment, MAX_SELECTION, NUMBER_RANGE,
};
use futures::stream::{self, Stream};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Seeds waiting to be used by the next round
#[derive(Clone)]
struct SeedPair {
    house: Seed,
    player: Seed,
}

/// State of the round currently in flight
struct ActiveRound {
    round_id: Uuid,
    stake: u64,
    house_seed: Seed,
    player_seed: Seed,
    published_hash: Option<String>,
    digest: CommitmentDigest,
    draw: Option<Draw>,
    revealed: usize,
}

/// Single-player keno engine
pub struct RoundEngine {
    seed_source: Arc<dyn SeedSource>,
    scheduler: Arc<dyn RevealScheduler>,
    extractor: DrawExtractor,
    digest_blocks: u32,
    reveal_delay: Duration,
    settle_delay: Duration,
    commitment_mode: CommitmentMode,

    state: RoundState,
    balance: u64,
    stake: u64,
    tier: DifficultyTier,
    selection: Selection,
    next_seeds: SeedPair,
    pinned_player_seed: Option<Seed>,
    active: Option<ActiveRound>,
    last_audit: Option<AuditInfo>,
    last_record: Option<RoundRecord>,
}

impl RoundEngine {
    /// Engine backed by the OS CSPRNG and real-time pacing
    pub fn new(config: &KenoConfig) -> Self {
        Self::with_components(config, Arc::new(OsSeedSource), Arc::new(TokioScheduler))
    }

    /// Engine with injected entropy and pacing
    pub fn with_components(
        config: &KenoConfig,
        seed_source: Arc<dyn SeedSource>,
        scheduler: Arc<dyn RevealScheduler>,
    ) -> Self {
        let next_seeds = SeedPair {
            house: seed_source.generate(),
            player: seed_source.generate(),
        };

        Self {
            seed_source,
            scheduler,
            extractor: DrawExtractor::new(config.draw.draw_size),
            digest_blocks: config.draw.digest_blocks.max(1),
            reveal_delay: config.reveal.reveal_delay(),
            settle_delay: config.reveal.settle_delay(),
            commitment_mode: config.engine.commitment_mode,
            state: RoundState::Idle,
            balance: config.engine.starting_balance,
            stake: config.engine.default_stake.max(1),
            tier: config.engine.default_tier,
            selection: Selection::new(),
            next_seeds,
            pinned_player_seed: None,
            active: None,
            last_audit: None,
            last_record: None,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn stake(&self) -> u64 {
        self.stake
    }

    pub fn tier(&self) -> DifficultyTier {
        self.tier
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn commitment_mode(&self) -> CommitmentMode {
        self.commitment_mode
    }

    /// SHA-256 of the house seed the next round will use. Only published in
    /// precommitted mode; fresh-per-round seeds don't exist yet.
    pub fn published_commitment(&self) -> Option<String> {
        match self.commitment_mode {
            CommitmentMode::Precommitted => Some(self.next_seeds.house.commitment_hash()),
            CommitmentMode::FreshPerRound => None,
        }
    }

    /// Seeds and digest of the most recently settled round
    pub fn audit_info(&self) -> Option<&AuditInfo> {
        self.last_audit.as_ref()
    }

    pub fn last_record(&self) -> Option<&RoundRecord> {
        self.last_record.as_ref()
    }

    /// Replace the selection. Empty is allowed here; `start_round` rejects it.
    pub fn configure_selection<I>(&mut self, numbers: I) -> Result<(), RoundError>
    where
        I: IntoIterator<Item = u8>,
    {
        self.ensure_idle()?;
        self.selection = Selection::from_numbers(numbers)?;
        Ok(())
    }

    /// Select or deselect one number. Returns whether the selection changed;
    /// an 11th number is ignored.
    pub fn toggle_number(&mut self, number: u8) -> Result<bool, RoundError> {
        self.ensure_idle()?;
        self.selection.toggle(number)
    }

    pub fn clear_selection(&mut self) -> Result<(), RoundError> {
        self.ensure_idle()?;
        self.selection.clear();
        Ok(())
    }

    /// Replace the selection with 1..=10 random distinct numbers
    pub fn quick_pick(&mut self) -> Result<&Selection, RoundError> {
        self.ensure_idle()?;

        let mut rng = rand::thread_rng();
        let count = rng.gen_range(1..=MAX_SELECTION);
        let picks = rand::seq::index::sample(&mut rng, NUMBER_RANGE as usize, count)
            .into_iter()
            .map(|i| i as u8 + 1);

        self.selection = Selection::from_numbers(picks)?;
        Ok(&self.selection)
    }

    pub fn configure_stake_and_tier(&mut self, stake: u64, tier: DifficultyTier) -> Result<(), RoundError> {
        self.ensure_idle()?;
        self.validate_stake(stake)?;

        self.stake = stake;
        self.tier = tier;
        Ok(())
    }

    /// Apply a stake preset and return the new stake. The stake never drops
    /// below one credit.
    pub fn adjust_stake(&mut self, adjustment: StakeAdjustment) -> Result<u64, RoundError> {
        self.ensure_idle()?;

        self.stake = match adjustment {
            StakeAdjustment::Half => self.stake / 2,
            StakeAdjustment::Double => self.stake.saturating_mul(2).min(self.balance),
            StakeAdjustment::Max => self.balance,
        }
        .max(1);

        Ok(self.stake)
    }

    /// Use `seed` as the player seed for the next round only
    pub fn set_player_seed(&mut self, seed: Seed) -> Result<(), RoundError> {
        self.ensure_idle()?;
        self.pinned_player_seed = Some(seed);
        Ok(())
    }

    /// `Idle -> Committed`: debit the stake, fix the seeds and compute the
    /// digest. The returned [`Round`] yields the reveal.
    pub fn start_round(&mut self) -> Result<Round<'_>, RoundError> {
        self.ensure_idle()?;
        if self.selection.is_empty() {
            return Err(RoundError::invalid_selection("select at least one number"));
        }
        self.validate_stake(self.stake)?;

        let (house_seed, player_seed, published_hash) = self.take_round_seeds();
        let digest = commit_extended(&house_seed, &player_seed, self.digest_blocks);

        self.balance -= self.stake;
        self.state = RoundState::Committed;

        let round_id = Uuid::new_v4();
        tracing::info!(
            %round_id,
            stake = self.stake,
            tier = %self.tier,
            picks = self.selection.len(),
            balance = self.balance,
            "Round committed"
        );

        self.active = Some(ActiveRound {
            round_id,
            stake: self.stake,
            house_seed,
            player_seed,
            published_hash,
            digest,
            draw: None,
            revealed: 0,
        });

        Ok(Round {
            engine: self,
            finished: false,
        })
    }

    fn ensure_idle(&self) -> Result<(), RoundError> {
        if self.state == RoundState::Idle {
            Ok(())
        } else {
            Err(RoundError::InvalidState {
                expected: RoundState::Idle.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    fn validate_stake(&self, stake: u64) -> Result<(), RoundError> {
        if stake == 0 {
            return Err(RoundError::InvalidStake("stake must be at least 1".to_string()));
        }
        if stake > self.balance {
            return Err(RoundError::InsufficientBalance {
                stake,
                balance: self.balance,
            });
        }
        Ok(())
    }

    fn take_round_seeds(&mut self) -> (Seed, Seed, Option<String>) {
        let pinned = self.pinned_player_seed.take();
        match self.commitment_mode {
            CommitmentMode::FreshPerRound => {
                let house = self.seed_source.generate();
                let player = pinned.unwrap_or_else(|| self.seed_source.generate());
                (house, player, None)
            }
            CommitmentMode::Precommitted => {
                let SeedPair { house, player } = self.next_seeds.clone();
                let published = house.commitment_hash();
                (house, pinned.unwrap_or(player), Some(published))
            }
        }
    }

    /// `Committed -> Revealing`: extract the full draw once
    fn begin_reveal(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let draw = self.extractor.extract(&active.digest.to_hex());
        if !draw.is_complete() {
            tracing::warn!(
                round_id = %active.round_id,
                produced = draw.len(),
                requested = draw.requested(),
                "Digest exhausted before full draw; settling on the shorter draw"
            );
        }

        active.draw = Some(draw);
        self.state = RoundState::Revealing;
    }

    /// Next unrevealed number, if any
    fn pending_number(&self) -> Option<(usize, u8)> {
        let active = self.active.as_ref()?;
        let draw = active.draw.as_ref()?;
        draw.numbers()
            .get(active.revealed)
            .map(|number| (active.revealed, *number))
    }

    fn reveal(&mut self, index: usize, number: u8) -> RoundEvent {
        if let Some(active) = self.active.as_mut() {
            active.revealed = index + 1;
        }
        let is_match = self.selection.contains(number);
        tracing::debug!(index, number, is_match, "Number revealed");

        RoundEvent::NumberRevealed {
            index,
            number,
            is_match,
        }
    }

    /// `Revealing -> Settled -> Idle`: credit the payout, publish the audit
    /// record and rotate the seeds
    fn settle(&mut self) -> Settlement {
        let Some(active) = self.active.take() else {
            return Settlement::no_round(self.balance);
        };

        let draw = active
            .draw
            .unwrap_or_else(|| self.extractor.extract(&active.digest.to_hex()));

        let matched = self.selection.matches(&draw);
        let match_count = matched.len();
        let multiplier = PayoutTable::multiplier(self.tier, match_count);
        let payout = PayoutTable::payout(active.stake, multiplier);
        if payout > 0 {
            self.balance = self.balance.saturating_add(payout);
        }
        self.state = RoundState::Settled;

        let settlement = Settlement {
            match_count,
            multiplier,
            payout,
            new_balance: self.balance,
            matched,
            draw_complete: draw.is_complete(),
        };

        let audit = AuditInfo {
            house_seed: active.house_seed.to_hex(),
            player_seed: active.player_seed.to_hex(),
            digest_hex: active.digest.to_hex(),
            house_seed_hash: active
                .published_hash
                .unwrap_or_else(|| active.house_seed.commitment_hash()),
        };

        tracing::info!(
            round_id = %active.round_id,
            match_count,
            multiplier,
            payout,
            balance = self.balance,
            digest = %audit.digest_hex,
            "Round settled"
        );

        self.last_record = Some(RoundRecord {
            round_id: active.round_id,
            settled_at: chrono::Utc::now(),
            commitment_mode: self.commitment_mode,
            tier: self.tier,
            stake: active.stake,
            selection: self.selection.clone(),
            draw_size: draw.requested(),
            draw: draw.numbers().to_vec(),
            audit: audit.clone(),
            settlement: settlement.clone(),
        });
        self.last_audit = Some(audit);

        self.rotate_seeds();
        settlement
    }

    fn rotate_seeds(&mut self) {
        self.next_seeds = SeedPair {
            house: self.seed_source.generate(),
            player: self.seed_source.generate(),
        };
        self.state = RoundState::Idle;
        tracing::info!("Seeds rotated for next round");
    }

    /// Run whatever is left of the round with no pacing
    fn settle_without_pacing(&mut self) -> Settlement {
        if self.state == RoundState::Committed {
            self.begin_reveal();
        }
        while let Some((index, number)) = self.pending_number() {
            self.reveal(index, number);
        }
        self.settle()
    }
}

/// A committed round in progress.
///
/// Events come out in reveal order and end with [`RoundEvent::Settled`].
/// Dropping the handle before then settles the round immediately, so a
/// debited stake is never stranded.
pub struct Round<'a> {
    engine: &'a mut RoundEngine,
    finished: bool,
}

impl<'a> Round<'a> {
    pub fn round_id(&self) -> Option<Uuid> {
        self.engine.active.as_ref().map(|active| active.round_id)
    }

    pub fn state(&self) -> RoundState {
        self.engine.state
    }

    /// Balance as seen mid-round: already debited, not yet credited
    pub fn balance(&self) -> u64 {
        self.engine.balance
    }

    /// Commitment digest fixed at `Committed`
    pub fn digest_hex(&self) -> Option<String> {
        self.engine.active.as_ref().map(|active| active.digest.to_hex())
    }

    /// Advance the round by one event. Returns `None` once the settlement
    /// event has been yielded.
    pub async fn next_event(&mut self) -> Option<RoundEvent> {
        if self.finished {
            return None;
        }

        if self.engine.state == RoundState::Committed {
            self.engine.begin_reveal();
        }

        let scheduler = self.engine.scheduler.clone();

        if let Some((index, number)) = self.engine.pending_number() {
            scheduler.delay(self.engine.reveal_delay).await;
            return Some(self.engine.reveal(index, number));
        }

        scheduler.delay(self.engine.settle_delay).await;
        let settlement = self.engine.settle();
        self.finished = true;
        Some(RoundEvent::Settled(settlement))
    }

    /// Play out the remaining reveal with pacing and return the settlement
    pub async fn run_to_completion(mut self) -> Settlement {
        while let Some(event) = self.next_event().await {
            if let RoundEvent::Settled(settlement) = event {
                return settlement;
            }
        }
        // Settlement event was already consumed through next_event
        match self.engine.last_record.as_ref() {
            Some(record) => record.settlement.clone(),
            None => Settlement::no_round(self.engine.balance),
        }
    }

    /// Consume the round as a stream of events
    pub fn into_stream(self) -> impl Stream<Item = RoundEvent> + 'a {
        stream::unfold(self, |mut round| async move {
            let event = round.next_event().await?;
            Some((event, round))
        })
    }
}

impl Drop for Round<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Round handle dropped before settlement; settling without pacing");
            self.engine.settle_without_pacing();
            self.finished = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::{ConfigBuilder, RevealConfig};
    use crate::games::scheduler::InstantScheduler;
    use crate::games::seed::SequenceSeedSource;
    use futures::StreamExt;

    fn house_seed() -> Seed {
        Seed::from_hex(&"A".repeat(64)).unwrap()
    }

    fn player_seed() -> Seed {
        Seed::from_hex(&"B".repeat(64)).unwrap()
    }

    /// House seed is always 0xAA..; the player seed is pinned per round
    fn vector_engine(balance: u64) -> RoundEngine {
        let config = ConfigBuilder::new()
            .starting_balance(balance)
            .reveal(RevealConfig::instant())
            .build();
        RoundEngine::with_components(
            &config,
            Arc::new(SequenceSeedSource::constant(house_seed())),
            Arc::new(InstantScheduler),
        )
    }

    // Draw for the 0xAA/0xBB vector with eight digest blocks
    const VECTOR_DRAW: [u8; 20] = [
        27, 66, 6, 33, 30, 47, 15, 61, 19, 23, 44, 38, 75, 65, 10, 18, 28, 11, 20, 37,
    ];

    #[tokio::test]
    async fn test_vector_round_settles_deterministically() {
        let mut engine = vector_engine(1000);
        engine.configure_selection([27, 66, 6, 1, 2]).unwrap();
        engine.configure_stake_and_tier(10, DifficultyTier::Easy).unwrap();
        engine.set_player_seed(player_seed()).unwrap();

        let round = engine.start_round().unwrap();
        let events: Vec<RoundEvent> = round.into_stream().collect().await;

        let revealed: Vec<u8> = events
            .iter()
            .filter_map(|event| match event {
                RoundEvent::NumberRevealed { number, .. } => Some(*number),
                RoundEvent::Settled(_) => None,
            })
            .collect();
        assert_eq!(revealed, VECTOR_DRAW);

        match events.last() {
            Some(RoundEvent::Settled(settlement)) => {
                assert_eq!(settlement.match_count, 3);
                assert_eq!(settlement.multiplier, 8);
                assert_eq!(settlement.payout, 80);
                assert_eq!(settlement.new_balance, 1000 - 10 + 80);
                assert_eq!(settlement.matched, vec![27, 66, 6]);
                assert!(settlement.draw_complete);
            }
            other => panic!("Expected settlement last, got {:?}", other),
        }

        let audit = engine.audit_info().unwrap();
        assert_eq!(audit.house_seed, "aa".repeat(32));
        assert_eq!(audit.player_seed, "bb".repeat(32));
        assert!(audit
            .digest_hex
            .starts_with("94a7c95aed2171b1ebe335052a8bb690df9563adf3462d9e8d52304e48d982ec"));
        assert_eq!(engine.state(), RoundState::Idle);
    }

    #[tokio::test]
    async fn test_balance_debited_before_reveal() {
        let mut engine = vector_engine(100);
        engine.configure_selection([79, 80]).unwrap();
        engine.configure_stake_and_tier(40, DifficultyTier::Hard).unwrap();
        engine.set_player_seed(player_seed()).unwrap();

        let mut round = engine.start_round().unwrap();
        assert_eq!(round.state(), RoundState::Committed);
        assert_eq!(round.balance(), 60);

        let first = round.next_event().await;
        assert!(matches!(first, Some(RoundEvent::NumberRevealed { index: 0, number: 27, .. })));
        assert_eq!(round.state(), RoundState::Revealing);
        assert_eq!(round.balance(), 60);

        let settlement = round.run_to_completion().await;
        assert_eq!(settlement.payout, 0);
        assert_eq!(engine.balance(), 60);
    }

    #[tokio::test]
    async fn test_max_stake_loss_leaves_zero_balance() {
        let mut engine = vector_engine(25);
        engine.configure_selection([79, 80]).unwrap();
        assert_eq!(engine.adjust_stake(StakeAdjustment::Max), Ok(25));
        engine.set_player_seed(player_seed()).unwrap();

        let settlement = engine.start_round().unwrap().run_to_completion().await;

        assert_eq!(settlement.match_count, 0);
        assert_eq!(settlement.new_balance, 0);
        assert_eq!(engine.balance(), 0);
        assert!(matches!(
            engine.start_round().map(|_| ()),
            Err(RoundError::InsufficientBalance { stake: 25, balance: 0 })
        ));
    }

    #[tokio::test]
    async fn test_rejections_do_not_mutate() {
        let mut engine = vector_engine(50);

        assert!(matches!(
            engine.start_round().map(|_| ()),
            Err(RoundError::InvalidSelection { .. })
        ));

        engine.configure_selection([1, 2, 3]).unwrap();
        assert_eq!(
            engine.configure_stake_and_tier(51, DifficultyTier::Hard),
            Err(RoundError::InsufficientBalance { stake: 51, balance: 50 })
        );
        assert!(matches!(
            engine.configure_stake_and_tier(0, DifficultyTier::Hard),
            Err(RoundError::InvalidStake(_))
        ));
        assert!(engine.configure_selection(1..=11).is_err());

        assert_eq!(engine.balance(), 50);
        assert_eq!(engine.stake(), 1);
        assert_eq!(engine.tier(), DifficultyTier::Easy);
        assert_eq!(engine.selection().to_vec(), vec![1, 2, 3]);
        assert_eq!(engine.state(), RoundState::Idle);
        assert!(engine.audit_info().is_none());
    }

    #[test]
    fn test_configuration_outside_idle_is_rejected() {
        let mut engine = vector_engine(50);
        engine.configure_selection([1, 2, 3]).unwrap();
        engine.state = RoundState::Revealing;

        assert_eq!(
            engine.toggle_number(4),
            Err(RoundError::InvalidState {
                expected: "idle",
                actual: "revealing"
            })
        );
        assert!(matches!(
            engine.configure_stake_and_tier(5, DifficultyTier::Hard),
            Err(RoundError::InvalidState { .. })
        ));
        assert!(matches!(engine.clear_selection(), Err(RoundError::InvalidState { .. })));
        assert_eq!(engine.selection().to_vec(), vec![1, 2, 3]);
        assert_eq!(engine.stake(), 1);
    }

    #[tokio::test]
    async fn test_dropped_round_still_settles() {
        let mut engine = vector_engine(100);
        engine.configure_selection([27]).unwrap();
        engine.configure_stake_and_tier(5, DifficultyTier::Easy).unwrap();
        engine.set_player_seed(player_seed()).unwrap();

        {
            let mut round = engine.start_round().unwrap();
            round.next_event().await;
        }

        assert_eq!(engine.state(), RoundState::Idle);
        // one match on easy pays 3x
        assert_eq!(engine.balance(), 100 - 5 + 15);
        assert_eq!(engine.last_record().unwrap().draw, VECTOR_DRAW.to_vec());
    }

    #[tokio::test]
    async fn test_stake_adjustments() {
        let mut engine = vector_engine(30);
        engine.configure_stake_and_tier(10, DifficultyTier::Easy).unwrap();

        assert_eq!(engine.adjust_stake(StakeAdjustment::Double), Ok(20));
        assert_eq!(engine.adjust_stake(StakeAdjustment::Double), Ok(30));
        assert_eq!(engine.adjust_stake(StakeAdjustment::Half), Ok(15));
        engine.configure_stake_and_tier(1, DifficultyTier::Easy).unwrap();
        assert_eq!(engine.adjust_stake(StakeAdjustment::Half), Ok(1));
    }

    #[test]
    fn test_quick_pick_bounds() {
        let mut engine = vector_engine(10);
        for _ in 0..50 {
            let selection = engine.quick_pick().unwrap();
            assert!((1..=MAX_SELECTION).contains(&selection.len()));
            assert!(selection.iter().all(|n| (1..=NUMBER_RANGE).contains(&n)));
        }
    }

    #[tokio::test]
    async fn test_precommitted_mode_uses_published_seed() {
        let config = ConfigBuilder::new()
            .commitment_mode(CommitmentMode::Precommitted)
            .reveal(RevealConfig::instant())
            .build();
        let mut engine = RoundEngine::with_components(
            &config,
            Arc::new(crate::games::seed::OsSeedSource),
            Arc::new(InstantScheduler),
        );
        engine.configure_selection([1]).unwrap();

        let published = engine.published_commitment().unwrap();
        engine.start_round().unwrap().run_to_completion().await;

        let audit = engine.audit_info().unwrap().clone();
        assert_eq!(audit.house_seed_hash, published);
        assert_eq!(Seed::from_hex(&audit.house_seed).unwrap().commitment_hash(), published);
        assert_ne!(engine.published_commitment().unwrap(), published);
    }
}
