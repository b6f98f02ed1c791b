use crate::database::GiveawayStore;
use crate::error::{AppError, AppResult};
use crate::external::{EntropyClient, Notifier};
use crate::models::*;
use crate::utils::winner;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Fixed identities injected by the fill-test debug helper.
const FAKE_ENTRANT_IDS: [&str; 5] = [
    "111111111111111111",
    "222222222222222222",
    "333333333333333333",
    "444444444444444444",
    "555555555555555555",
];

/// Giveaway lifecycle core: entry-pool mutations, the expiry scan pass,
/// winner selection and reroll. Holds injected store/notifier handles so
/// the whole lifecycle is testable without a live database or network.
///
/// The store's single-document update is the atomic commit point for state
/// transitions; every operation re-fetches current state instead of
/// trusting a previously read copy.
#[derive(Clone)]
pub struct GiveawayService {
    store: Arc<dyn GiveawayStore>,
    notifier: Arc<dyn Notifier>,
    entropy: EntropyClient,
    entry_multipliers: HashMap<String, u32>,
    dev_user_id: String,
}

impl GiveawayService {
    pub fn new(
        store: Arc<dyn GiveawayStore>,
        notifier: Arc<dyn Notifier>,
        entropy: EntropyClient,
        entry_multipliers: HashMap<String, u32>,
        dev_user_id: String,
    ) -> Self {
        Self {
            store,
            notifier,
            entropy,
            entry_multipliers,
            dev_user_id,
        }
    }

    /// Create a giveaway: post the announcement with the entry surface,
    /// then insert the record. A failed announcement means no record.
    pub async fn create(&self, req: CreateGiveawayRequest) -> AppResult<GiveawayResponse> {
        if req.title.trim().is_empty() {
            return Err(AppError::ValidationError("Title must not be empty".into()));
        }
        if !req.duration_hours.is_finite() || req.duration_hours <= 0.0 {
            return Err(AppError::ValidationError(
                "Duration must be a positive number of hours".into(),
            ));
        }

        let now = Utc::now();
        // A huge but finite duration can push the end time past the
        // representable range; reject it instead of overflowing.
        let end_time = now
            .checked_add_signed(Duration::milliseconds(
                (req.duration_hours * 3_600_000.0) as i64,
            ))
            .ok_or_else(|| AppError::ValidationError("Duration is too long".into()))?;
        let mut giveaway = Giveaway {
            id: Uuid::new_v4().to_string(),
            title: req.title,
            description: req.description,
            channel_id: req.channel_id,
            message_id: None,
            result_message_id: None,
            entrants: vec![],
            end_time,
            ended: false,
            final_hash: None,
            created_at: now,
        };

        let message_id = self.notifier.post_announcement(&giveaway).await?;
        giveaway.message_id = Some(message_id);
        self.store.insert(&giveaway).await?;

        self.notifier
            .audit(&format!(
                "Giveaway successfully created with title [{}] and ID [{}]",
                giveaway.title, giveaway.id
            ))
            .await;
        Ok(giveaway.into())
    }

    /// Enter the pool. An identity already present fails regardless of
    /// weight; otherwise `multiplier` copies are appended.
    pub async fn join(&self, id: &str, req: JoinRequest) -> AppResult<JoinResponse> {
        let giveaway = self.fetch(id).await?;
        if giveaway.ended {
            return Err(AppError::ValidationError(
                "Giveaway has already ended".into(),
            ));
        }
        if giveaway.entrants.iter().any(|e| e == &req.user_id) {
            return Err(AppError::AlreadyEntered);
        }

        let multiplier = self.multiplier_for(&req.role_names);
        self.store
            .push_entries(id, &req.user_id, multiplier)
            .await?;

        self.notifier
            .audit(&format!("User {} entered giveaway {id}.", req.user_id))
            .await;
        Ok(JoinResponse { multiplier })
    }

    /// Leave the pool, removing every occurrence of the identity.
    pub async fn leave(&self, id: &str, req: LeaveRequest) -> AppResult<()> {
        let giveaway = self.fetch(id).await?;
        if giveaway.ended {
            return Err(AppError::ValidationError(
                "Giveaway has already ended".into(),
            ));
        }
        if !giveaway.entrants.iter().any(|e| e == &req.user_id) {
            return Err(AppError::NotEntered);
        }

        self.store.pull_entries(id, &req.user_id).await?;

        self.notifier
            .audit(&format!("User {} left giveaway {id}.", req.user_id))
            .await;
        Ok(())
    }

    /// Per-identity occurrence counts in first-joined order. Display only;
    /// selection always indexes into the full multiplied sequence.
    pub async fn entrants_summary(&self, id: &str) -> AppResult<EntrantsSummaryResponse> {
        let giveaway = self.fetch(id).await?;

        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, u32> = HashMap::new();
        for entrant in &giveaway.entrants {
            let count = counts.entry(entrant.clone()).or_insert(0);
            if *count == 0 {
                order.push(entrant.clone());
            }
            *count += 1;
        }

        Ok(EntrantsSummaryResponse {
            total_entries: giveaway.entrants.len(),
            entrants: order
                .into_iter()
                .map(|user_id| {
                    let entries = counts[&user_id];
                    EntrantEntry { user_id, entries }
                })
                .collect(),
        })
    }

    pub async fn get(&self, id: &str) -> AppResult<GiveawayResponse> {
        Ok(self.fetch(id).await?.into())
    }

    /// One expiry scan pass: finalize every record whose end time has
    /// passed. Per-record failures are logged and do not abort the pass.
    /// Returns how many records this pass finalized.
    pub async fn finalize_due(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let due = self.store.find_due(now).await?;
        let mut finalized = 0;
        for giveaway in due {
            match self.finalize_one(&giveaway).await {
                Ok(true) => finalized += 1,
                Ok(false) => {} // another actor won the claim
                Err(e) => {
                    log::error!("Failed to finalize giveaway {}: {e:?}", giveaway.id);
                }
            }
        }
        Ok(finalized)
    }

    /// Finalize a single due record. The `ended` claim commits first: once
    /// it succeeds the record is never reprocessed, even if the steps after
    /// it fail. Announcement cleanup and result delivery are best-effort.
    async fn finalize_one(&self, giveaway: &Giveaway) -> AppResult<bool> {
        if !self.store.claim_ended(&giveaway.id).await? {
            return Ok(false);
        }

        self.notifier
            .audit(&format!(
                "Giveaway ended for [{}] with ID [{}]. Attempting to delete initial giveaway interface...",
                giveaway.title, giveaway.id
            ))
            .await;

        if let Some(message_id) = &giveaway.message_id {
            match self
                .notifier
                .delete_message(&giveaway.channel_id, message_id)
                .await
            {
                Ok(()) => {
                    self.notifier
                        .audit(&format!(
                            "Deletion successful for message with ID [{message_id}]."
                        ))
                        .await;
                }
                Err(e) => {
                    log::warn!("Announcement cleanup failed for {}: {e}", giveaway.id);
                    self.notifier
                        .audit("Message may have been deleted. Passing...")
                        .await;
                }
            }
        }

        if giveaway.entrants.is_empty() {
            if let Err(e) = self
                .notifier
                .post_no_entrants(&giveaway.channel_id, &giveaway.title)
                .await
            {
                log::warn!(
                    "No-entrants notice delivery failed for {}: {e}",
                    giveaway.id
                );
            }
            self.notifier
                .audit(&format!(
                    "Giveaway with title [{}] and ID [{}] ended without entrants.",
                    giveaway.title, giveaway.id
                ))
                .await;
            return Ok(true);
        }

        let selection = self.draw_winner(&giveaway.entrants).await?;
        self.store
            .set_final_hash(&giveaway.id, &selection.audit_hash)
            .await?;

        self.deliver_result(giveaway, &selection.winner_id, &selection.audit_hash, None)
            .await;
        Ok(true)
    }

    /// Re-run winner selection on a closed giveaway with a fresh draw.
    /// Overwrites the audit hash; never mutates the pool, the ended flag
    /// or the end time.
    pub async fn reroll(&self, id: &str, req: RerollRequest) -> AppResult<RerollResponse> {
        let giveaway = self.fetch(id).await?;

        if !req.can_manage {
            self.notifier
                .audit(&format!(
                    "Reroll attempted by unprivileged user [{}].",
                    req.user_id
                ))
                .await;
            return Err(AppError::Unauthorized);
        }
        if !giveaway.ended {
            return Err(AppError::ValidationError(
                "Giveaway has not ended yet".into(),
            ));
        }
        if giveaway.entrants.is_empty() {
            return Err(AppError::ValidationError("No entrants found".into()));
        }

        self.notifier
            .audit(&format!(
                "Reroll initiated by {} for giveaway [{}] with ID [{}]",
                req.user_id, giveaway.title, giveaway.id
            ))
            .await;

        // Best-effort cleanup of the previous result and its trailing
        // mention before posting the new one.
        if let Some(result_id) = &giveaway.result_message_id
            && let Err(e) = self
                .notifier
                .delete_message(&giveaway.channel_id, result_id)
                .await
        {
            log::warn!("Previous result cleanup failed for {id}: {e}");
        }
        match self
            .notifier
            .find_trailing_mention(&giveaway.channel_id)
            .await
        {
            Ok(Some(mention_id)) => {
                if let Err(e) = self
                    .notifier
                    .delete_message(&giveaway.channel_id, &mention_id)
                    .await
                {
                    log::warn!("Trailing mention cleanup failed for {id}: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("History scan failed for {id}: {e}"),
        }

        let selection = self.draw_winner(&giveaway.entrants).await?;
        self.store
            .set_final_hash(&giveaway.id, &selection.audit_hash)
            .await?;

        self.deliver_result(
            &giveaway,
            &selection.winner_id,
            &selection.audit_hash,
            Some(&req.user_id),
        )
        .await;

        Ok(RerollResponse {
            winner_id: selection.winner_id,
            final_hash: selection.audit_hash,
        })
    }

    /// Cancel-or-end dispatch (the original C/E command).
    pub async fn end(&self, id: &str, mode: EndMode) -> AppResult<()> {
        match mode {
            EndMode::Cancel => self.cancel(id).await,
            EndMode::End => self.force_end(id).await,
        }
    }

    /// Zero out the remaining time. The next scan pass finalizes the
    /// record through the normal path; there is no second finalization
    /// route, so force-ended and naturally expired giveaways share the
    /// same selection logic.
    pub async fn force_end(&self, id: &str) -> AppResult<()> {
        let giveaway = self.fetch(id).await?;
        if giveaway.ended {
            return Err(AppError::ValidationError(
                "Giveaway has already ended".into(),
            ));
        }

        self.store.set_end_time(id, Utc::now()).await?;
        self.notifier
            .audit(&format!("Giveaway {id} force-ended."))
            .await;
        Ok(())
    }

    /// Delete the record outright. Never invokes winner selection.
    pub async fn cancel(&self, id: &str) -> AppResult<()> {
        let giveaway = self.fetch(id).await?;

        if let Some(message_id) = &giveaway.message_id
            && let Err(e) = self
                .notifier
                .delete_message(&giveaway.channel_id, message_id)
                .await
        {
            log::warn!("Announcement cleanup failed while cancelling {id}: {e}");
        }

        self.store.delete(id).await?;
        self.notifier
            .audit(&format!("Giveaway {id} cancelled and purged."))
            .await;
        Ok(())
    }

    /// Debug helper: inject the fixed fake identities, bypassing the
    /// uniqueness check.
    pub async fn fill_test(&self, id: &str) -> AppResult<usize> {
        self.fetch(id).await?;
        for fake_id in FAKE_ENTRANT_IDS {
            self.store.push_entries(id, fake_id, 1).await?;
        }
        self.notifier
            .audit(&format!(
                "Giveaway {id} filled with {} fake users.",
                FAKE_ENTRANT_IDS.len()
            ))
            .await;
        Ok(FAKE_ENTRANT_IDS.len())
    }

    /// Audit inspection view: the stored short hash and the winning index
    /// recomputed from it.
    pub async fn debug_info(&self, id: &str) -> AppResult<DebugResponse> {
        let giveaway = self.fetch(id).await?;

        let final_hash = giveaway.final_hash.unwrap_or_else(|| "0".to_string());
        let entrant_count = giveaway.entrants.len();
        let winner_index = if entrant_count > 0 {
            u64::from_str_radix(&final_hash, 16).unwrap_or(0) as usize % entrant_count
        } else {
            0
        };

        Ok(DebugResponse {
            giveaway_id: giveaway.id,
            channel_id: giveaway.channel_id,
            final_hash,
            algorithm: "SHA-256".to_string(),
            salt: "NS_TIMESTAMP".to_string(),
            entrant_count,
            winner_index,
        })
    }

    /// Shutdown capability check: only the configured dev identity may
    /// stop the process.
    pub async fn authorize_shutdown(&self, user_id: &str) -> AppResult<()> {
        if self.dev_user_id.is_empty() || user_id != self.dev_user_id {
            return Err(AppError::Unauthorized);
        }
        self.notifier.audit("EMERGENCY SHUTDOWN initiated.").await;
        Ok(())
    }

    async fn fetch(&self, id: &str) -> AppResult<Giveaway> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Giveaway not found".into()))
    }

    async fn draw_winner(&self, entrants: &[String]) -> AppResult<winner::Selection> {
        self.notifier.audit("Attempting randomization...").await;
        let draw_value = self.entropy.draw().await;
        let selection = winner::select_now(entrants, draw_value).ok_or_else(|| {
            AppError::InternalError("Winner selection invoked on empty pool".into())
        })?;
        self.notifier.audit("Randomization successful...").await;
        Ok(selection)
    }

    /// Deliver the result embed and trailing mention. Delivery failures
    /// are logged and never propagate; the audit hash is already
    /// persisted, so a missed notification is recoverable.
    async fn deliver_result(
        &self,
        giveaway: &Giveaway,
        winner_id: &str,
        audit_hash: &str,
        rerolled_by: Option<&str>,
    ) {
        match self
            .notifier
            .post_winner(giveaway, winner_id, audit_hash, rerolled_by)
            .await
        {
            Ok(message_id) => {
                if let Err(e) = self
                    .store
                    .set_result_message(&giveaway.id, &message_id)
                    .await
                {
                    log::warn!("Failed to record result message for {}: {e}", giveaway.id);
                }
            }
            Err(e) => {
                log::warn!("Result delivery failed for {}: {e}", giveaway.id);
                return;
            }
        }

        if let Err(e) = self
            .notifier
            .post_winner_mention(&giveaway.channel_id, winner_id)
            .await
        {
            log::warn!("Winner mention delivery failed for {}: {e}", giveaway.id);
        }
        self.notifier.audit("Message sent successfully.").await;
    }

    fn multiplier_for(&self, role_names: &[String]) -> u32 {
        role_names
            .iter()
            .filter_map(|role| self.entry_multipliers.get(role).copied())
            .max()
            .unwrap_or(1)
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntropyConfig;
    use crate::database::InMemoryGiveawayStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Notifier that records every event and can be switched into a
    /// failing mode to exercise the best-effort paths.
    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<String>>,
        next_id: AtomicUsize,
        fail_deliveries: AtomicBool,
    }

    impl RecordingNotifier {
        fn record(&self, event: &str) {
            self.events.lock().unwrap().push(event.to_string());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn has_event(&self, prefix: &str) -> bool {
            self.events().iter().any(|e| e.starts_with(prefix))
        }

        fn mint_id(&self) -> String {
            format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        fn delivery(&self, event: &str) -> AppResult<String> {
            if self.fail_deliveries.load(Ordering::SeqCst) {
                return Err(AppError::ExternalApiError("channel unreachable".into()));
            }
            self.record(event);
            Ok(self.mint_id())
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn post_announcement(&self, giveaway: &Giveaway) -> AppResult<String> {
            self.delivery(&format!("announce:{}", giveaway.id))
        }

        async fn post_winner(
            &self,
            giveaway: &Giveaway,
            winner_id: &str,
            _audit_hash: &str,
            rerolled_by: Option<&str>,
        ) -> AppResult<String> {
            let kind = if rerolled_by.is_some() {
                "reroll"
            } else {
                "winner"
            };
            self.delivery(&format!("{kind}:{}:{winner_id}", giveaway.id))
        }

        async fn post_winner_mention(
            &self,
            _channel_id: &str,
            winner_id: &str,
        ) -> AppResult<String> {
            self.delivery(&format!("mention:{winner_id}"))
        }

        async fn post_no_entrants(&self, _channel_id: &str, title: &str) -> AppResult<()> {
            self.delivery(&format!("no_entrants:{title}"))?;
            Ok(())
        }

        async fn delete_message(&self, _channel_id: &str, message_id: &str) -> AppResult<()> {
            self.record(&format!("delete:{message_id}"));
            Ok(())
        }

        async fn find_trailing_mention(&self, _channel_id: &str) -> AppResult<Option<String>> {
            Ok(None)
        }

        async fn audit(&self, _text: &str) {}
    }

    fn service() -> (
        GiveawayService,
        Arc<InMemoryGiveawayStore>,
        Arc<RecordingNotifier>,
    ) {
        let store = Arc::new(InMemoryGiveawayStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        // Unroutable address: every draw exercises the local fallback.
        let entropy = EntropyClient::new(EntropyConfig {
            url: "http://127.0.0.1:9/integers".to_string(),
            timeout_secs: 1,
        });
        let service = GiveawayService::new(
            store.clone(),
            notifier.clone(),
            entropy,
            HashMap::from([
                ("🏆 x2 Entries".to_string(), 2),
                ("🏆 x3 Entries".to_string(), 3),
            ]),
            "786598715204829244".to_string(),
        );
        (service, store, notifier)
    }

    async fn created(service: &GiveawayService) -> String {
        service
            .create(CreateGiveawayRequest {
                title: "Nitro".to_string(),
                description: "One month of Nitro".to_string(),
                duration_hours: 1.0,
                channel_id: "100".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    fn join_req(user_id: &str) -> JoinRequest {
        JoinRequest {
            user_id: user_id.to_string(),
            role_names: vec![],
        }
    }

    #[tokio::test]
    async fn join_and_leave_track_identities_and_weights() {
        let (service, store, _) = service();
        let id = created(&service).await;

        let joined = service.join(&id, join_req("alice")).await.unwrap();
        assert_eq!(joined.multiplier, 1);

        let joined = service
            .join(
                &id,
                JoinRequest {
                    user_id: "bob".to_string(),
                    role_names: vec!["🏆 x3 Entries".to_string(), "Member".to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(joined.multiplier, 3);

        let summary = service.entrants_summary(&id).await.unwrap();
        assert_eq!(summary.total_entries, 4);
        assert_eq!(summary.entrants.len(), 2);
        assert_eq!(summary.entrants[0].user_id, "alice");
        assert_eq!(summary.entrants[0].entries, 1);
        assert_eq!(summary.entrants[1].user_id, "bob");
        assert_eq!(summary.entrants[1].entries, 3);

        // Leave removes every occurrence of the identity.
        service
            .leave(
                &id,
                LeaveRequest {
                    user_id: "bob".to_string(),
                },
            )
            .await
            .unwrap();
        let g = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(g.entrants, vec!["alice"]);
    }

    #[tokio::test]
    async fn duplicate_join_fails_without_state_change() {
        let (service, store, _) = service();
        let id = created(&service).await;

        service.join(&id, join_req("alice")).await.unwrap();
        let err = service.join(&id, join_req("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyEntered));

        let g = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(g.entrants, vec!["alice"]);
    }

    #[tokio::test]
    async fn leaving_when_not_entered_fails_without_state_change() {
        let (service, store, _) = service();
        let id = created(&service).await;
        service.join(&id, join_req("alice")).await.unwrap();

        let err = service
            .leave(
                &id,
                LeaveRequest {
                    user_id: "bob".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotEntered));

        let g = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(g.entrants, vec!["alice"]);
    }

    #[tokio::test]
    async fn force_end_routes_through_the_scan_pass() {
        let (service, store, notifier) = service();
        let id = created(&service).await;
        for user in ["alice", "bob", "carol"] {
            service.join(&id, join_req(user)).await.unwrap();
        }

        service.force_end(&id).await.unwrap();
        let finalized = service.finalize_due(Utc::now()).await.unwrap();
        assert_eq!(finalized, 1);

        let g = store.find_by_id(&id).await.unwrap().unwrap();
        assert!(g.ended);
        let hash = g.final_hash.expect("audit hash must be set");
        assert_eq!(hash.len(), 12);
        assert!(
            hash.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );

        // Winner is one of the three entrants.
        let winner_event = notifier
            .events()
            .into_iter()
            .find(|e| e.starts_with("winner:"))
            .expect("winner must be announced");
        let winner = winner_event.rsplit(':').next().unwrap().to_string();
        assert!(["alice", "bob", "carol"].contains(&winner.as_str()));
        assert!(notifier.has_event(&format!("mention:{winner}")));

        // Announcement cleanup ran.
        assert!(notifier.has_event("delete:msg-0"));
    }

    #[tokio::test]
    async fn finalization_is_idempotent_across_scan_passes() {
        let (service, _, _) = service();
        let id = created(&service).await;
        service.join(&id, join_req("alice")).await.unwrap();
        service.force_end(&id).await.unwrap();

        assert_eq!(service.finalize_due(Utc::now()).await.unwrap(), 1);
        assert_eq!(service.finalize_due(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_pool_finalizes_without_a_hash() {
        let (service, store, notifier) = service();
        let id = created(&service).await;

        service.force_end(&id).await.unwrap();
        assert_eq!(service.finalize_due(Utc::now()).await.unwrap(), 1);

        let g = store.find_by_id(&id).await.unwrap().unwrap();
        assert!(g.ended);
        assert!(g.final_hash.is_none());
        assert!(notifier.has_event("no_entrants:Nitro"));
    }

    #[tokio::test]
    async fn open_records_are_untouched_by_the_scan() {
        let (service, store, _) = service();
        let id = created(&service).await;

        assert_eq!(service.finalize_due(Utc::now()).await.unwrap(), 0);
        let g = store.find_by_id(&id).await.unwrap().unwrap();
        assert!(!g.ended);
    }

    #[tokio::test]
    async fn delivery_failure_still_commits_finalization() {
        let (service, store, notifier) = service();
        let id = created(&service).await;
        service.join(&id, join_req("alice")).await.unwrap();
        service.force_end(&id).await.unwrap();

        notifier.fail_deliveries.store(true, Ordering::SeqCst);
        assert_eq!(service.finalize_due(Utc::now()).await.unwrap(), 1);

        let g = store.find_by_id(&id).await.unwrap().unwrap();
        assert!(g.ended);
        assert!(g.final_hash.is_some());
        assert!(g.result_message_id.is_none());
    }

    #[tokio::test]
    async fn reroll_overwrites_the_hash_and_keeps_the_pool() {
        let (service, store, _) = service();
        let id = created(&service).await;
        for user in ["alice", "bob", "carol"] {
            service.join(&id, join_req(user)).await.unwrap();
        }
        service.force_end(&id).await.unwrap();
        service.finalize_due(Utc::now()).await.unwrap();
        let before = store.find_by_id(&id).await.unwrap().unwrap();

        let req = RerollRequest {
            user_id: "mod".to_string(),
            can_manage: true,
        };
        let first = service.reroll(&id, req.clone()).await.unwrap();
        let second = service.reroll(&id, req).await.unwrap();

        // Timestamp-salted hashing makes a collision overwhelmingly unlikely.
        assert_ne!(first.final_hash, second.final_hash);

        let after = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(after.entrants, before.entrants);
        assert!(after.ended);
        assert_eq!(after.end_time, before.end_time);
        assert_eq!(
            after.final_hash.as_deref(),
            Some(second.final_hash.as_str())
        );
        assert!(["alice", "bob", "carol"].contains(&second.winner_id.as_str()));
    }

    #[tokio::test]
    async fn reroll_requires_the_manage_capability() {
        let (service, _, _) = service();
        let id = created(&service).await;
        service.join(&id, join_req("alice")).await.unwrap();
        service.force_end(&id).await.unwrap();
        service.finalize_due(Utc::now()).await.unwrap();

        let err = service
            .reroll(
                &id,
                RerollRequest {
                    user_id: "intruder".to_string(),
                    can_manage: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn reroll_rejects_open_and_missing_giveaways() {
        let (service, _, _) = service();
        let id = created(&service).await;
        service.join(&id, join_req("alice")).await.unwrap();

        let req = RerollRequest {
            user_id: "mod".to_string(),
            can_manage: true,
        };
        let err = service.reroll(&id, req.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = service.reroll("missing", req).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_deletes_the_record_without_selection() {
        let (service, store, notifier) = service();
        let id = created(&service).await;
        service.join(&id, join_req("alice")).await.unwrap();

        service.end(&id, EndMode::Cancel).await.unwrap();

        assert!(store.find_by_id(&id).await.unwrap().is_none());
        assert!(notifier.has_event("delete:msg-0"));
        assert!(!notifier.has_event("winner:"));
    }

    #[tokio::test]
    async fn fill_test_injects_the_fixed_identities() {
        let (service, store, _) = service();
        let id = created(&service).await;

        assert_eq!(service.fill_test(&id).await.unwrap(), 5);
        let g = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(g.entrants.len(), 5);
        assert!(g.entrants.contains(&"111111111111111111".to_string()));
    }

    #[tokio::test]
    async fn debug_view_recomputes_the_winner_index() {
        let (service, store, _) = service();
        let id = created(&service).await;
        for user in ["alice", "bob", "carol"] {
            service.join(&id, join_req(user)).await.unwrap();
        }
        service.force_end(&id).await.unwrap();
        service.finalize_due(Utc::now()).await.unwrap();

        let g = store.find_by_id(&id).await.unwrap().unwrap();
        let debug = service.debug_info(&id).await.unwrap();
        assert_eq!(debug.algorithm, "SHA-256");
        assert_eq!(debug.entrant_count, 3);
        assert!(debug.winner_index < 3);
        assert_eq!(debug.final_hash, g.final_hash.unwrap());
    }

    #[tokio::test]
    async fn shutdown_is_restricted_to_the_dev_identity() {
        let (service, _, _) = service();
        assert!(
            service
                .authorize_shutdown("786598715204829244")
                .await
                .is_ok()
        );
        assert!(matches!(
            service.authorize_shutdown("42").await.unwrap_err(),
            AppError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let (service, _, _) = service();
        let err = service
            .create(CreateGiveawayRequest {
                title: "  ".to_string(),
                description: String::new(),
                duration_hours: 1.0,
                channel_id: "100".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = service
            .create(CreateGiveawayRequest {
                title: "Nitro".to_string(),
                description: String::new(),
                duration_hours: 0.0,
                channel_id: "100".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn create_rejects_unrepresentable_end_times() {
        let (service, _, notifier) = service();

        // Finite and positive, but far past the representable date range.
        let err = service
            .create(CreateGiveawayRequest {
                title: "Nitro".to_string(),
                description: String::new(),
                duration_hours: 1e12,
                channel_id: "100".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        // Rejected before anything was announced or stored.
        assert!(notifier.events().is_empty());
    }
}
