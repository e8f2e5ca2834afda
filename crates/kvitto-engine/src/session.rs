// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user session workers.
//!
//! Each sender gets one worker task owning that user's [`Flow`] state and a
//! mailbox. Events for the same user are processed strictly in arrival
//! order; events for different users never wait on each other. Renders and
//! sends happen in spawned continuations so the worker is free to take the
//! next message while a receipt is still being generated, which is what
//! lets `cancel` interrupt an in-flight render instead of queueing behind
//! it.
//!
//! Cancellation is an epoch: `cancel` bumps the user's counter, and a
//! render continuation compares the value it started under before handing
//! its result to the outbound queue. A stale continuation drops its bytes
//! silently. Once a receipt has crossed into the outbound queue it counts
//! as delivered; the post-delivery bookkeeping (usage counters, paywall
//! prompt) runs unconditionally when the continuation reports back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use kvitto_config::BotConfig;
use kvitto_core::{
    ChannelAdapter, InboundEvent, InboundMedia, KvittoError, MediaHost, OutboundMessage,
    OutputFormat, PaymentProvider, ReceiptRenderer, RenderRequest, Repository, UserRecord,
    VirtualAccount, FREE_TRIAL_LIMIT,
};
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::flow::Flow;
use crate::lifecycle::{self, EditChange, NewReceiptData};
use crate::prompt;
use crate::step::{step, Effect, UserView};

/// Shared collaborators handed to every worker.
pub(crate) struct WorkerCtx {
    pub(crate) repo: Arc<dyn Repository>,
    pub(crate) channel: Arc<dyn ChannelAdapter>,
    pub(crate) renderer: Arc<dyn ReceiptRenderer>,
    pub(crate) media: Arc<dyn MediaHost>,
    pub(crate) payments: Arc<dyn PaymentProvider>,
    pub(crate) bot: BotConfig,
}

/// What arrives in a worker's mailbox.
enum SessionMsg {
    Inbound(InboundEvent),
    RenderDone(RenderDone),
}

/// A continuation's report that a receipt reached the outbound transport.
struct RenderDone {
    kind: RenderKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderKind {
    Create,
    Edit,
    Resend,
}

/// One queued outbound delivery. `done` lets a continuation learn whether
/// the transport accepted the message.
struct OutboundJob {
    message: OutboundMessage,
    done: Option<oneshot::Sender<Result<(), KvittoError>>>,
}

/// Routes inbound events to per-user workers.
pub struct SessionStore {
    ctx: Arc<WorkerCtx>,
    sessions: DashMap<String, mpsc::UnboundedSender<SessionMsg>>,
}

impl SessionStore {
    pub(crate) fn new(ctx: Arc<WorkerCtx>) -> Self {
        Self {
            ctx,
            sessions: DashMap::new(),
        }
    }

    /// Hand one event to its sender's worker, spawning the worker on first
    /// contact. Returns immediately; never blocks on a busy user.
    pub fn dispatch(&self, event: InboundEvent) {
        let address = event.sender.clone();
        let mut entry = self
            .sessions
            .entry(address.clone())
            .or_insert_with(|| spawn_worker(address.clone(), self.ctx.clone()));
        if let Err(mpsc::error::SendError(msg)) = entry.send(SessionMsg::Inbound(event)) {
            // The worker task died. Replace it and redeliver.
            warn!(user = %address, "session worker gone; respawning");
            let tx = spawn_worker(address, self.ctx.clone());
            let _ = tx.send(msg);
            *entry = tx;
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

fn spawn_worker(address: String, ctx: Arc<WorkerCtx>) -> mpsc::UnboundedSender<SessionMsg> {
    let (tx, rx) = mpsc::unbounded_channel();
    let outbound = spawn_dispatcher(address.clone(), ctx.clone());
    let worker = SessionWorker {
        address,
        ctx,
        epoch: Arc::new(AtomicU64::new(0)),
        outbound,
        mailbox: tx.clone(),
        flow: Flow::Idle,
    };
    tokio::spawn(worker.run(rx));
    tx
}

/// Per-user FIFO delivery task. All of a user's outbound traffic funnels
/// through here so a rendered receipt can never overtake the text queued
/// before it. Applies the humanizing delay, then sends.
fn spawn_dispatcher(address: String, ctx: Arc<WorkerCtx>) -> mpsc::UnboundedSender<OutboundJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundJob>();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let delay = humanized_delay(&ctx.bot);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = ctx.channel.send(job.message).await;
            if let Err(e) = &result {
                warn!(user = %address, error = %e, "outbound send failed");
            }
            if let Some(done) = job.done {
                let _ = done.send(result);
            }
        }
    });
    tx
}

fn humanized_delay(bot: &BotConfig) -> std::time::Duration {
    let jitter = if bot.reply_jitter_ms > 0 {
        rand::thread_rng().gen_range(0..=bot.reply_jitter_ms)
    } else {
        0
    };
    std::time::Duration::from_millis(bot.reply_delay_ms + jitter)
}

struct SessionWorker {
    address: String,
    ctx: Arc<WorkerCtx>,
    /// Bumped by `cancel`; render continuations compare against the value
    /// they started under.
    epoch: Arc<AtomicU64>,
    outbound: mpsc::UnboundedSender<OutboundJob>,
    mailbox: mpsc::UnboundedSender<SessionMsg>,
    flow: Flow,
}

impl SessionWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionMsg>) {
        debug!(user = %self.address, "session worker started");
        while let Some(msg) = rx.recv().await {
            match msg {
                SessionMsg::Inbound(event) => self.on_inbound(event).await,
                SessionMsg::RenderDone(done) => self.on_render_done(done).await,
            }
        }
        debug!(user = %self.address, "session worker stopped");
    }

    async fn on_inbound(&mut self, event: InboundEvent) {
        let view = match self.load_view().await {
            Ok(view) => view,
            Err(e) => {
                error!(user = %self.address, error = %e, "failed to load user state");
                self.flow = Flow::Idle;
                self.queue_text(prompt::unexpected_error());
                return;
            }
        };

        let from = self.flow.to_string();
        let outcome = step(std::mem::take(&mut self.flow), &view, &event);
        self.flow = outcome.next_flow;
        debug!(user = %self.address, from = %from, to = %self.flow, "transition");

        for reply in outcome.replies {
            self.queue_text(reply);
        }
        for effect in outcome.effects {
            self.apply_effect(effect, &view.user).await;
        }
    }

    /// Fresh snapshot for the transition function. First contact registers
    /// the user.
    async fn load_view(&self) -> Result<UserView, KvittoError> {
        let user = match self.ctx.repo.find_user(&self.address).await? {
            Some(user) => user,
            None => {
                let user = UserRecord::new(&self.address);
                self.ctx.repo.insert_user(&user).await?;
                info!(user = %self.address, "new user registered");
                user
            }
        };
        let latest_receipt = self.ctx.repo.latest_receipt(&self.address).await?;
        Ok(UserView {
            user,
            latest_receipt,
            is_admin: self.is_admin(),
            now: Utc::now(),
        })
    }

    fn is_admin(&self) -> bool {
        self.ctx
            .bot
            .admin_addresses
            .iter()
            .any(|admin| admin == &self.address)
    }

    async fn apply_effect(&mut self, effect: Effect, user: &UserRecord) {
        match effect {
            Effect::DiscardInFlight => {
                let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(user = %self.address, epoch, "in-flight work discarded");
            }
            Effect::SaveBrandProfile(profile) => {
                if let Err(e) = self
                    .ctx
                    .repo
                    .update_brand_profile(&self.address, &profile)
                    .await
                {
                    error!(user = %self.address, error = %e, "failed to save brand profile");
                    self.flow = Flow::Idle;
                    self.queue_text(prompt::unexpected_error());
                } else {
                    info!(user = %self.address, business = %profile.business_name, "brand profile saved");
                }
            }
            Effect::StoreLogo(media) => self.store_logo(media).await,
            Effect::CreateReceipt(data) => self.create_receipt(user, data).await,
            Effect::EditReceipt { receipt_id, change } => {
                self.edit_receipt(user, &receipt_id, change).await
            }
            Effect::Resend { receipt_id } => self.resend(user, &receipt_id).await,
            Effect::ProvisionAccount => self.provision_account(user).await,
        }
    }

    async fn store_logo(&mut self, media: InboundMedia) {
        let stored = async {
            let url = self.ctx.media.upload_image(&media.bytes, &media.mime).await?;
            self.ctx.repo.set_logo_url(&self.address, &url).await?;
            Ok::<_, KvittoError>(url)
        }
        .await;
        match stored {
            Ok(url) => {
                info!(user = %self.address, url = %url, "logo stored");
                self.queue_text(prompt::logo_saved());
            }
            Err(e) => {
                warn!(user = %self.address, error = %e, "logo upload failed");
                self.queue_text(prompt::logo_failed());
            }
        }
    }

    async fn create_receipt(&mut self, user: &UserRecord, data: NewReceiptData) {
        let (record, request) = match lifecycle::create_receipt(user, data) {
            Ok(pair) => pair,
            Err(e) => {
                error!(user = %self.address, error = %e, "receipt assembly failed");
                self.queue_text(prompt::unexpected_error());
                return;
            }
        };
        if let Err(e) = self.ctx.repo.insert_receipt(&record).await {
            error!(user = %self.address, error = %e, "failed to persist receipt");
            self.queue_text(prompt::unexpected_error());
            return;
        }
        info!(
            user = %self.address,
            receipt = %record.id,
            total = %record.total,
            "receipt created"
        );
        self.spawn_render(RenderKind::Create, request);
    }

    async fn edit_receipt(&mut self, user: &UserRecord, receipt_id: &str, change: EditChange) {
        let existing = match self.ctx.repo.get_receipt(receipt_id).await {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                self.queue_text(prompt::receipt_gone());
                return;
            }
            Err(e) => {
                error!(user = %self.address, error = %e, "failed to load receipt for edit");
                self.queue_text(prompt::unexpected_error());
                return;
            }
        };
        let (updated, request) = match lifecycle::edit_receipt(user, &existing, change) {
            Ok(pair) => pair,
            Err(e) => {
                error!(user = %self.address, error = %e, "receipt revision failed");
                self.queue_text(prompt::unexpected_error());
                return;
            }
        };
        match self
            .ctx
            .repo
            .update_receipt_fields(&updated.id, &updated.fields())
            .await
        {
            Ok(()) => {
                info!(
                    user = %self.address,
                    receipt = %updated.id,
                    total = %updated.total,
                    "receipt updated"
                );
                self.spawn_render(RenderKind::Edit, request);
            }
            Err(KvittoError::ReceiptNotFound { .. }) => self.queue_text(prompt::receipt_gone()),
            Err(e) => {
                error!(user = %self.address, error = %e, "failed to persist receipt edit");
                self.queue_text(prompt::unexpected_error());
            }
        }
    }

    async fn resend(&mut self, user: &UserRecord, receipt_id: &str) {
        match self.ctx.repo.get_receipt(receipt_id).await {
            Ok(Some(receipt)) => {
                let request = lifecycle::resend(user, &receipt);
                self.spawn_render(RenderKind::Resend, request);
            }
            Ok(None) => self.queue_text(prompt::receipt_gone()),
            Err(e) => {
                error!(user = %self.address, error = %e, "failed to load receipt for resend");
                self.queue_text(prompt::unexpected_error());
            }
        }
    }

    /// Reuse a previously provisioned account when the record still holds
    /// one; provision a fresh one otherwise.
    async fn provision_account(&mut self, user: &UserRecord) {
        if let (Some(number), Some(bank)) = (&user.account_number, &user.bank_name) {
            self.queue_text(prompt::payment_instructions(number, bank));
            return;
        }
        let account: VirtualAccount = match self
            .ctx
            .payments
            .provision_account(&self.address, user.display_name())
            .await
        {
            Ok(account) => account,
            Err(e) => {
                warn!(user = %self.address, error = %e, "virtual account provisioning failed");
                self.queue_text(prompt::payment_setup_failed());
                return;
            }
        };
        if let Err(e) = self
            .ctx
            .repo
            .set_virtual_account(&self.address, &account)
            .await
        {
            error!(user = %self.address, error = %e, "failed to store virtual account");
            self.queue_text(prompt::unexpected_error());
            return;
        }
        info!(
            user = %self.address,
            reference = %account.reference,
            "virtual account provisioned"
        );
        self.queue_text(prompt::payment_instructions(
            &account.account_number,
            &account.bank_name,
        ));
    }

    /// Render and deliver off the worker task. The continuation checks the
    /// epoch once, when the render result is ready; delivery reports come
    /// back through the mailbox as [`SessionMsg::RenderDone`].
    fn spawn_render(&self, kind: RenderKind, request: RenderRequest) {
        let ctx = self.ctx.clone();
        let epoch = self.epoch.clone();
        let started_at = epoch.load(Ordering::SeqCst);
        let outbound = self.outbound.clone();
        let mailbox = self.mailbox.clone();
        let address = self.address.clone();

        tokio::spawn(async move {
            let rendered = match ctx.renderer.render(&request).await {
                Ok(rendered) => rendered,
                Err(e) => {
                    warn!(
                        user = %address,
                        receipt = %request.receipt_id,
                        error = %e,
                        "render failed"
                    );
                    if epoch.load(Ordering::SeqCst) == started_at {
                        let _ = outbound.send(OutboundJob {
                            message: OutboundMessage::text(&address, prompt::render_failed()),
                            done: None,
                        });
                    }
                    return;
                }
            };

            if epoch.load(Ordering::SeqCst) != started_at {
                debug!(
                    user = %address,
                    receipt = %request.receipt_id,
                    "render result discarded after cancel"
                );
                return;
            }

            let filename = match request.format {
                OutputFormat::Pdf => Some(prompt::document_filename().to_string()),
                OutputFormat::Png => None,
            };
            let caption = Some(prompt::receipt_caption(&request.customer_name));
            let message =
                OutboundMessage::media(&address, rendered.bytes, rendered.mime, filename, caption);

            let (done_tx, done_rx) = oneshot::channel();
            if outbound
                .send(OutboundJob {
                    message,
                    done: Some(done_tx),
                })
                .is_err()
            {
                return;
            }
            match done_rx.await {
                Ok(Ok(())) => {
                    let _ = mailbox.send(SessionMsg::RenderDone(RenderDone { kind }));
                }
                Ok(Err(_)) => {
                    // Delivery failed after a good render; apologize instead
                    // of leaving the user hanging.
                    let _ = outbound.send(OutboundJob {
                        message: OutboundMessage::text(&address, prompt::render_failed()),
                        done: None,
                    });
                }
                Err(_) => {}
            }
        });
    }

    async fn on_render_done(&mut self, done: RenderDone) {
        match done.kind {
            RenderKind::Create => self.after_create_delivered().await,
            RenderKind::Edit => self.after_edit_delivered().await,
            RenderKind::Resend => {}
        }
    }

    /// Post-delivery bookkeeping for a created receipt: bump the free-use
    /// counter (admins and subscribers excepted) and raise the paywall the
    /// moment the trial is spent.
    async fn after_create_delivered(&mut self) {
        let Some(user) = self.reload_user().await else {
            return;
        };
        if self.is_admin() || user.subscription_active(Utc::now()) {
            return;
        }
        let used = match self.ctx.repo.increment_receipts_used(&self.address).await {
            Ok(used) => used,
            Err(e) => {
                error!(user = %self.address, error = %e, "failed to bump receipt counter");
                return;
            }
        };
        debug!(user = %self.address, used, "free receipt consumed");
        if used >= FREE_TRIAL_LIMIT && self.flow == Flow::Idle {
            self.flow = Flow::PaymentDecision;
            self.queue_text(prompt::paywall_trial());
        }
    }

    async fn after_edit_delivered(&mut self) {
        let Some(user) = self.reload_user().await else {
            return;
        };
        if self.is_admin() || user.subscription_active(Utc::now()) {
            return;
        }
        match self.ctx.repo.increment_edits_used(&self.address).await {
            Ok(used) => debug!(user = %self.address, used, "free edit consumed"),
            Err(e) => {
                error!(user = %self.address, error = %e, "failed to bump edit counter")
            }
        }
    }

    /// Re-read the user so exemption checks see writes (like a payment
    /// confirmation) that landed while the render was in flight.
    async fn reload_user(&self) -> Option<UserRecord> {
        match self.ctx.repo.find_user(&self.address).await {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                warn!(user = %self.address, "user record missing after delivery");
                None
            }
            Err(e) => {
                error!(user = %self.address, error = %e, "failed to reload user");
                None
            }
        }
    }

    fn queue_text(&self, text: String) {
        let message = OutboundMessage::text(&self.address, text);
        if self
            .outbound
            .send(OutboundJob {
                message,
                done: None,
            })
            .is_err()
        {
            warn!(user = %self.address, "outbound dispatcher gone; reply dropped");
        }
    }
}
