// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation transition function.
//!
//! [`step`] is pure: it takes the current flow state, a fresh snapshot of
//! the user, and one inbound event, and returns the next state plus replies
//! to queue and side effects for the session worker to carry out. All
//! policy lives here; all I/O lives in the worker. That split keeps every
//! conversational rule testable without a database or a transport.
//!
//! Global commands are checked before any state handler and always win:
//! whatever was being collected is dropped on the floor when one matches.

use kvitto_core::money;
use kvitto_core::{
    BrandProfile, InboundEvent, InboundMedia, InboundPayload, OutputFormat, ReceiptRecord,
    UserRecord,
};

use crate::command::Command;
use crate::flow::{EditField, Flow, ReceiptDraft, ReceiptField, SetupDraft, SetupField};
use crate::lifecycle::{EditChange, NewReceiptData};
use crate::paywall::{self, AccessDecision};
use crate::prompt;

/// Everything the transition function may consult. Re-read from the
/// repository for every event so concurrent webhook writes are visible.
#[derive(Debug, Clone)]
pub struct UserView {
    pub user: UserRecord,
    pub latest_receipt: Option<ReceiptRecord>,
    pub is_admin: bool,
    pub now: chrono::DateTime<chrono::Utc>,
}

/// Work the session worker must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Persist the completed brand profile.
    SaveBrandProfile(BrandProfile),
    /// Host the uploaded logo and store its URL.
    StoreLogo(InboundMedia),
    /// Persist a new receipt, then render and deliver it.
    CreateReceipt(NewReceiptData),
    /// Revise one field group of a stored receipt, then re-render.
    EditReceipt {
        receipt_id: String,
        change: EditChange,
    },
    /// Re-deliver a stored receipt unchanged.
    Resend { receipt_id: String },
    /// Look up or create the user's dedicated payment account and send the
    /// transfer instructions.
    ProvisionAccount,
    /// Abandon any render still in flight for this user.
    DiscardInFlight,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub next_flow: Flow,
    pub replies: Vec<String>,
    pub effects: Vec<Effect>,
}

impl Outcome {
    fn stay(flow: Flow, reply: String) -> Self {
        Self {
            next_flow: flow,
            replies: vec![reply],
            effects: Vec::new(),
        }
    }

    fn idle(reply: String) -> Self {
        Self::stay(Flow::Idle, reply)
    }
}

/// Advance one user's conversation by one event.
pub fn step(flow: Flow, view: &UserView, event: &InboundEvent) -> Outcome {
    match &event.payload {
        InboundPayload::Text(text) => {
            if let Some(command) = Command::parse(text) {
                return handle_command(command, view);
            }
            handle_text(flow, view, text.trim())
        }
        InboundPayload::Image(media) => handle_image(flow, view, media),
    }
}

/// Global commands. The caller's flow state is not passed in: matching a
/// command discards any draft by construction.
fn handle_command(command: Command, view: &UserView) -> Outcome {
    match command {
        Command::Menu => Outcome::idle(prompt::help_menu(view.user.display_name())),
        Command::Cancel => Outcome {
            next_flow: Flow::Idle,
            replies: vec![prompt::cancelled()],
            effects: vec![Effect::DiscardInFlight],
        },
        Command::NewReceipt => start_new_receipt(view),
        Command::Edit => start_edit(view),
        Command::Resend => start_resend(view),
        Command::Setup => Outcome {
            next_flow: Flow::Setup {
                awaiting: SetupField::BusinessName,
                draft: SetupDraft::default(),
            },
            replies: vec![prompt::setup_intro(), prompt::ask_business_name()],
            effects: Vec::new(),
        },
        Command::Logo => Outcome::stay(Flow::AwaitingLogo, prompt::ask_logo_direct()),
    }
}

fn start_new_receipt(view: &UserView) -> Outcome {
    match paywall::evaluate_access(&view.user, view.is_admin, view.now) {
        AccessDecision::Blocked { .. } => {
            Outcome::stay(Flow::PaymentDecision, prompt::paywall_trial())
        }
        AccessDecision::Granted if !view.user.setup_complete() => Outcome {
            next_flow: Flow::Setup {
                awaiting: SetupField::BusinessName,
                draft: SetupDraft::default(),
            },
            replies: vec![prompt::setup_needed_first(), prompt::ask_business_name()],
            effects: Vec::new(),
        },
        AccessDecision::Granted => Outcome::stay(
            Flow::NewReceipt {
                awaiting: ReceiptField::CustomerName,
                draft: ReceiptDraft::default(),
            },
            prompt::ask_customer_name(),
        ),
    }
}

fn start_edit(view: &UserView) -> Outcome {
    let Some(receipt) = &view.latest_receipt else {
        return Outcome::idle(prompt::no_receipts_yet());
    };
    match paywall::evaluate_edit_access(&view.user, view.is_admin, view.now) {
        AccessDecision::Blocked { .. } => {
            Outcome::stay(Flow::PaymentDecision, prompt::paywall_edits())
        }
        AccessDecision::Granted => Outcome::stay(
            Flow::EditChoice {
                receipt_id: receipt.id.clone(),
            },
            prompt::edit_choice_menu(),
        ),
    }
}

fn start_resend(view: &UserView) -> Outcome {
    let Some(receipt) = &view.latest_receipt else {
        return Outcome::idle(prompt::no_receipts_yet());
    };
    Outcome {
        next_flow: Flow::Idle,
        replies: vec![prompt::ack_resending()],
        effects: vec![Effect::Resend {
            receipt_id: receipt.id.clone(),
        }],
    }
}

fn handle_text(flow: Flow, view: &UserView, text: &str) -> Outcome {
    match flow {
        Flow::Idle => Outcome::idle(prompt::help_menu(view.user.display_name())),
        Flow::Setup { awaiting, draft } => setup_step(awaiting, draft, text),
        Flow::AwaitingLogo => {
            if text.eq_ignore_ascii_case("skip") {
                Outcome::idle(prompt::setup_complete())
            } else {
                Outcome::stay(Flow::AwaitingLogo, prompt::logo_must_be_image())
            }
        }
        Flow::NewReceipt { awaiting, draft } => receipt_step(awaiting, draft, text),
        Flow::EditChoice { receipt_id } => edit_choice(receipt_id, text),
        Flow::EditReceipt {
            receipt_id,
            awaiting,
            new_items,
        } => edit_step(receipt_id, awaiting, new_items, text),
        Flow::PaymentDecision => payment_decision(text),
    }
}

fn setup_step(awaiting: SetupField, mut draft: SetupDraft, text: &str) -> Outcome {
    let reprompt = |draft: SetupDraft, reply: String| {
        Outcome::stay(Flow::Setup { awaiting, draft }, reply)
    };
    match awaiting {
        SetupField::BusinessName => {
            if text.is_empty() {
                return reprompt(draft, prompt::need_nonempty());
            }
            draft.business_name = Some(text.to_string());
            advance_setup(SetupField::BrandColor, draft)
        }
        SetupField::BrandColor => {
            if text.is_empty() {
                return reprompt(draft, prompt::need_nonempty());
            }
            draft.brand_color = Some(text.to_string());
            advance_setup(SetupField::BusinessAddress, draft)
        }
        SetupField::BusinessAddress => {
            if text.is_empty() {
                return reprompt(draft, prompt::need_nonempty());
            }
            if !text.eq_ignore_ascii_case("skip") {
                draft.business_address = Some(text.to_string());
            }
            advance_setup(SetupField::ContactPhone, draft)
        }
        SetupField::ContactPhone => {
            if text.is_empty() {
                return reprompt(draft, prompt::need_nonempty());
            }
            if !text.eq_ignore_ascii_case("skip") {
                draft.contact_phone = Some(text.to_string());
            }
            advance_setup(SetupField::Template, draft)
        }
        SetupField::Template => match text.parse::<u8>() {
            Ok(n) if (1..=3).contains(&n) => {
                draft.template = Some(n);
                advance_setup(SetupField::Format, draft)
            }
            _ => reprompt(draft, prompt::invalid_template()),
        },
        SetupField::Format => match text.parse::<OutputFormat>() {
            Ok(format) => {
                draft.output_format = Some(format);
                finish_setup(draft)
            }
            Err(_) => reprompt(draft, prompt::invalid_format()),
        },
    }
}

fn advance_setup(next: SetupField, draft: SetupDraft) -> Outcome {
    let question = setup_question(next);
    Outcome::stay(
        Flow::Setup {
            awaiting: next,
            draft,
        },
        question,
    )
}

fn setup_question(field: SetupField) -> String {
    match field {
        SetupField::BusinessName => prompt::ask_business_name(),
        SetupField::BrandColor => prompt::ask_brand_color(),
        SetupField::BusinessAddress => prompt::ask_business_address(),
        SetupField::ContactPhone => prompt::ask_contact_phone(),
        SetupField::Template => prompt::ask_template(),
        SetupField::Format => prompt::ask_format(),
    }
}

/// The answered sequence guarantees the required fields are present; the
/// defaults here are unreachable fallbacks, not policy.
fn finish_setup(draft: SetupDraft) -> Outcome {
    let profile = BrandProfile {
        business_name: draft.business_name.unwrap_or_default(),
        brand_color: draft.brand_color.unwrap_or_default(),
        business_address: draft.business_address,
        contact_phone: draft.contact_phone,
        template: draft.template.unwrap_or(1),
        output_format: draft.output_format.unwrap_or(OutputFormat::Png),
    };
    Outcome {
        next_flow: Flow::AwaitingLogo,
        replies: vec![prompt::ask_logo()],
        effects: vec![Effect::SaveBrandProfile(profile)],
    }
}

fn receipt_step(awaiting: ReceiptField, mut draft: ReceiptDraft, text: &str) -> Outcome {
    let reprompt = |draft: ReceiptDraft, reply: String| {
        Outcome::stay(Flow::NewReceipt { awaiting, draft }, reply)
    };
    match awaiting {
        ReceiptField::CustomerName => {
            if text.is_empty() {
                return reprompt(draft, prompt::need_nonempty());
            }
            draft.customer_name = Some(text.to_string());
            advance_receipt(ReceiptField::Items, draft)
        }
        ReceiptField::Items => {
            let items = split_list(text);
            if items.is_empty() {
                return reprompt(draft, prompt::invalid_items());
            }
            draft.items = Some(items);
            advance_receipt(ReceiptField::Prices, draft)
        }
        ReceiptField::Prices => {
            let expected = draft.items.as_ref().map_or(0, Vec::len);
            match parse_price_list(text, expected) {
                Ok(prices) => {
                    draft.prices = Some(prices);
                    advance_receipt(ReceiptField::PaymentMethod, draft)
                }
                Err(reply) => reprompt(draft, reply),
            }
        }
        ReceiptField::PaymentMethod => {
            if text.is_empty() {
                return reprompt(draft, prompt::need_nonempty());
            }
            draft.payment_method = Some(text.to_string());
            let data = NewReceiptData {
                customer_name: draft.customer_name.unwrap_or_default(),
                items: draft.items.unwrap_or_default(),
                prices: draft.prices.unwrap_or_default(),
                payment_method: draft.payment_method.unwrap_or_default(),
            };
            Outcome {
                next_flow: Flow::Idle,
                replies: vec![prompt::ack_generating()],
                effects: vec![Effect::CreateReceipt(data)],
            }
        }
    }
}

fn advance_receipt(next: ReceiptField, draft: ReceiptDraft) -> Outcome {
    let question = receipt_question(next, draft.items.as_ref().map_or(0, Vec::len));
    Outcome::stay(
        Flow::NewReceipt {
            awaiting: next,
            draft,
        },
        question,
    )
}

fn receipt_question(field: ReceiptField, item_count: usize) -> String {
    match field {
        ReceiptField::CustomerName => prompt::ask_customer_name(),
        ReceiptField::Items => prompt::ask_items(),
        ReceiptField::Prices => prompt::ask_prices(item_count),
        ReceiptField::PaymentMethod => prompt::ask_payment_method(),
    }
}

fn edit_choice(receipt_id: String, text: &str) -> Outcome {
    let awaiting = match text {
        "1" => EditField::CustomerName,
        "2" => EditField::Items,
        "3" => EditField::PaymentMethod,
        _ => {
            return Outcome::stay(
                Flow::EditChoice { receipt_id },
                prompt::invalid_edit_choice(),
            );
        }
    };
    let question = edit_question(awaiting, 0);
    Outcome::stay(
        Flow::EditReceipt {
            receipt_id,
            awaiting,
            new_items: None,
        },
        question,
    )
}

fn edit_step(
    receipt_id: String,
    awaiting: EditField,
    new_items: Option<Vec<String>>,
    text: &str,
) -> Outcome {
    match awaiting {
        EditField::CustomerName => {
            if text.is_empty() {
                return Outcome::stay(
                    Flow::EditReceipt {
                        receipt_id,
                        awaiting,
                        new_items,
                    },
                    prompt::need_nonempty(),
                );
            }
            finish_edit(receipt_id, EditChange::CustomerName(text.to_string()))
        }
        EditField::Items => {
            let items = split_list(text);
            if items.is_empty() {
                return Outcome::stay(
                    Flow::EditReceipt {
                        receipt_id,
                        awaiting,
                        new_items,
                    },
                    prompt::invalid_items(),
                );
            }
            let count = items.len();
            Outcome::stay(
                Flow::EditReceipt {
                    receipt_id,
                    awaiting: EditField::Prices,
                    new_items: Some(items),
                },
                prompt::ask_prices(count),
            )
        }
        EditField::Prices => {
            let items = new_items.unwrap_or_default();
            match parse_price_list(text, items.len()) {
                Ok(prices) => finish_edit(receipt_id, EditChange::ItemsAndPrices { items, prices }),
                Err(reply) => Outcome::stay(
                    Flow::EditReceipt {
                        receipt_id,
                        awaiting,
                        new_items: Some(items),
                    },
                    reply,
                ),
            }
        }
        EditField::PaymentMethod => {
            if text.is_empty() {
                return Outcome::stay(
                    Flow::EditReceipt {
                        receipt_id,
                        awaiting,
                        new_items,
                    },
                    prompt::need_nonempty(),
                );
            }
            finish_edit(receipt_id, EditChange::PaymentMethod(text.to_string()))
        }
    }
}

fn edit_question(field: EditField, item_count: usize) -> String {
    match field {
        EditField::CustomerName => prompt::ask_customer_name(),
        EditField::Items => prompt::ask_items(),
        EditField::Prices => prompt::ask_prices(item_count),
        EditField::PaymentMethod => prompt::ask_payment_method(),
    }
}

fn finish_edit(receipt_id: String, change: EditChange) -> Outcome {
    Outcome {
        next_flow: Flow::Idle,
        replies: vec![prompt::ack_regenerating()],
        effects: vec![Effect::EditReceipt { receipt_id, change }],
    }
}

fn payment_decision(text: &str) -> Outcome {
    if text.eq_ignore_ascii_case("yes") {
        Outcome {
            next_flow: Flow::Idle,
            replies: Vec::new(),
            effects: vec![Effect::ProvisionAccount],
        }
    } else {
        Outcome::idle(prompt::payment_declined())
    }
}

fn handle_image(flow: Flow, view: &UserView, media: &InboundMedia) -> Outcome {
    match flow {
        Flow::AwaitingLogo => Outcome {
            next_flow: Flow::Idle,
            replies: Vec::new(),
            effects: vec![Effect::StoreLogo(media.clone())],
        },
        Flow::Idle => Outcome::idle(prompt::help_menu(view.user.display_name())),
        // An image is not a "yes".
        Flow::PaymentDecision => Outcome::idle(prompt::payment_declined()),
        Flow::Setup { awaiting, draft } => {
            let question = setup_question(awaiting);
            Outcome::stay(Flow::Setup { awaiting, draft }, question)
        }
        Flow::NewReceipt { awaiting, draft } => {
            let question = receipt_question(awaiting, draft.items.as_ref().map_or(0, Vec::len));
            Outcome::stay(Flow::NewReceipt { awaiting, draft }, question)
        }
        Flow::EditChoice { receipt_id } => {
            Outcome::stay(Flow::EditChoice { receipt_id }, prompt::invalid_edit_choice())
        }
        Flow::EditReceipt {
            receipt_id,
            awaiting,
            new_items,
        } => {
            let question = edit_question(awaiting, new_items.as_ref().map_or(0, Vec::len));
            Outcome::stay(
                Flow::EditReceipt {
                    receipt_id,
                    awaiting,
                    new_items,
                },
                question,
            )
        }
    }
}

/// Split a comma-separated answer into trimmed, non-empty entries.
fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate a price answer against the expected entry count and return the
/// canonical decimal texts, or the re-prompt to send back.
fn parse_price_list(text: &str, expected: usize) -> Result<Vec<String>, String> {
    let entries = split_list(text);
    if entries.len() != expected {
        return Err(prompt::price_count_mismatch(expected, entries.len()));
    }
    let mut prices = Vec::with_capacity(entries.len());
    for entry in &entries {
        match money::parse_amount(entry) {
            Ok(amount) => prices.push(amount.to_string()),
            Err(_) => return Err(prompt::invalid_price(entry)),
        }
    }
    Ok(prices)
}
