// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing message texts.
//!
//! Everything the bot says lives here so the step logic stays free of
//! copy. Asterisks are WhatsApp bold markup.

use kvitto_core::money::format_naira;
use kvitto_core::{FREE_EDIT_LIMIT, FREE_TRIAL_LIMIT, YEARLY_FEE};
use rust_decimal::Decimal;

// ---- Menu and fallbacks ----

pub(crate) fn help_menu(display_name: &str) -> String {
    format!(
        "Hi {display_name}! 👋 I'm Kvitto, your receipt assistant.\n\n\
         *new receipt* - create a receipt\n\
         *edit* - change your latest receipt\n\
         *resend* - resend your latest receipt\n\
         *setup* - set up your business profile\n\
         *logo* - upload your business logo\n\
         *cancel* - stop what we're doing"
    )
}

pub(crate) fn cancelled() -> String {
    "❌ Cancelled. Type *menu* to see what I can do.".to_string()
}

// ---- Brand setup ----

pub(crate) fn setup_intro() -> String {
    "Let's set up your business profile. 🛠️".to_string()
}

pub(crate) fn setup_needed_first() -> String {
    "Before your first receipt, let's set up your business profile. 🛠️".to_string()
}

pub(crate) fn ask_business_name() -> String {
    "What is your business name?".to_string()
}

pub(crate) fn ask_brand_color() -> String {
    "What's your brand color? (e.g. #0a66c2 or teal)".to_string()
}

pub(crate) fn ask_business_address() -> String {
    "What's your business address? Type *skip* to leave it out.".to_string()
}

pub(crate) fn ask_contact_phone() -> String {
    "What phone number should appear on your receipts? Type *skip* to leave it out.".to_string()
}

pub(crate) fn ask_template() -> String {
    "Choose a receipt template: *1*, *2*, or *3*.".to_string()
}

pub(crate) fn ask_format() -> String {
    "How should receipts be delivered: *png* or *pdf*?".to_string()
}

pub(crate) fn ask_logo() -> String {
    "Almost done! Send your logo image now, or type *skip* to finish.".to_string()
}

pub(crate) fn ask_logo_direct() -> String {
    "Send your logo image, or type *skip*.".to_string()
}

pub(crate) fn logo_must_be_image() -> String {
    "Please send the logo as an image, or type *skip*.".to_string()
}

pub(crate) fn logo_saved() -> String {
    "✅ Logo saved! Setup complete. Type *new receipt* to create your first receipt.".to_string()
}

pub(crate) fn setup_complete() -> String {
    "✅ Setup complete! Type *new receipt* to create your first receipt.".to_string()
}

// ---- Receipt creation ----

pub(crate) fn ask_customer_name() -> String {
    "Who is this receipt for? (customer name)".to_string()
}

pub(crate) fn ask_items() -> String {
    "What did they buy? List the items separated by commas.".to_string()
}

pub(crate) fn ask_prices(item_count: usize) -> String {
    format!(
        "Now the price for each of the {item_count} item(s), in the same order, \
         separated by commas."
    )
}

pub(crate) fn ask_payment_method() -> String {
    "How did they pay? (e.g. Cash, Transfer, POS)".to_string()
}

pub(crate) fn ack_generating() -> String {
    "✅ Got it! Generating your receipt...".to_string()
}

pub(crate) fn ack_regenerating() -> String {
    "✅ Got it! Regenerating...".to_string()
}

pub(crate) fn ack_resending() -> String {
    "✅ Got it! Generating...".to_string()
}

// ---- Editing ----

pub(crate) fn edit_choice_menu() -> String {
    "What would you like to change?\n\
     *1* - customer name\n\
     *2* - items & prices\n\
     *3* - payment method"
        .to_string()
}

pub(crate) fn invalid_edit_choice() -> String {
    "Please reply *1*, *2*, or *3*.".to_string()
}

pub(crate) fn no_receipts_yet() -> String {
    "You don't have any receipts yet. Type *new receipt* to create one.".to_string()
}

pub(crate) fn receipt_gone() -> String {
    "That receipt no longer exists. Type *new receipt* to create a fresh one.".to_string()
}

// ---- Validation re-prompts ----

pub(crate) fn need_nonempty() -> String {
    "I didn't catch that. Please type it out.".to_string()
}

pub(crate) fn invalid_items() -> String {
    "I couldn't read any items there. List them separated by commas, e.g. *Cake, Drink*."
        .to_string()
}

pub(crate) fn invalid_price(entry: &str) -> String {
    format!("`{entry}` doesn't look like a price. Use plain numbers, e.g. *1500, 500*.")
}

pub(crate) fn price_count_mismatch(items: usize, prices: usize) -> String {
    format!(
        "You listed {items} item(s) but {prices} price(s). Send one price per item, \
         in the same order."
    )
}

pub(crate) fn invalid_template() -> String {
    "Please pick template *1*, *2*, or *3*.".to_string()
}

pub(crate) fn invalid_format() -> String {
    "Please reply *png* or *pdf*.".to_string()
}

// ---- Paywall and payment ----

pub(crate) fn paywall_trial() -> String {
    format!(
        "You've used all {FREE_TRIAL_LIMIT} free receipts. 🔒\n\
         To keep creating receipts, the yearly fee is {}.\n\
         Reply *YES* to get payment details.",
        format_naira(Decimal::from(YEARLY_FEE))
    )
}

pub(crate) fn paywall_edits() -> String {
    format!(
        "You've used your {FREE_EDIT_LIMIT} free edits. 🔒\n\
         Full access is {} per year.\n\
         Reply *YES* to get payment details.",
        format_naira(Decimal::from(YEARLY_FEE))
    )
}

pub(crate) fn payment_instructions(account_number: &str, bank_name: &str) -> String {
    format!(
        "Transfer {} to your dedicated account:\n\
         Account: *{account_number}*\n\
         Bank: *{bank_name}*\n\n\
         Your access unlocks automatically once the payment is confirmed.",
        format_naira(Decimal::from(YEARLY_FEE))
    )
}

pub(crate) fn payment_declined() -> String {
    "No problem! Your receipts are safe. Type *menu* anytime.".to_string()
}

pub(crate) fn payment_confirmed() -> String {
    "🎉 Payment confirmed! You now have full access for one year. Thank you!".to_string()
}

// ---- Delivery ----

pub(crate) fn receipt_caption(customer_name: &str) -> String {
    format!("Here is the receipt for {customer_name}.")
}

pub(crate) fn document_filename() -> &'static str {
    "kvitto-receipt.pdf"
}

// ---- Errors ----

pub(crate) fn render_failed() -> String {
    "Sorry, there was an error generating your receipt. Please try again.".to_string()
}

pub(crate) fn unexpected_error() -> String {
    "Sorry, an unexpected error occurred. Please try again.".to_string()
}

pub(crate) fn logo_failed() -> String {
    "Sorry, we couldn't save your logo right now. Type *logo* to try again.".to_string()
}

pub(crate) fn payment_setup_failed() -> String {
    "Sorry, we couldn't prepare your payment details right now. Please try again later."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paywall_prompt_carries_fee_and_limit() {
        let text = paywall_trial();
        assert!(text.contains("3 free receipts"));
        assert!(text.contains("₦2,000"));
        assert!(text.contains("YES"));
    }

    #[test]
    fn instructions_carry_account_details() {
        let text = payment_instructions("9012345678", "Wema Bank");
        assert!(text.contains("9012345678"));
        assert!(text.contains("Wema Bank"));
        assert!(text.contains("₦2,000"));
    }

    #[test]
    fn caption_names_the_customer() {
        assert_eq!(
            receipt_caption("Chinedu"),
            "Here is the receipt for Chinedu."
        );
    }
}
