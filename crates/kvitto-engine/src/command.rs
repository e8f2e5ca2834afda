// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Global command words.
//!
//! Commands are matched case-insensitively against the whole trimmed text
//! and are checked before any per-state handler, from every state. A
//! command always discards whatever draft the current flow holds.

/// The global command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show the help menu.
    Menu,
    /// Abandon the current flow and any in-flight generation.
    Cancel,
    /// Start receipt creation.
    NewReceipt,
    /// Start editing the latest receipt.
    Edit,
    /// Resend the latest receipt.
    Resend,
    /// Start (or redo) brand setup.
    Setup,
    /// Jump straight to logo upload.
    Logo,
}

impl Command {
    /// Parse a message text as a command, if it is one.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "menu" | "help" => Some(Self::Menu),
            "cancel" => Some(Self::Cancel),
            "new receipt" => Some(Self::NewReceipt),
            "edit" => Some(Self::Edit),
            "resend" => Some(Self::Resend),
            "setup" => Some(Self::Setup),
            "logo" => Some(Self::Logo),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively_with_whitespace() {
        assert_eq!(Command::parse("menu"), Some(Command::Menu));
        assert_eq!(Command::parse("  MENU "), Some(Command::Menu));
        assert_eq!(Command::parse("help"), Some(Command::Menu));
        assert_eq!(Command::parse("Cancel"), Some(Command::Cancel));
        assert_eq!(Command::parse("New Receipt"), Some(Command::NewReceipt));
        assert_eq!(Command::parse("EDIT"), Some(Command::Edit));
        assert_eq!(Command::parse("resend"), Some(Command::Resend));
        assert_eq!(Command::parse("Setup"), Some(Command::Setup));
        assert_eq!(Command::parse("logo"), Some(Command::Logo));
    }

    #[test]
    fn ordinary_text_is_not_a_command() {
        assert_eq!(Command::parse("Chinedu"), None);
        assert_eq!(Command::parse("new"), None);
        assert_eq!(Command::parse("receipt"), None);
        assert_eq!(Command::parse("cancel it"), None);
        assert_eq!(Command::parse(""), None);
    }
}
