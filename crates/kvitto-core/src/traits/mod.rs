// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Every external collaborator sits behind one of these traits so the
//! conversation engine can be exercised deterministically with mocks. All
//! traits use `#[async_trait]` for dynamic dispatch.

pub mod adapter;
pub mod channel;
pub mod repository;
pub mod services;

pub use adapter::ServiceAdapter;
pub use channel::{ChannelAdapter, ChannelIngest};
pub use repository::Repository;
pub use services::{MediaHost, PaymentProvider, ReceiptRenderer};
