// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Kvitto.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer concurrency
//! model via `tokio-rusqlite`. [`SqliteRepository`] implements the
//! `kvitto-core` repository trait over typed user and receipt queries.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteRepository;
pub use database::Database;
