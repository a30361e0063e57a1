// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Order-book reconstruction from decoded market data.
//!
//! - `orderbook`: fixed-depth two-sided book with new/change/delete and
//!   trade application
//! - `secdef`: security-definition index (symbol and depth per id)
//! - `processor`: packet-level glue from decoded messages to books

pub mod orderbook;
pub mod processor;
pub mod secdef;

pub use orderbook::{BookAction, OrderBook, OrderBookEntry, Side};
pub use processor::{
    LoggingBookHandler, OrderBookHandler, PacketProcessor, PACKET_HEADER_LEN,
    TEMPLATE_INCREMENTAL_REFRESH_BOOK, TEMPLATE_TRADE_SUMMARY,
};
pub use secdef::SecDef;
