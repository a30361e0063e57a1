// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Fixed-depth two-sided order book driven by incremental refresh
//! updates.
//!
//! Each side is a dense ladder of exactly `levels` entries; `New`
//! inserts and shifts, `Delete` removes and backfills, `Change`
//! overwrites in place. Updates carry a per-instrument sequence number
//! used to drop duplicates. Stale or unrecognized inputs are no-ops
//! reported as `false`, never errors.

use std::fmt;

/// One price level: all fields optional because empty ladder slots and
/// `Delete` updates carry no values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBookEntry {
    pub price: Option<f64>,
    pub size: Option<i64>,
    pub num_orders: Option<i64>,
}

/// Book side, as decoded from the MDEntryType enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Offer,
}

impl Side {
    /// Parse a decoded entry-type value. Anything other than the two
    /// outright sides (trades, implied quantities, statistics) is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Bid" => Some(Side::Bid),
            "Offer" => Some(Side::Offer),
            _ => None,
        }
    }
}

/// Book action, as decoded from the MDUpdateAction enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookAction {
    New,
    Change,
    Delete,
}

impl BookAction {
    /// Parse a decoded update-action value. DeleteThru/DeleteFrom/Overlay
    /// are not handled and map to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "New" => Some(BookAction::New),
            "Change" => Some(BookAction::Change),
            "Delete" => Some(BookAction::Delete),
            _ => None,
        }
    }
}

/// A per-instrument depth book.
#[derive(Debug, Clone)]
pub struct OrderBook {
    pub security_id: i32,
    /// Symbol or other human-readable tag from the security definition
    pub description: String,
    levels: usize,
    /// Levels a consumer observes; updates deeper than this still apply
    /// but do not count as visible changes
    pub display_levels: usize,
    pub sending_time: Option<u64>,
    pub received_time: Option<u64>,
    pub stream_sequence: i64,
    pub instrument_sequence: i64,
    pub last_price: Option<f64>,
    pub last_size: Option<i64>,
    pub last_aggressor_side: Option<String>,
    bids: Vec<OrderBookEntry>,
    offers: Vec<OrderBookEntry>,
}

impl OrderBook {
    /// Create an empty book with `levels` depth on each side.
    pub fn new(security_id: i32, levels: usize, description: impl Into<String>) -> Self {
        OrderBook {
            security_id,
            description: description.into(),
            levels,
            display_levels: levels,
            sending_time: None,
            received_time: None,
            stream_sequence: -1,
            instrument_sequence: -1,
            last_price: None,
            last_size: None,
            last_aggressor_side: None,
            bids: vec![OrderBookEntry::default(); levels],
            offers: vec![OrderBookEntry::default(); levels],
        }
    }

    /// Configured depth of each side.
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// The bid ladder, best first. Always exactly `levels` entries.
    pub fn bids(&self) -> &[OrderBookEntry] {
        &self.bids
    }

    /// The offer ladder, best first. Always exactly `levels` entries.
    pub fn offers(&self) -> &[OrderBookEntry] {
        &self.offers
    }

    /// Clear depth and sequence bookkeeping. Hook for gap recovery.
    pub fn invalidate(&mut self) {
        self.sending_time = None;
        self.received_time = None;
        self.stream_sequence = -1;
        self.instrument_sequence = -1;
        self.bids = vec![OrderBookEntry::default(); self.levels];
        self.offers = vec![OrderBookEntry::default(); self.levels];
    }

    /// Duplicate/stale check against the per-instrument sequence.
    pub fn have_seen_sequence(&self, instrument_sequence: i64) -> bool {
        instrument_sequence <= self.instrument_sequence
    }

    /// Gap detection is disabled until trades, volume, statistics and
    /// implied updates all feed the sequence; the hook stays so
    /// `handle_update` already routes through it.
    pub fn is_gapped_sequence(&self, _instrument_sequence: i64) -> bool {
        false
        // instrument_sequence > self.instrument_sequence + 1
    }

    fn update_book_keeping(
        &mut self,
        sending_time: u64,
        received_time: u64,
        stream_sequence: i64,
        instrument_sequence: i64,
    ) {
        if self.is_gapped_sequence(instrument_sequence) {
            self.invalidate();
        }
        self.sending_time = Some(sending_time);
        self.received_time = Some(received_time);
        self.stream_sequence = stream_sequence;
        self.instrument_sequence = instrument_sequence;
    }

    fn side_mut(&mut self, side: Side) -> &mut Vec<OrderBookEntry> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Offer => &mut self.offers,
        }
    }

    /// Insert a new entry at a 1-indexed level, shifting deeper entries
    /// down and discarding the tail.
    pub fn add(
        &mut self,
        level: usize,
        side: Side,
        price: Option<f64>,
        size: Option<i64>,
        num_orders: Option<i64>,
    ) {
        let entries = self.side_mut(side);
        entries.insert(
            level - 1,
            OrderBookEntry {
                price,
                size,
                num_orders,
            },
        );
        entries.pop();
    }

    /// Overwrite the entry at a 1-indexed level.
    pub fn change(
        &mut self,
        level: usize,
        side: Side,
        price: Option<f64>,
        size: Option<i64>,
        num_orders: Option<i64>,
    ) {
        let entry = &mut self.side_mut(side)[level - 1];
        entry.price = price;
        entry.size = size;
        entry.num_orders = num_orders;
    }

    /// Remove the entry at a 1-indexed level, shifting deeper entries up
    /// and appending an empty tail entry.
    pub fn delete(&mut self, level: usize, side: Side) {
        let entries = self.side_mut(side);
        entries.remove(level - 1);
        entries.push(OrderBookEntry::default());
    }

    /// Apply one incremental book update.
    ///
    /// Returns `true` iff the update was applied within the visible
    /// depth. Duplicate sequences, unknown entry types or actions, and
    /// out-of-range levels leave the book untouched and return `false`.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_update(
        &mut self,
        sending_time: u64,
        received_time: u64,
        stream_sequence: i64,
        instrument_sequence: i64,
        level: usize,
        entry_type: &str,
        action: &str,
        price: Option<f64>,
        size: Option<i64>,
        num_orders: Option<i64>,
    ) -> bool {
        if self.have_seen_sequence(instrument_sequence) {
            return false;
        }

        // Only outright changes matter here
        let side = match Side::parse(entry_type) {
            Some(side) => side,
            None => return false,
        };

        let action = match BookAction::parse(action) {
            Some(action) => action,
            None => return false,
        };

        if level == 0 || level > self.levels {
            return false;
        }

        self.update_book_keeping(
            sending_time,
            received_time,
            stream_sequence,
            instrument_sequence,
        );

        match action {
            BookAction::New => self.add(level, side, price, size, num_orders),
            BookAction::Change => self.change(level, side, price, size, num_orders),
            BookAction::Delete => self.delete(level, side),
        }

        level <= self.display_levels
    }

    /// Apply one trade summary, subject to the same sequence check.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_trade(
        &mut self,
        sending_time: u64,
        received_time: u64,
        stream_sequence: i64,
        instrument_sequence: i64,
        price: Option<f64>,
        size: Option<i64>,
        aggressor_side: Option<&str>,
    ) -> bool {
        if self.have_seen_sequence(instrument_sequence) {
            return false;
        }

        self.update_book_keeping(
            sending_time,
            received_time,
            stream_sequence,
            instrument_sequence,
        );

        self.last_price = price;
        self.last_size = size;
        self.last_aggressor_side = aggressor_side.map(|s| s.to_string());
        true
    }
}

fn fmt_opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

impl fmt::Display for OrderBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}) SSN:{} ISN:{} Sent:{} Received:{}",
            self.description,
            self.security_id,
            self.stream_sequence,
            self.instrument_sequence,
            fmt_opt(&self.sending_time),
            fmt_opt(&self.received_time),
        )?;
        for i in 0..self.display_levels {
            let bid = &self.bids[i];
            let offer = &self.offers[i];
            writeln!(
                f,
                "({:>6}) {:>6} - {:>12}|{:<12} - {:<6} ({:<6})",
                fmt_opt(&bid.num_orders),
                fmt_opt(&bid.size),
                fmt_opt(&bid.price),
                fmt_opt(&offer.price),
                fmt_opt(&offer.size),
                fmt_opt(&offer.num_orders),
            )?;
        }
        Ok(())
    }
}
