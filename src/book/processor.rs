// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Packet-to-book glue.
//!
//! Owns the per-security order books and routes decoded messages into
//! them: template 32 (incremental refresh book) entries become book
//! updates, template 42 (trade summary) entries become trades. Stream
//! sequencing is handled here: duplicate packets are dropped, gaps are
//! logged and processing continues. Per-message decode errors skip the
//! remainder of the offending packet.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::book::orderbook::OrderBook;
use crate::book::secdef::SecDef;
use crate::core::{Result, SbeValue};
use crate::decode::group::GroupEntry;
use crate::decode::message::Message;
use crate::decode::parser::{MessageFactory, SbeParser};
use crate::decode::primitive;

/// MDP packet header: stream sequence (i32) + sending time (u64).
pub const PACKET_HEADER_LEN: usize = 12;

/// Template id of MDIncrementalRefreshBook.
pub const TEMPLATE_INCREMENTAL_REFRESH_BOOK: u16 = 32;

/// Template id of MDIncrementalRefreshTradeSummary.
pub const TEMPLATE_TRADE_SUMMARY: u16 = 42;

/// Callbacks fired as books change. Implementations override what they
/// care about; the defaults are no-ops.
pub trait OrderBookHandler {
    /// A book changed within its visible depth. Fired once per touched
    /// book per packet.
    fn on_orderbook(&mut self, _book: &OrderBook) {}

    /// A trade summary was applied to a book. Fired per trade entry.
    fn on_trade(&mut self, _book: &OrderBook) {}
}

/// Handler that renders books and trades through `tracing`.
#[derive(Debug, Default)]
pub struct LoggingBookHandler;

impl OrderBookHandler for LoggingBookHandler {
    fn on_orderbook(&mut self, book: &OrderBook) {
        info!(security_id = book.security_id, "\n{book}");
    }

    fn on_trade(&mut self, book: &OrderBook) {
        info!(
            security_id = book.security_id,
            price = ?book.last_price,
            size = ?book.last_size,
            aggressor = ?book.last_aggressor_side,
            "trade"
        );
    }
}

/// Consumes UDP payloads and maintains the outright books.
///
/// Single-consumer by design; wrap in external synchronization to share
/// across threads.
pub struct PacketProcessor<F: MessageFactory> {
    parser: SbeParser<F>,
    secdef: SecDef,
    security_id_filter: Option<HashSet<i32>>,
    stream_sequence: i64,
    sending_time: Option<u64>,
    // None caches "no depth known for this id"; implieds are not tracked
    books: HashMap<i32, Option<OrderBook>>,
    handler: Option<Box<dyn OrderBookHandler>>,
}

impl<F: MessageFactory> PacketProcessor<F> {
    pub fn new(parser: SbeParser<F>, secdef: SecDef) -> Self {
        Self {
            parser,
            secdef,
            security_id_filter: None,
            stream_sequence: -1,
            sending_time: None,
            books: HashMap::new(),
            handler: None,
        }
    }

    /// Restrict processing to the given security ids.
    pub fn with_security_id_filter(mut self, filter: HashSet<i32>) -> Self {
        self.security_id_filter = Some(filter);
        self
    }

    /// Install the callback handler.
    pub fn set_handler(&mut self, handler: Box<dyn OrderBookHandler>) {
        self.handler = Some(handler);
    }

    /// Last stream sequence number accepted.
    pub fn stream_sequence(&self) -> i64 {
        self.stream_sequence
    }

    /// Sending time of the last accepted packet, nanoseconds.
    pub fn sending_time(&self) -> Option<u64> {
        self.sending_time
    }

    /// The book for a security id, if one was built.
    pub fn book(&self, security_id: i32) -> Option<&OrderBook> {
        self.books.get(&security_id).and_then(|b| b.as_ref())
    }

    /// Process one UDP payload. `received_time` is the capture time in
    /// microseconds.
    pub fn handle_packet(&mut self, received_time: u64, packet: &[u8]) {
        if packet.len() < PACKET_HEADER_LEN {
            warn!(len = packet.len(), "runt packet; dropping");
            return;
        }
        // Length was checked; these reads cannot fail
        let stream_sequence = match primitive::read_i32(packet, 0) {
            Ok(v) => v as i64,
            Err(_) => return,
        };
        let sending_time = match primitive::read_u64(packet, 4) {
            Ok(v) => v,
            Err(_) => return,
        };

        if stream_sequence <= self.stream_sequence {
            debug!(
                sequence = stream_sequence,
                last = self.stream_sequence,
                "duplicate packet; dropping"
            );
            return;
        }
        if self.stream_sequence + 1 != stream_sequence {
            warn!(
                from = self.stream_sequence,
                to = stream_sequence,
                "stream sequence gap"
            );
        }

        self.stream_sequence = stream_sequence;
        self.sending_time = Some(sending_time);

        let Self {
            parser,
            secdef,
            security_id_filter,
            books,
            handler,
            ..
        } = self;

        let mut touched: HashSet<i32> = HashSet::new();
        for result in parser.parse(packet, PACKET_HEADER_LEN) {
            let message = match result {
                Ok(message) => message,
                Err(error) => {
                    warn!(
                        %error,
                        sequence = stream_sequence,
                        head = %hex::encode(&packet[..packet.len().min(24)]),
                        "decode failed; skipping rest of packet"
                    );
                    break;
                }
            };

            let outcome = match message.template_id() {
                TEMPLATE_INCREMENTAL_REFRESH_BOOK => apply_book_message(
                    &message,
                    secdef,
                    security_id_filter.as_ref(),
                    books,
                    sending_time,
                    received_time,
                    stream_sequence,
                    &mut touched,
                ),
                TEMPLATE_TRADE_SUMMARY => apply_trade_message(
                    &message,
                    secdef,
                    security_id_filter.as_ref(),
                    books,
                    handler,
                    sending_time,
                    received_time,
                    stream_sequence,
                ),
                _ => Ok(()),
            };

            if let Err(error) = outcome {
                warn!(
                    %error,
                    sequence = stream_sequence,
                    "message handling failed; skipping rest of packet"
                );
                break;
            }
        }

        // Visible updates are batched per packet
        if let Some(handler) = handler {
            for security_id in &touched {
                if let Some(Some(book)) = books.get(security_id) {
                    handler.on_orderbook(book);
                }
            }
        }
    }
}

/// Find or create the book for a security id. Unknown depths are cached
/// as unavailable so the secdef is probed once per id.
fn resolve_book<'b>(
    books: &'b mut HashMap<i32, Option<OrderBook>>,
    secdef: &SecDef,
    security_id: i32,
) -> Option<&'b mut OrderBook> {
    books
        .entry(security_id)
        .or_insert_with(|| {
            secdef
                .lookup_security_id(security_id)
                .map(|(symbol, depth)| OrderBook::new(security_id, depth as usize, symbol))
        })
        .as_mut()
}

fn entry_value(entry: &GroupEntry<'_, '_>, name: &str) -> Result<Option<SbeValue>> {
    match entry.field(name) {
        Some(field) => field.value(),
        None => Ok(None),
    }
}

fn entry_i64(entry: &GroupEntry<'_, '_>, name: &str) -> Result<Option<i64>> {
    Ok(entry_value(entry, name)?.and_then(|v| v.as_i64()))
}

fn entry_f64(entry: &GroupEntry<'_, '_>, name: &str) -> Result<Option<f64>> {
    Ok(entry_value(entry, name)?.and_then(|v| v.as_f64()))
}

fn entry_string(entry: &GroupEntry<'_, '_>, name: &str) -> Result<Option<String>> {
    Ok(entry_value(entry, name)?.map(|v| v.to_string()))
}

#[allow(clippy::too_many_arguments)]
fn apply_book_message(
    message: &Message<'_>,
    secdef: &SecDef,
    filter: Option<&HashSet<i32>>,
    books: &mut HashMap<i32, Option<OrderBook>>,
    sending_time: u64,
    received_time: u64,
    stream_sequence: i64,
    touched: &mut HashSet<i32>,
) -> Result<()> {
    let group = match message.group("no_md_entries") {
        Some(group) => group,
        None => return Ok(()),
    };

    for entry in group.entries() {
        let security_id = match entry_i64(&entry, "security_id")? {
            Some(id) => id as i32,
            None => continue,
        };
        if let Some(filter) = filter {
            if !filter.contains(&security_id) {
                continue;
            }
        }
        let book = match resolve_book(books, secdef, security_id) {
            Some(book) => book,
            None => continue,
        };

        let rpt_seq = match entry_i64(&entry, "rpt_seq")? {
            Some(seq) => seq,
            None => continue,
        };
        let price = entry_f64(&entry, "md_entry_px")?;
        let size = entry_i64(&entry, "md_entry_size")?;
        let num_orders = entry_i64(&entry, "number_of_orders")?;
        let level = entry_i64(&entry, "md_price_level")?.unwrap_or(0).max(0) as usize;
        let action = entry_string(&entry, "md_update_action")?.unwrap_or_default();
        let entry_type = entry_string(&entry, "md_entry_type")?.unwrap_or_default();

        let visible = book.handle_update(
            sending_time,
            received_time,
            stream_sequence,
            rpt_seq,
            level,
            &entry_type,
            &action,
            price,
            size,
            num_orders,
        );
        if visible {
            touched.insert(security_id);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_trade_message(
    message: &Message<'_>,
    secdef: &SecDef,
    filter: Option<&HashSet<i32>>,
    books: &mut HashMap<i32, Option<OrderBook>>,
    handler: &mut Option<Box<dyn OrderBookHandler>>,
    sending_time: u64,
    received_time: u64,
    stream_sequence: i64,
) -> Result<()> {
    let group = match message.group("no_md_entries") {
        Some(group) => group,
        None => return Ok(()),
    };

    for entry in group.entries() {
        let security_id = match entry_i64(&entry, "security_id")? {
            Some(id) => id as i32,
            None => continue,
        };
        if let Some(filter) = filter {
            if !filter.contains(&security_id) {
                continue;
            }
        }
        let book = match resolve_book(books, secdef, security_id) {
            Some(book) => book,
            None => continue,
        };

        let rpt_seq = match entry_i64(&entry, "rpt_seq")? {
            Some(seq) => seq,
            None => continue,
        };
        let price = entry_f64(&entry, "md_entry_px")?;
        let size = entry_i64(&entry, "md_entry_size")?;
        let aggressor = entry_string(&entry, "aggressor_side")?;

        book.handle_trade(
            sending_time,
            received_time,
            stream_sequence,
            rpt_seq,
            price,
            size,
            aggressor.as_deref(),
        );

        if let Some(handler) = handler {
            handler.on_trade(book);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::parser::MdpMessageFactory;
    use crate::schema::{Schema, SchemaConfig};
    use std::cell::RefCell;
    use std::rc::Rc;

    const SCHEMA: &str = r#"<messageSchema version="8" byteOrder="littleEndian">
        <types>
            <composite name="messageHeader">
                <type name="blockLength" primitiveType="uint16"/>
                <type name="templateId" primitiveType="uint16"/>
                <type name="schemaId" primitiveType="uint16"/>
                <type name="version" primitiveType="uint16"/>
            </composite>
            <composite name="groupSize">
                <type name="blockLength" primitiveType="uint16"/>
                <type name="numInGroup" primitiveType="uint8" offset="2"/>
            </composite>
            <composite name="PRICE">
                <type name="mantissa" primitiveType="int64"/>
                <type name="exponent" primitiveType="int8" presence="constant">-7</type>
            </composite>
            <type name="uInt8" primitiveType="uint8"/>
            <enum name="MDUpdateAction" encodingType="uInt8">
                <validValue name="New" description="New">0</validValue>
                <validValue name="Change" description="Change">1</validValue>
                <validValue name="Delete" description="Delete">2</validValue>
            </enum>
            <enum name="MDEntryTypeBook" encodingType="char">
                <validValue name="Bid" description="Bid">0</validValue>
                <validValue name="Offer" description="Offer">1</validValue>
            </enum>
            <enum name="AggressorSide" encodingType="uInt8">
                <validValue name="NoAggressor" description="No Aggressor">0</validValue>
                <validValue name="Buy" description="Buy">1</validValue>
                <validValue name="Sell" description="Sell">2</validValue>
            </enum>
        </types>
        <message name="MDIncrementalRefreshBook" id="32" blockLength="0">
            <group name="NoMDEntries" id="268" dimensionType="groupSize">
                <field name="MDEntryPx" id="270" type="PRICE" offset="0"/>
                <field name="MDEntrySize" id="271" type="int32" offset="8"/>
                <field name="SecurityID" id="48" type="int32" offset="12"/>
                <field name="RptSeq" id="83" type="uint32" offset="16"/>
                <field name="NumberOfOrders" id="346" type="int32" offset="20"/>
                <field name="MDPriceLevel" id="1023" type="uint8" offset="24"/>
                <field name="MDUpdateAction" id="279" type="MDUpdateAction" offset="25"/>
                <field name="MDEntryType" id="269" type="MDEntryTypeBook" offset="26"/>
            </group>
        </message>
        <message name="MDIncrementalRefreshTradeSummary" id="42" blockLength="0">
            <group name="NoMDEntries" id="268" dimensionType="groupSize">
                <field name="MDEntryPx" id="270" type="PRICE" offset="0"/>
                <field name="MDEntrySize" id="271" type="int32" offset="8"/>
                <field name="SecurityID" id="48" type="int32" offset="12"/>
                <field name="RptSeq" id="83" type="uint32" offset="16"/>
                <field name="AggressorSide" id="5797" type="AggressorSide" offset="20"/>
            </group>
        </message>
    </messageSchema>"#;

    struct BookEntrySpec {
        mantissa: i64,
        size: i32,
        security_id: i32,
        rpt_seq: u32,
        num_orders: i32,
        level: u8,
        action: u8,
        entry_type: u8,
    }

    fn book_message(entries: &[BookEntrySpec]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&27u16.to_le_bytes()); // entry block length
        body.push(entries.len() as u8);
        for e in entries {
            body.extend_from_slice(&e.mantissa.to_le_bytes());
            body.extend_from_slice(&e.size.to_le_bytes());
            body.extend_from_slice(&e.security_id.to_le_bytes());
            body.extend_from_slice(&e.rpt_seq.to_le_bytes());
            body.extend_from_slice(&e.num_orders.to_le_bytes());
            body.push(e.level);
            body.push(e.action);
            body.push(e.entry_type);
        }
        frame_message(32, &body)
    }

    fn trade_message(mantissa: i64, size: i32, security_id: i32, rpt_seq: u32, aggressor: u8) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&21u16.to_le_bytes());
        body.push(1);
        body.extend_from_slice(&mantissa.to_le_bytes());
        body.extend_from_slice(&size.to_le_bytes());
        body.extend_from_slice(&security_id.to_le_bytes());
        body.extend_from_slice(&rpt_seq.to_le_bytes());
        body.push(aggressor);
        frame_message(42, &body)
    }

    fn frame_message(template_id: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((10 + body.len()) as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // blockLength
        out.extend_from_slice(&template_id.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&8u16.to_le_bytes()); // version
        out.extend_from_slice(body);
        out
    }

    fn packet(stream_sequence: i32, messages: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&stream_sequence.to_le_bytes());
        out.extend_from_slice(&1_500_000_000_000_000_000u64.to_le_bytes());
        for m in messages {
            out.extend_from_slice(m);
        }
        out
    }

    fn secdef() -> SecDef {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(b"48=23936\x0155=ESH8\x01264=3\x01\n")
            .unwrap();
        let bytes = encoder.finish().unwrap();
        SecDef::load_reader(bytes.as_slice()).unwrap()
    }

    #[derive(Default)]
    struct Events {
        books: Vec<i32>,
        trades: Vec<(i32, Option<f64>)>,
    }

    struct Recorder(Rc<RefCell<Events>>);

    impl OrderBookHandler for Recorder {
        fn on_orderbook(&mut self, book: &OrderBook) {
            self.0.borrow_mut().books.push(book.security_id);
        }
        fn on_trade(&mut self, book: &OrderBook) {
            self.0.borrow_mut().trades.push((book.security_id, book.last_price));
        }
    }

    fn processor() -> (PacketProcessor<MdpMessageFactory>, Rc<RefCell<Events>>) {
        let schema = Schema::parse_str(SCHEMA, SchemaConfig::default()).unwrap();
        let parser = SbeParser::new(MdpMessageFactory::new(schema));
        let mut processor = PacketProcessor::new(parser, secdef());
        let events = Rc::new(RefCell::new(Events::default()));
        processor.set_handler(Box::new(Recorder(events.clone())));
        (processor, events)
    }

    fn new_bid(security_id: i32, rpt_seq: u32, mantissa: i64, level: u8) -> BookEntrySpec {
        BookEntrySpec {
            mantissa,
            size: 2,
            security_id,
            rpt_seq,
            num_orders: 1,
            level,
            action: 0,
            entry_type: b'0',
        }
    }

    #[test]
    fn test_book_update_flows_into_orderbook() {
        let (mut processor, events) = processor();
        let packet = packet(1, &[book_message(&[new_bid(23936, 1, 2431500000000, 1)])]);
        processor.handle_packet(1_000, &packet);

        let book = processor.book(23936).expect("book created");
        assert_eq!(book.bids()[0].price, Some(243150.0));
        assert_eq!(book.instrument_sequence, 1);
        assert_eq!(events.borrow().books, vec![23936]);
    }

    #[test]
    fn test_on_orderbook_batched_per_packet() {
        let (mut processor, events) = processor();
        // two updates to the same book in one packet
        let packet = packet(
            1,
            &[book_message(&[
                new_bid(23936, 1, 2431500000000, 1),
                new_bid(23936, 2, 2431250000000, 2),
            ])],
        );
        processor.handle_packet(1_000, &packet);
        assert_eq!(events.borrow().books.len(), 1);
    }

    #[test]
    fn test_duplicate_packet_dropped() {
        let (mut processor, events) = processor();
        let first = packet(1, &[book_message(&[new_bid(23936, 1, 2431500000000, 1)])]);
        processor.handle_packet(1_000, &first);
        let replay = packet(1, &[book_message(&[new_bid(23936, 2, 9990000000000, 1)])]);
        processor.handle_packet(1_001, &replay);

        let book = processor.book(23936).unwrap();
        assert_eq!(book.bids()[0].price, Some(243150.0));
        assert_eq!(events.borrow().books.len(), 1);
    }

    #[test]
    fn test_gap_is_logged_but_processed() {
        let (mut processor, _) = processor();
        let first = packet(1, &[book_message(&[new_bid(23936, 1, 2431500000000, 1)])]);
        processor.handle_packet(1_000, &first);
        // jump from 1 to 5
        let gapped = packet(5, &[book_message(&[new_bid(23936, 2, 2431750000000, 1)])]);
        processor.handle_packet(1_001, &gapped);
        assert_eq!(processor.stream_sequence(), 5);
        assert_eq!(processor.book(23936).unwrap().bids()[0].price, Some(243175.0));
    }

    #[test]
    fn test_unknown_security_cached_as_unavailable() {
        let (mut processor, events) = processor();
        let packet = packet(1, &[book_message(&[new_bid(77777, 1, 1000000000, 1)])]);
        processor.handle_packet(1_000, &packet);
        assert!(processor.book(77777).is_none());
        assert!(events.borrow().books.is_empty());
    }

    #[test]
    fn test_security_id_filter() {
        let schema = Schema::parse_str(SCHEMA, SchemaConfig::default()).unwrap();
        let parser = SbeParser::new(MdpMessageFactory::new(schema));
        let mut processor = PacketProcessor::new(parser, secdef())
            .with_security_id_filter([1].into_iter().collect());
        let packet = packet(1, &[book_message(&[new_bid(23936, 1, 2431500000000, 1)])]);
        processor.handle_packet(1_000, &packet);
        assert!(processor.book(23936).is_none());
    }

    #[test]
    fn test_trade_summary_fires_on_trade() {
        let (mut processor, events) = processor();
        let packet = packet(1, &[trade_message(2434500000000, 2, 23936, 10, 1)]);
        processor.handle_packet(1_000, &packet);

        let book = processor.book(23936).unwrap();
        assert_eq!(book.last_price, Some(243450.0));
        assert_eq!(book.last_size, Some(2));
        assert_eq!(book.last_aggressor_side.as_deref(), Some("Buy"));
        assert_eq!(events.borrow().trades, vec![(23936, Some(243450.0))]);
    }

    #[test]
    fn test_runt_packet_dropped() {
        let (mut processor, _) = processor();
        processor.handle_packet(1_000, &[1, 2, 3]);
        assert_eq!(processor.stream_sequence(), -1);
    }

    #[test]
    fn test_decode_error_skips_packet_but_keeps_state() {
        let (mut processor, _) = processor();
        let good = packet(1, &[book_message(&[new_bid(23936, 1, 2431500000000, 1)])]);
        processor.handle_packet(1_000, &good);

        // packet 2 carries an unknown template id
        let mut bad_message = frame_message(99, &[0u8; 3]);
        bad_message[4] = 99;
        let bad = packet(2, &[bad_message]);
        processor.handle_packet(1_001, &bad);

        // stream sequence advanced; book state intact; next packet works
        assert_eq!(processor.stream_sequence(), 2);
        let next = packet(3, &[book_message(&[new_bid(23936, 2, 2431750000000, 1)])]);
        processor.handle_packet(1_002, &next);
        assert_eq!(processor.book(23936).unwrap().bids()[0].price, Some(243175.0));
    }
}
