// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Packet-processor tests over recorded payloads: decoded messages flow
//! into per-instrument books and fire handler callbacks.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use flate2::write::GzEncoder;
use flate2::Compression;
use sbecodec::{
    MdpMessageFactory, OrderBook, OrderBookHandler, PacketProcessor, SbeParser, Schema, SecDef,
};

const INCREMENTAL_BOOK_PACKET: &str = "c30fa90082dd3f8b069bd91478000b0020000100080095ab3d8b069bd914840000200002009bb1203602000002000000805d00003e2d140001000000010030000000000080e8ca113602000002000000805d00003f2d140001000000020130000000000018000000000000019c53980a9600000024131444010000000200000001010000";

const TRADE_SUMMARY_PACKET: &str = "2f0aa9007decc6d2059bd91460000b002a000100080085b89fd2059bd91401000020000100f981d336020000020000000a610000fe2aac00020000000100ffffffff000010000000000000023051980a960000000200000000000000ad50980a960000000200000000000000";

fn secdef() -> SecDef {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(b"35=d\x0148=23936\x0155=ESU7\x01264=10\x01\n35=d\x0148=24842\x0155=NQU7\x01264=10\x01\n")
        .unwrap();
    let bytes = encoder.finish().unwrap();
    SecDef::load_reader(bytes.as_slice()).unwrap()
}

fn processor() -> (PacketProcessor<MdpMessageFactory>, Rc<RefCell<Events>>) {
    let schema = Schema::parse(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/mdp_subset.xml"
    ))
    .expect("fixture schema loads");
    let parser = SbeParser::new(MdpMessageFactory::new(schema));
    let mut processor = PacketProcessor::new(parser, secdef());
    let events = Rc::new(RefCell::new(Events::default()));
    processor.set_handler(Box::new(Recorder(events.clone())));
    (processor, events)
}

#[derive(Default)]
struct Events {
    books: Vec<i32>,
    trades: Vec<(i32, Option<f64>, Option<String>)>,
}

struct Recorder(Rc<RefCell<Events>>);

impl OrderBookHandler for Recorder {
    fn on_orderbook(&mut self, book: &OrderBook) {
        self.0.borrow_mut().books.push(book.security_id);
    }
    fn on_trade(&mut self, book: &OrderBook) {
        self.0.borrow_mut().trades.push((
            book.security_id,
            book.last_price,
            book.last_aggressor_side.clone(),
        ));
    }
}

#[test]
fn test_incremental_book_packet_builds_the_book() {
    let (mut processor, events) = processor();
    let packet = hex::decode(INCREMENTAL_BOOK_PACKET).unwrap();
    processor.handle_packet(1_000, &packet);

    // stream sequence from the packet header
    assert_eq!(processor.stream_sequence(), 0x00a90fc3);
    assert_eq!(processor.sending_time(), Some(1502402403113098626));

    let book = processor.book(23936).expect("book for ESU7");
    assert_eq!(book.description, "ESU7");
    assert_eq!(book.levels(), 10);
    // entry 1: New Bid 243150.0 at level 1; entry 2: Change Bid 243125.0
    // at level 2
    assert_eq!(book.bids()[0].price, Some(243150.0));
    assert_eq!(book.bids()[0].size, Some(2));
    assert_eq!(book.bids()[0].num_orders, Some(1));
    assert_eq!(book.bids()[1].price, Some(243125.0));
    assert_eq!(book.instrument_sequence, 1322303);

    // one visible-update callback for the one touched book
    assert_eq!(events.borrow().books, vec![23936]);
}

#[test]
fn test_trade_summary_packet_fires_trades() {
    let (mut processor, events) = processor();
    let packet = hex::decode(TRADE_SUMMARY_PACKET).unwrap();
    processor.handle_packet(2_000, &packet);

    let book = processor.book(24842).expect("book for NQU7");
    assert_eq!(book.last_price, Some(243450.0));
    assert_eq!(book.last_size, Some(2));
    assert_eq!(book.last_aggressor_side.as_deref(), Some("Buy"));
    assert_eq!(book.instrument_sequence, 11283198);

    assert_eq!(
        events.borrow().trades,
        vec![(24842, Some(243450.0), Some("Buy".to_string()))]
    );
}

#[test]
fn test_replayed_packet_is_dropped() {
    let (mut processor, events) = processor();
    let packet = hex::decode(INCREMENTAL_BOOK_PACKET).unwrap();
    processor.handle_packet(1_000, &packet);
    processor.handle_packet(1_001, &packet);

    // second delivery neither mutates the book nor refires callbacks
    assert_eq!(events.borrow().books.len(), 1);
    assert_eq!(processor.book(23936).unwrap().instrument_sequence, 1322303);
}

#[test]
fn test_filter_excludes_other_securities() {
    let schema = Schema::parse(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/mdp_subset.xml"
    ))
    .unwrap();
    let parser = SbeParser::new(MdpMessageFactory::new(schema));
    let mut processor = PacketProcessor::new(parser, secdef())
        .with_security_id_filter([24842].into_iter().collect());

    let packet = hex::decode(INCREMENTAL_BOOK_PACKET).unwrap();
    processor.handle_packet(1_000, &packet);
    assert!(processor.book(23936).is_none());
}
