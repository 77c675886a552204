//! Generated code for protocol/image.idl: encode/decode, lengths, factory dispatch.

use packetgen::stream::{Endianness, StreamError, StreamReader, StreamWriter};
use packetgen_conformance::image::*;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// Six u32 fields on the wire, against the reported `PacketHeader::LENGTH`.
const HEADER_WIRE_LEN: usize = 24;

fn encode_with(packet: &dyn Packet, endianness: Endianness) -> Vec<u8> {
    let mut w = StreamWriter::new(Vec::new(), endianness);
    packet.write(&mut w).expect("write");
    w.into_inner()
}

fn encode(packet: &dyn Packet) -> Vec<u8> {
    encode_with(packet, Endianness::Big)
}

fn decode_with(bytes: &[u8], endianness: Endianness) -> Result<Box<dyn Packet>, FactoryError> {
    let mut r = StreamReader::new(Cursor::new(bytes), endianness);
    PacketFactory::without_cache().create_packet(&mut r)
}

fn decode(bytes: &[u8]) -> Result<Box<dyn Packet>, FactoryError> {
    decode_with(bytes, Endianness::Big)
}

fn image(name: &str, size: u32, snapshots: u32) -> ImageInfo {
    ImageInfo {
        image_name: name.to_string(),
        image_size: size,
        num_snapshot: snapshots,
    }
}

fn kitchen_sink() -> KitchenSink {
    let mut p = KitchenSink::new();
    p.b = 0xfe;
    p.i8 = -3;
    p.i16 = -300;
    p.i32 = -70_000;
    p.i64 = i64::MIN;
    p.u8 = 200;
    p.u16 = 65_000;
    p.u32 = 0xdead_beef;
    p.u64 = u64::MAX;
    p.label = "kitchen".to_string();
    p.geometry = Geometry {
        cylinders: 80,
        heads: 2,
        sectors: 18,
    };
    p.digest = [7; 16];
    p.samples = [-1, 0, i16::MAX];
    p.names = ["first".to_string(), String::new()];
    p.corners = [
        Geometry {
            cylinders: 1,
            heads: 1,
            sectors: 1,
        },
        Geometry::default(),
    ];
    p.payload = vec![1, 2, 3, 4, 5];
    p.readings = vec![0, 1, u32::MAX];
    p.deltas = vec![-128, 0, 127];
    p.tags = vec!["x".to_string(), "yz".to_string(), String::new()];
    p.images = vec![image("disk0", 1024, 2), image("", 0, 0)];
    p.options = KitchenSinkOptions {
        compress: 1,
        level: -9,
    };
    p.set_id(5);
    p.set_ack(6);
    p.set_token(42);
    p.adjust_length().expect("length fits");
    p
}

#[test]
fn kitchen_sink_round_trip_both_byte_orders() {
    let p = kitchen_sink();
    for endianness in [Endianness::Big, Endianness::Little] {
        let bytes = encode_with(&p, endianness);
        let decoded = decode_with(&bytes, endianness).expect("decode");
        assert_eq!(decoded.packet_type(), PKTTYPE_KITCHEN_SINK);
        let decoded = decoded
            .as_any()
            .downcast_ref::<KitchenSink>()
            .expect("KitchenSink");
        assert_eq!(decoded, &p);
    }
}

#[test]
fn encoded_size_matches_length() {
    let p = kitchen_sink();
    let bytes = encode(&p);
    assert_eq!(p.length(), bytes.len() - HEADER_WIRE_LEN + PacketHeader::LENGTH);
    assert_eq!(p.header.len as usize, p.length());

    let login = LoginRequest {
        user_name: "admin".to_string(),
        password: "secret".to_string(),
        version: -1,
        ..LoginRequest::new()
    };
    assert_eq!(login.length(), PacketHeader::LENGTH + (4 + 5) + (4 + 6) + 4);
    assert_eq!(encode(&login).len(), HEADER_WIRE_LEN + (4 + 5) + (4 + 6) + 4);
}

#[test]
fn struct_lengths_are_exact() {
    let info = image("disk0", 1, 2);
    let mut w = StreamWriter::new(Vec::new(), Endianness::Big);
    info.write(&mut w).expect("write");
    let bytes = w.into_inner();
    assert_eq!(info.length(), bytes.len());
    assert_eq!(bytes, [0, 0, 0, 5, b'd', b'i', b's', b'k', b'0', 0, 0, 0, 1, 0, 0, 0, 2]);

    let mut back = ImageInfo::default();
    back.read(&mut StreamReader::new(Cursor::new(&bytes[..]), Endianness::Big))
        .expect("read");
    assert_eq!(back, info);
}

#[test]
fn blank_fields_are_kept_on_the_wire() {
    let extent = Extent {
        start: 1,
        _1: [0xaa, 0xbb],
        count: 2,
        _3: [0; 2],
    };
    assert_eq!(extent.length(), 10);
    let mut w = StreamWriter::new(Vec::new(), Endianness::Big);
    extent.write(&mut w).expect("write");
    let bytes = w.into_inner();
    assert_eq!(bytes, [0, 0, 0, 1, 0xaa, 0xbb, 0, 2, 0, 0]);

    let mut back = Extent::default();
    back.read(&mut StreamReader::new(Cursor::new(&bytes[..]), Endianness::Big))
        .expect("read");
    assert_eq!(back, extent);
}

#[test]
fn scenario_a_vlf_packet_of_structs() {
    let mut ack = QueryAllImageInfosAck::new();
    assert_eq!(ack.packet_type(), 0x8000_0002);
    assert_eq!(PKTTYPE_QUERY_ALL_IMAGE_INFOS_ACK, 0x8000_0002);

    ack.infos = vec![image("base.qcow2", 4096, 3), image("x", 1, 0)];
    let expected = 36 + 4 + (4 + 10 + 4 + 4) + (4 + 1 + 4 + 4);
    assert_eq!(ack.length(), expected);

    let bytes = encode(&ack);
    assert_eq!(&bytes[HEADER_WIRE_LEN..HEADER_WIRE_LEN + 4], [0, 0, 0, 2]);
    let mut elements = StreamWriter::new(Vec::new(), Endianness::Big);
    for info in &ack.infos {
        info.write(&mut elements).expect("write");
    }
    assert_eq!(&bytes[HEADER_WIRE_LEN + 4..], &elements.into_inner()[..]);

    let decoded = decode(&bytes).expect("decode");
    let decoded = decoded
        .into_any()
        .downcast::<QueryAllImageInfosAck>()
        .expect("QueryAllImageInfosAck");
    assert_eq!(decoded.infos, ack.infos);
}

#[test]
fn scenario_b_simple_packet_is_header_only() {
    let mut p = DiscoverBarServerRequest::new();
    p.set_token(9);
    assert_eq!(PKTTYPE_DISCOVER_BAR_SERVER, 1);
    assert_eq!(p.length(), 36);
    assert_eq!(p.length(), PacketHeader::LENGTH);

    let bytes = encode(&p);
    let mut header_only = StreamWriter::new(Vec::new(), Endianness::Big);
    p.header.write(&mut header_only).expect("write");
    assert_eq!(bytes, header_only.into_inner());
    assert_eq!(bytes.len(), HEADER_WIRE_LEN);

    // Decoding stops right after the header.
    let mut trailing = bytes.clone();
    trailing.extend_from_slice(&[0xaa, 0xbb]);
    let mut r = StreamReader::new(Cursor::new(&trailing[..]), Endianness::Big);
    let decoded = PacketFactory::without_cache()
        .create_packet(&mut r)
        .expect("decode");
    assert_eq!(r.get_ref().position(), HEADER_WIRE_LEN as u64);
    assert_eq!(decoded.token(), 9);

    let mut untouched = DiscoverBarServerRequest::new();
    let mut r = StreamReader::new(Cursor::new(vec![1u8, 2, 3]), Endianness::Big);
    untouched.read(&mut r).expect("read");
    assert_eq!(r.get_ref().position(), 0);
}

#[test]
fn simple_packet_declared_fields_are_dropped() {
    let p = QueryAllImageInfos::new();
    assert_eq!(p.length(), PacketHeader::LENGTH);
    assert_eq!(encode(&p).len(), HEADER_WIRE_LEN);
}

#[test]
fn scenario_c_plain_struct() {
    let g = Geometry {
        cylinders: 1,
        heads: 2,
        sectors: 3,
    };
    assert_eq!(g.length(), 2 + 1 + 4);
    let mut w = StreamWriter::new(Vec::new(), Endianness::Little);
    g.write(&mut w).expect("write");
    assert_eq!(w.into_inner(), [1, 0, 2, 3, 0, 0, 0]);
}

#[test]
fn unknown_packet_kind() {
    let header = PacketHeader {
        packet_type: 0xdead,
        ..PacketHeader::default()
    };
    let mut w = StreamWriter::new(Vec::new(), Endianness::Big);
    header.write(&mut w).expect("write");
    match decode(&w.into_inner()) {
        Err(FactoryError::UnknownPacketKind(kind)) => assert_eq!(kind, 0xdead),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(
        FactoryError::UnknownPacketKind(0xdead).to_string(),
        "unknown packet kind 0x0000dead"
    );
}

#[test]
fn stream_errors_propagate() {
    let bytes = encode(&kitchen_sink());
    assert!(matches!(
        decode(&bytes[..bytes.len() - 3]),
        Err(FactoryError::Stream(_))
    ));
    assert!(matches!(
        decode(&bytes[..10]),
        Err(FactoryError::Stream(StreamError::Io(_)))
    ));

    // Header, then a 2-byte user name that is not UTF-8.
    let mut login = encode(&LoginRequest::new())[..HEADER_WIRE_LEN].to_vec();
    login.extend_from_slice(&[0, 0, 0, 2, 0xff, 0xfe]);
    assert!(matches!(
        decode(&login),
        Err(FactoryError::Stream(StreamError::InvalidUtf8(_)))
    ));
}

#[test]
fn constructor_presets_packet_type_only() {
    let p = LoginRequest::new();
    assert_eq!(p.packet_type(), PKTTYPE_VIRDISK_LOGIN);
    assert_eq!(
        p.header,
        PacketHeader {
            packet_type: PKTTYPE_VIRDISK_LOGIN,
            ..PacketHeader::default()
        }
    );
    assert!(p.user_name.is_empty());
    assert_eq!(RawBlock::new().packet_type(), PKTTYPE_RAW_BLOCK);
    assert_eq!(KitchenSink::default().packet_type(), 0);
}

#[test]
fn adjust_length_stores_length() {
    let mut block = RawBlock::new();
    block.data = vec![0; 100];
    block.adjust_length().expect("length fits");
    assert_eq!(block.header.len, (36 + 4 + 100) as u32);
}

#[derive(Default)]
struct Pool {
    hits: Mutex<u32>,
    returned: Mutex<Vec<u32>>,
}

impl PacketCache for Pool {
    fn get(&self, packet_type: u32, header: &PacketHeader) -> Option<Box<dyn Packet>> {
        if packet_type != PKTTYPE_RAW_BLOCK {
            return None;
        }
        *self.hits.lock().unwrap() += 1;
        let mut block = RawBlock::new();
        block.header = *header;
        block.data = vec![0xff; 64];
        Some(Box::new(block))
    }

    fn put(&self, packet: Box<dyn Packet>) {
        self.returned.lock().unwrap().push(packet.packet_type());
    }
}

#[test]
fn cache_is_consulted_before_dispatch() {
    let pool = Arc::new(Pool::default());
    let factory = PacketFactory::new(pool.clone());

    let mut block = RawBlock::new();
    block.data = vec![1, 2, 3];
    block.set_token(77);
    let decoded = factory
        .create_packet(&mut StreamReader::new(
            Cursor::new(encode(&block)),
            Endianness::Big,
        ))
        .expect("decode");
    let got = decoded.as_any().downcast_ref::<RawBlock>().expect("RawBlock");
    assert_eq!(got.data, [1, 2, 3]);
    assert_eq!(got.token(), 77);
    assert_eq!(*pool.hits.lock().unwrap(), 1);

    // Not pooled: falls through to dispatch.
    let login = factory
        .create_packet(&mut StreamReader::new(
            Cursor::new(encode(&LoginRequest::new())),
            Endianness::Big,
        ))
        .expect("decode");
    assert_eq!(*pool.hits.lock().unwrap(), 1);

    factory.recycle(decoded);
    factory.recycle(login);
    assert_eq!(
        *pool.returned.lock().unwrap(),
        [PKTTYPE_RAW_BLOCK, PKTTYPE_VIRDISK_LOGIN]
    );

    // Without a cache, recycling just drops.
    PacketFactory::without_cache().recycle(Box::new(RawBlock::new()));
}
