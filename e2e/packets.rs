//! End-to-end tests for the read-only packet parser family.

use capkit::netkit::ether::EtherType;
use capkit::netkit::ip::IpProto;
use capkit::syskit::handle::HandleAllocator;
use capkit::{IpFrag, RoEtherPkt, RoIcmpPkt, RoIpPkt, RoTcpPkt, RoUdpPkt};

fn build_udp_frame() -> Vec<u8> {
    let udp_len = 8 + 4;
    let ip_len = 20 + udp_len;
    let mut frame = vec![0u8; 14 + ip_len];

    frame[0..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
    frame[6..12].copy_from_slice(&[0xa, 0xb, 0xc, 0xd, 0xe, 0xf]);
    frame[12..14].copy_from_slice(&(EtherType::Ip as u16).to_be_bytes());

    let ip = &mut frame[14..14 + ip_len];
    ip[0] = 0x45;
    ip[2..4].copy_from_slice(&(ip_len as u16).to_be_bytes());
    ip[8] = 64;
    ip[9] = IpProto::Udp as u8;
    ip[12..16].copy_from_slice(&[192, 168, 0, 1]);
    ip[16..20].copy_from_slice(&[192, 168, 0, 2]);

    let udp = &mut ip[20..];
    udp[0..2].copy_from_slice(&12345u16.to_be_bytes());
    udp[2..4].copy_from_slice(&53u16.to_be_bytes());
    udp[4..6].copy_from_slice(&(udp_len as u16).to_be_bytes());
    udp[8..].copy_from_slice(b"ping");

    frame
}

#[test]
fn ethernet_ip_udp_layers_chain_through_from_constructors() {
    let frame = build_udp_frame();
    let ether = RoEtherPkt::new(&frame, false);
    assert!(ether.is_ok());
    assert_eq!(ether.raw_length(), frame.len());
    assert_eq!(ether.raw(), &frame[..]);

    let ip = RoIpPkt::from_ether(&ether, false);
    assert!(ip.is_ok());
    assert_eq!(ip.proto(), IpProto::Udp as u8);
    assert_eq!(ip.src(), u32::from_be_bytes([192, 168, 0, 1]));

    let udp = RoUdpPkt::from_ip(&ip, false);
    assert!(udp.is_ok());
    assert_eq!(udp.src_port(), 12345);
    assert_eq!(udp.dst_port(), 53);
    assert_eq!(udp.body(), b"ping");
}

#[test]
fn short_ethernet_frame_yields_bad_packet_sentinel() {
    let too_short = [0u8; 4];
    let pkt = RoEtherPkt::new(&too_short, false);
    assert!(!pkt.is_ok());
    assert_eq!(pkt.raw_length(), capkit::netkit::ether::HDR_LENGTH);
}

#[test]
fn non_ip_ethertype_fails_ip_construction() {
    let mut frame = vec![0u8; 14];
    frame[12..14].copy_from_slice(&(EtherType::Arp as u16).to_be_bytes());
    let ether = RoEtherPkt::new(&frame, false);
    assert!(ether.is_ok());
    let ip = RoIpPkt::from_ether(&ether, false);
    assert!(!ip.is_ok());
}

#[test]
fn ip_set_length_round_trips_through_length_accessor() {
    let mut ip_raw = vec![0u8; 20];
    ip_raw[0] = 0x45;
    let n = 1234u16;
    ip_raw[2..4].copy_from_slice(&n.to_be_bytes());
    let pkt = RoIpPkt::new(&ip_raw, false);
    assert_eq!(pkt.length(), n);
}

#[test]
fn tcp_and_icmp_construct_from_ip_body() {
    let mut raw = vec![0u8; 20 + 20];
    raw[0] = 0x45;
    raw[2..4].copy_from_slice(&(raw.len() as u16).to_be_bytes());
    raw[9] = IpProto::Tcp as u8;
    let off_words = 5u16;
    raw[20 + 12..20 + 14].copy_from_slice(&(off_words << 12).to_be_bytes());
    let ip = RoIpPkt::new(&raw, false);
    let tcp = RoTcpPkt::from_ip(&ip, false);
    assert!(tcp.is_ok());

    let mut icmp_raw = vec![0u8; 20 + 8];
    icmp_raw[0] = 0x45;
    icmp_raw[2..4].copy_from_slice(&(icmp_raw.len() as u16).to_be_bytes());
    icmp_raw[9] = IpProto::Icmp as u8;
    let icmp_ip = RoIpPkt::new(&icmp_raw, false);
    let icmp = RoIcmpPkt::from_ip(&icmp_ip, false);
    assert!(icmp.is_ok());
}

#[test]
fn ip_fragment_chain_preserves_insertion_order() {
    let tail = IpFrag::new(b"tail-bytes", 10, 10_000, None);
    let head = IpFrag::new(b"head-bytes", 0, 10_000, Some(Box::new(tail)));
    assert_eq!(head.raw(), b"head-bytes");
    assert_eq!(head.next().unwrap().raw(), b"tail-bytes");
}

#[test]
fn handle_allocator_never_hands_out_the_invalid_handle_while_slots_remain() {
    let mut alloc = HandleAllocator::new(8);
    for _ in 0..8 {
        assert_ne!(alloc.allocate(), capkit::syskit::handle::INVALID_HANDLE);
    }
    assert_eq!(alloc.allocate(), capkit::syskit::handle::INVALID_HANDLE);
}
