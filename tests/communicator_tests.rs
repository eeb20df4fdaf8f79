use pencil_decomp::algs::communicator::{CommTag, Communicator, NoComm, ThreadComm, Wait};
use pencil_decomp::algs::exchange::all_to_all_w;
use pencil_decomp::data::{PeerSlot, Region};
use pencil_decomp::topology::CartTopology;
use pencil_decomp::ErrorKind;

fn two() -> (ThreadComm, ThreadComm) {
    let mut comms = ThreadComm::universe(2);
    let c1 = comms.pop().unwrap();
    let c0 = comms.pop().unwrap();
    (c0, c1)
}

#[test]
fn thread_round_trip() {
    let tag = CommTag::new(0x1000);
    let (c0, c1) = two();

    let msg = b"hello";
    let _s = c0.isend(1, tag.as_u16(), msg);

    let h = c1.irecv(0, tag.as_u16(), 5);
    let got = h.wait().unwrap();
    assert_eq!(&got, msg);
}

#[test]
fn thread_fifo_order() {
    let tag = CommTag::new(0x1001);
    let (c0, c1) = two();

    for i in 0..10u8 {
        let _ = c0.isend(1, tag.as_u16(), &[i]);
    }
    let mut out = Vec::new();
    for _ in 0..10 {
        let h = c1.irecv(0, tag.as_u16(), 1);
        out.push(h.wait().unwrap()[0]);
    }
    assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
}

#[test]
fn separate_universes_do_not_share_mail() {
    let tag = CommTag::new(0x1002);
    let (a0, a1) = two();
    let (b0, b1) = two();
    let _ = a0.isend(1, tag.as_u16(), &[1]);
    let _ = b0.isend(1, tag.as_u16(), &[9]);
    assert_eq!(b1.irecv(0, tag.as_u16(), 1).wait().unwrap(), vec![9]);
    assert_eq!(a1.irecv(0, tag.as_u16(), 1).wait().unwrap(), vec![1]);
}

#[test]
fn serial_group_reports_rank_and_size() {
    assert_eq!(NoComm.rank(), 0);
    assert_eq!(NoComm.size(), 1);
    let out = ThreadComm::run(4, |c| (c.rank(), c.size()));
    assert_eq!(out, vec![(0, 4), (1, 4), (2, 4), (3, 4)]);
}

#[test]
fn exchange_mismatch_drains() {
    let tag = CommTag::new(0x12);
    let (c0, c1) = two();
    let grid = CartTopology::create(2, 0, &[1, 2], &[false, false]).unwrap();
    let slot = |displ| PeerSlot {
        count: 1,
        displ,
        region: Region::contiguous(4),
    };
    let slots = [slot(0), slot(4)];

    // Rank 1 sends a malformed 3-byte share
    let _ = c1.isend(0, tag.as_u16(), &[1, 2, 3]);

    let mut recv = [0u8; 8];
    let res = all_to_all_w("exchange.test", &c0, &grid, tag, &[7u8; 8], &slots, &mut recv, &slots);
    assert_eq!(res.unwrap_err().kind(), ErrorKind::Fatal);

    // Our send to rank 1 still went out
    assert_eq!(c1.irecv(0, tag.as_u16(), 4).wait().unwrap(), vec![7; 4]);
}
